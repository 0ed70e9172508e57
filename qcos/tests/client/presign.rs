// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::mock::{context, credential, MockHttpSend, REGION};
use pretty_assertions::assert_eq;
use qcos::time::from_timestamp;
use qcos::{Client, ErrorKind, Expiration, GetObject, Result, SignedNames, UploadPart};
use std::time::Duration;

const NOW: i64 = 1557989151;

fn fixed_client(mock: &MockHttpSend) -> Result<Client> {
    Client::builder()
        .region(REGION)
        .credential(credential())
        .context(context(mock.clone()))
        .signing_time(from_timestamp(NOW)?)
        .build()
}

fn query_value<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| match pair.split_once('=') {
        Some((k, v)) if k == name => Some(v),
        None if pair == name => Some(""),
        _ => None,
    })
}

#[test]
fn test_presigned_get_object_url() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = fixed_client(&mock)?;

    let url = client.get_object_url(
        "examplebucket",
        "dir/a b.txt",
        Some(Expiration::In(Duration::from_secs(3600))),
    )?;

    assert!(url.starts_with(
        "https://examplebucket-1250000000.ap-beijing.myqcloud.com/dir/a%20b.txt?q-sign-algorithm=sha1&"
    ));
    assert_eq!(
        query_value(&url, "q-ak"),
        Some("AKIDQjz3ltompVjBni5LitkWHFlFpwkn9U5q")
    );
    assert_eq!(query_value(&url, "q-sign-time"), Some("1557989151%3B1557992751"));
    assert_eq!(query_value(&url, "q-key-time"), Some("1557989151%3B1557992751"));
    assert_eq!(query_value(&url, "q-header-list"), Some("host"));
    assert_eq!(query_value(&url, "q-url-param-list"), Some(""));
    assert_eq!(query_value(&url, "q-signature").map(str::len), Some(40));
    assert!(mock.requests().is_empty());
    Ok(())
}

#[test]
fn test_expiration_forms_agree() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = fixed_client(&mock)?;

    let relative = client.get_object_url(
        "examplebucket",
        "a",
        Some(Expiration::In(Duration::from_secs(600))),
    )?;
    let absolute = client.get_object_url(
        "examplebucket",
        "a",
        Some(Expiration::At(from_timestamp(NOW + 600)?)),
    )?;
    assert_eq!(relative, absolute);

    assert_eq!(
        Expiration::from(Duration::from_secs(5)).resolve(from_timestamp(NOW)?)?,
        from_timestamp(NOW + 5)?
    );
    Ok(())
}

#[test]
fn test_expired_presign_still_signs() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = fixed_client(&mock)?;

    let url = client.get_object_url(
        "examplebucket",
        "a",
        Some(Expiration::At(from_timestamp(NOW - 60)?)),
    )?;

    assert_eq!(query_value(&url, "q-sign-time"), Some("1557989090%3B1557989091"));
    assert_eq!(query_value(&url, "q-signature").map(str::len), Some(40));
    Ok(())
}

#[test]
fn test_unsigned_object_url() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = fixed_client(&mock)?;

    let url = client.get_object_url("examplebucket", "/dir/file.txt", None)?;
    assert_eq!(
        url,
        "https://examplebucket-1250000000.ap-beijing.myqcloud.com/dir/file.txt"
    );
    Ok(())
}

#[test]
fn test_presign_signs_query_params() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = fixed_client(&mock)?;

    let req = client.execute_operation(
        GetObject::new("examplebucket", "a")?.with_query("response-content-type", "text/plain"),
    )?;
    let url = client.presigned_url(&req, Expiration::In(Duration::from_secs(60)))?;
    assert_eq!(
        query_value(&url, "response-content-type"),
        Some("text%2Fplain")
    );
    assert_eq!(
        query_value(&url, "q-url-param-list"),
        Some("response-content-type")
    );

    let url = client.presigned_url_with(
        &req,
        Expiration::In(Duration::from_secs(60)),
        SignedNames::Selected {
            headers: vec![],
            params: vec![],
        },
    )?;
    assert_eq!(query_value(&url, "q-header-list"), Some(""));
    assert_eq!(query_value(&url, "q-url-param-list"), Some(""));
    Ok(())
}

#[test]
fn test_presign_leaves_request_untouched() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = fixed_client(&mock)?;

    let req = client.execute_operation(UploadPart::new("examplebucket", "a", "up", 3, "data")?)?;
    let before = (req.uri().clone(), req.headers().clone());

    let url = client.presigned_url(&req, Expiration::In(Duration::from_secs(60)))?;
    assert!(url.contains("partNumber=3"));
    assert!(url.contains("uploadId=up"));
    assert_eq!((req.uri().clone(), req.headers().clone()), before);
    assert_eq!(
        req.uri().to_string(),
        "https://ap-beijing.myqcloud.com/examplebucket/a?partNumber=3&uploadId=up"
    );
    Ok(())
}

#[test]
fn test_presign_rejects_foreign_request() -> Result<()> {
    let mock = MockHttpSend::new();
    let ours = fixed_client(&mock)?;
    let theirs = fixed_client(&mock)?;

    let req = theirs.execute_operation(GetObject::new("examplebucket", "a")?)?;
    let err = ours
        .presigned_url(&req, Expiration::In(Duration::from_secs(60)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // Clones share the identity of their origin.
    assert!(theirs
        .clone()
        .presigned_url(&req, Expiration::In(Duration::from_secs(60)))
        .is_ok());
    assert!(mock.requests().is_empty());
    Ok(())
}
