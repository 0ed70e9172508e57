use super::mock::{client, context, credential, Kind, MockHttpSend, RefusingHttpSend, REGION};
use http::header::{AUTHORIZATION, DATE, HOST};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use qcos::{
    AbortMultipartUpload, Client, ErrorKind, GetObject, HeadObject, Result, ServiceError,
};
use qcos_core::{Context, StaticEnv};
use std::collections::HashMap;

#[test]
fn test_pipeline_order() {
    let mock = MockHttpSend::new();
    assert_eq!(client(&mock).pipeline(), vec!["host", "authorization"]);
}

#[tokio::test]
async fn test_dispatch_signs_and_rewrites_host() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = client(&mock);

    let req = client.execute_operation(HeadObject::new("examplebucket", "a/b c.txt")?)?;
    assert_eq!(req.operation_name(), "HeadObject");
    assert_eq!(req.client_id(), client.id());
    client.dispatch(req).await?;

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let r = &requests[0];
    assert_eq!(r.kind, Kind::Head);
    assert_eq!(
        r.uri.to_string(),
        "https://examplebucket-1250000000.ap-beijing.myqcloud.com/a/b%20c.txt"
    );
    assert_eq!(
        r.headers[HOST],
        "examplebucket-1250000000.ap-beijing.myqcloud.com"
    );
    assert!(r.headers.contains_key(DATE));
    let auth = r.headers[AUTHORIZATION].to_str().unwrap();
    assert!(auth.contains("&q-header-list=host&"));
    assert!(auth.contains("q-ak=AKIDQjz3ltompVjBni5LitkWHFlFpwkn9U5q"));
    Ok(())
}

#[tokio::test]
async fn test_security_token_is_sent() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = Client::builder()
        .region(REGION)
        .credential(credential().with_security_token("session-token"))
        .context(context(mock.clone()))
        .build()?;

    client
        .dispatch(client.execute_operation(HeadObject::new("examplebucket", "a")?)?)
        .await?;
    assert_eq!(
        mock.requests()[0].headers["x-cos-security-token"],
        "session-token"
    );
    Ok(())
}

#[tokio::test]
async fn test_dispatch_rejects_foreign_request() -> Result<()> {
    let ours_mock = MockHttpSend::new();
    let theirs_mock = MockHttpSend::new();
    let ours = client(&ours_mock);
    let theirs = client(&theirs_mock);
    assert_ne!(ours.id(), theirs.id());

    let req = theirs.execute_operation(GetObject::new("examplebucket", "a")?)?;
    let err = ours.dispatch(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(ours_mock.requests().is_empty());
    assert!(theirs_mock.requests().is_empty());

    // A clone dispatches what its origin prepared.
    let req = ours.execute_operation(GetObject::new("examplebucket", "a")?)?;
    let resp = ours.clone().dispatch(req).await?;
    assert_eq!(resp.body().as_ref(), b"hello");
    Ok(())
}

#[tokio::test]
async fn test_execute_by_name() -> Result<()> {
    let mock = MockHttpSend::new();
    let client = client(&mock);

    let req = client.execute(
        "GetObject",
        [
            ("Bucket", "examplebucket"),
            ("Key", "a.txt"),
            ("response-content-type", "text/plain"),
            ("x-cos-traffic-limit", "819200"),
        ],
    )?;
    assert_eq!(req.method(), &Method::GET);
    assert_eq!(
        req.uri().to_string(),
        "https://ap-beijing.myqcloud.com/examplebucket/a.txt?response-content-type=text%2Fplain"
    );
    assert_eq!(req.headers()["x-cos-traffic-limit"], "819200");

    let err = client
        .execute("ListBuckets", [("Bucket", "examplebucket")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownOperation);

    let err = client
        .execute("UploadPart", [("Bucket", "examplebucket"), ("Key", "a")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParams);

    assert!(mock.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_non_success_status() -> Result<()> {
    let mock = MockHttpSend::new().abort_status(StatusCode::NOT_FOUND);
    let client = client(&mock);

    let op = AbortMultipartUpload::new("examplebucket", "a", "missing")?;
    let resp = client.send(client.execute_operation(op.clone())?).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let err = client
        .dispatch(client.execute_operation(op)?)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dispatch);
    assert!(err.message().contains("404"));
    Ok(())
}

#[tokio::test]
async fn test_service_error_is_source() -> Result<()> {
    let mock = MockHttpSend::new().fail_part(1);
    let client = client(&mock);

    let req = client.execute("UploadPart", [
        ("Bucket", "examplebucket"),
        ("Key", "a"),
        ("UploadId", "up"),
        ("PartNumber", "1"),
        ("Body", "data"),
    ])?;
    let err = client.dispatch(req).await.unwrap_err();

    let source = std::error::Error::source(&err).expect("service error must be attached");
    let se = source
        .downcast_ref::<ServiceError>()
        .expect("source must be a service error");
    assert_eq!(se.code, "InternalError");
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_is_dispatch_error() -> Result<()> {
    let client = Client::builder()
        .region(REGION)
        .credential(credential())
        .context(context(RefusingHttpSend))
        .build()?;

    let err = client
        .dispatch(client.execute_operation(HeadObject::new("examplebucket", "a")?)?)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dispatch);
    Ok(())
}

#[test]
fn test_builder_reads_env() -> Result<()> {
    let env = StaticEnv {
        envs: HashMap::from([
            ("TENCENTCLOUD_REGION".to_string(), "ap-shanghai".to_string()),
            ("QCLOUD_REGION".to_string(), "ap-guangzhou".to_string()),
            ("QCLOUD_APPID".to_string(), "1250000000".to_string()),
            ("QCLOUD_SECRET_ID".to_string(), "id".to_string()),
            ("QCLOUD_SECRET_KEY".to_string(), "key".to_string()),
        ]),
    };
    let client = Client::builder()
        .context(Context::new().with_http_send(MockHttpSend::new()).with_env(env))
        .build()?;
    assert_eq!(client.endpoint(), "https://ap-shanghai.myqcloud.com");

    let url = client.build_url(GetObject::new("examplebucket", "a")?)?;
    assert_eq!(url, "https://examplebucket-1250000000.ap-shanghai.myqcloud.com/a");
    Ok(())
}

#[test]
fn test_builder_rejects_bad_settings() {
    let build = |f: fn(qcos::ClientBuilder) -> qcos::ClientBuilder| {
        f(Client::builder()
            .region(REGION)
            .credential(credential())
            .context(Context::new().with_env(StaticEnv::default())))
        .build()
    };

    assert!(build(|b| b).is_ok());
    assert_eq!(
        build(|b| b.scheme("ftp")).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        build(|b| b.min_part_size(0)).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        build(|b| b.upload_concurrency(0)).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    let err = Client::builder()
        .context(Context::new().with_env(StaticEnv::default()))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
