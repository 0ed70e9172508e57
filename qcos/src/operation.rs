//! Typed COS operations.
//!
//! Every operation is validated when it is constructed, so a value of any of
//! these types always describes a well formed request.

use crate::{encode_key, xml, PartResult};
use bytes::Bytes;
use http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Request};
use percent_encoding::utf8_percent_encode;
use qcos_core::{Error, Result, QUERY_ENCODE_SET};
use qcos_sign::X_COS_ACL;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Canned ACL applied to a new object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Acl {
    /// Only the owner has access.
    #[default]
    Private,
    /// Anyone may read.
    PublicRead,
    /// Anyone may read and write.
    PublicReadWrite,
    /// Inherit the bucket ACL.
    Default,
}

impl Acl {
    /// Value of the `x-cos-acl` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::Default => "default",
        }
    }
}

impl Display for Acl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "default" => Ok(Acl::Default),
            v => Err(Error::invalid_params(format!("unknown acl: {v}"))),
        }
    }
}

/// Bucket and key of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    bucket: String,
    key: String,
}

impl ObjectLocation {
    /// Create a location. A single leading `/` of the key is dropped.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() || bucket.contains('/') {
            return Err(Error::invalid_params(format!(
                "invalid bucket name: {bucket:?}"
            )));
        }
        let key = key.into();
        let key = key.strip_prefix('/').unwrap_or(&key).to_string();
        if key.is_empty() {
            return Err(Error::invalid_params("object key must not be empty"));
        }
        Ok(Self { bucket, key })
    }

    /// Bucket name as given, without the account id suffix.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn path(&self) -> String {
        format!("/{}/{}", self.bucket, encode_key(&self.key))
    }
}

/// Upload an object in one request.
#[derive(Debug, Clone)]
pub struct PutObject {
    location: ObjectLocation,
    body: Bytes,
    acl: Option<Acl>,
}

impl PutObject {
    /// Create a new PutObject.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Result<Self> {
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
            body: body.into(),
            acl: None,
        })
    }

    /// Set the canned ACL.
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }
}

/// Download an object.
#[derive(Debug, Clone)]
pub struct GetObject {
    location: ObjectLocation,
    query: Vec<(String, String)>,
}

impl GetObject {
    /// Create a new GetObject.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
            query: Vec::new(),
        })
    }

    /// Add a query parameter such as `response-content-type`.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Fetch the metadata of an object.
#[derive(Debug, Clone)]
pub struct HeadObject {
    location: ObjectLocation,
}

impl HeadObject {
    /// Create a new HeadObject.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
        })
    }
}

/// Start a multipart upload.
#[derive(Debug, Clone)]
pub struct InitiateMultipartUpload {
    location: ObjectLocation,
    acl: Option<Acl>,
}

impl InitiateMultipartUpload {
    /// Create a new InitiateMultipartUpload.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
            acl: None,
        })
    }

    /// Set the canned ACL of the final object.
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }
}

fn check_upload_id(upload_id: String) -> Result<String> {
    if upload_id.is_empty() {
        return Err(Error::invalid_params("upload id must not be empty"));
    }
    Ok(upload_id)
}

/// Upload one part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPart {
    location: ObjectLocation,
    upload_id: String,
    part_number: u32,
    body: Bytes,
}

impl UploadPart {
    /// Create a new UploadPart. Part numbers start at 1.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        part_number: u32,
        body: impl Into<Bytes>,
    ) -> Result<Self> {
        if part_number == 0 {
            return Err(Error::invalid_params("part number starts at 1"));
        }
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
            upload_id: check_upload_id(upload_id.into())?,
            part_number,
            body: body.into(),
        })
    }
}

/// Finish a multipart upload.
#[derive(Debug, Clone)]
pub struct CompleteMultipartUpload {
    location: ObjectLocation,
    upload_id: String,
    parts: Vec<PartResult>,
}

impl CompleteMultipartUpload {
    /// Create a new CompleteMultipartUpload. Parts are sent ordered by index.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        mut parts: Vec<PartResult>,
    ) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::invalid_params("part list must not be empty"));
        }
        parts.sort_by_key(|p| p.index);
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
            upload_id: check_upload_id(upload_id.into())?,
            parts,
        })
    }
}

/// Cancel a multipart upload and drop its parts.
#[derive(Debug, Clone)]
pub struct AbortMultipartUpload {
    location: ObjectLocation,
    upload_id: String,
}

impl AbortMultipartUpload {
    /// Create a new AbortMultipartUpload.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            location: ObjectLocation::new(bucket, key)?,
            upload_id: check_upload_id(upload_id.into())?,
        })
    }
}

/// Kinds of operations the client can build.
#[derive(Debug, Clone)]
pub enum OperationKind {
    /// See [`PutObject`].
    PutObject(PutObject),
    /// See [`GetObject`].
    GetObject(GetObject),
    /// See [`HeadObject`].
    HeadObject(HeadObject),
    /// See [`InitiateMultipartUpload`].
    InitiateMultipartUpload(InitiateMultipartUpload),
    /// See [`UploadPart`].
    UploadPart(UploadPart),
    /// See [`CompleteMultipartUpload`].
    CompleteMultipartUpload(CompleteMultipartUpload),
    /// See [`AbortMultipartUpload`].
    AbortMultipartUpload(AbortMultipartUpload),
}

/// An operation plus the extra headers to send with it.
///
/// Headers mandated by the operation itself always win over extra headers
/// of the same name.
#[derive(Debug, Clone)]
pub struct Operation {
    kind: OperationKind,
    headers: Vec<(String, String)>,
}

impl Operation {
    /// Name of the operation, such as `UploadPart`.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            OperationKind::PutObject(_) => "PutObject",
            OperationKind::GetObject(_) => "GetObject",
            OperationKind::HeadObject(_) => "HeadObject",
            OperationKind::InitiateMultipartUpload(_) => "InitiateMultipartUpload",
            OperationKind::UploadPart(_) => "UploadPart",
            OperationKind::CompleteMultipartUpload(_) => "CompleteMultipartUpload",
            OperationKind::AbortMultipartUpload(_) => "AbortMultipartUpload",
        }
    }

    /// The typed operation.
    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Bucket and key the operation targets.
    pub fn location(&self) -> &ObjectLocation {
        match &self.kind {
            OperationKind::PutObject(op) => &op.location,
            OperationKind::GetObject(op) => &op.location,
            OperationKind::HeadObject(op) => &op.location,
            OperationKind::InitiateMultipartUpload(op) => &op.location,
            OperationKind::UploadPart(op) => &op.location,
            OperationKind::CompleteMultipartUpload(op) => &op.location,
            OperationKind::AbortMultipartUpload(op) => &op.location,
        }
    }

    /// Extra headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Add an extra header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build an operation from its name and a flat parameter map.
    ///
    /// `Bucket`, `Key`, `UploadId`, `PartNumber`, `ACL` and `Body` are
    /// recognized, `response-*` entries become query parameters of
    /// `GetObject`, anything else is sent as an extra header.
    pub fn from_params<I, K, V>(name: &str, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let body = Bytes::from(params.remove("Body").unwrap_or_default());
        let acl = params.remove("ACL");

        let kind = match name {
            "PutObject" => {
                let (bucket, key) = required_location(&mut params, name)?;
                let op = PutObject::new(bucket, key, body)?;
                OperationKind::PutObject(match parse_acl(acl)? {
                    Some(acl) => op.with_acl(acl),
                    None => op,
                })
            }
            "GetObject" => {
                let (bucket, key) = required_location(&mut params, name)?;
                let mut op = GetObject::new(bucket, key)?;
                let query: Vec<String> = params
                    .keys()
                    .filter(|k| k.starts_with("response-"))
                    .cloned()
                    .collect();
                for k in query {
                    if let Some(v) = params.remove(&k) {
                        op = op.with_query(k, v);
                    }
                }
                OperationKind::GetObject(op)
            }
            "HeadObject" => {
                let (bucket, key) = required_location(&mut params, name)?;
                OperationKind::HeadObject(HeadObject::new(bucket, key)?)
            }
            "InitiateMultipartUpload" | "CreateMultipartUpload" => {
                let (bucket, key) = required_location(&mut params, name)?;
                let op = InitiateMultipartUpload::new(bucket, key)?;
                OperationKind::InitiateMultipartUpload(match parse_acl(acl)? {
                    Some(acl) => op.with_acl(acl),
                    None => op,
                })
            }
            "UploadPart" => {
                let (bucket, key) = required_location(&mut params, name)?;
                let upload_id = required(&mut params, name, "UploadId")?;
                let part_number = required(&mut params, name, "PartNumber")?;
                let part_number = part_number.parse::<u32>().map_err(|e| {
                    Error::invalid_params(format!("invalid PartNumber: {part_number}")).with_source(e)
                })?;
                OperationKind::UploadPart(UploadPart::new(
                    bucket,
                    key,
                    upload_id,
                    part_number,
                    body,
                )?)
            }
            "CompleteMultipartUpload" => {
                required_location(&mut params, name)?;
                required(&mut params, name, "UploadId")?;
                return Err(Error::invalid_params(
                    "CompleteMultipartUpload needs a part list, build it with CompleteMultipartUpload::new",
                ));
            }
            "AbortMultipartUpload" => {
                let (bucket, key) = required_location(&mut params, name)?;
                let upload_id = required(&mut params, name, "UploadId")?;
                OperationKind::AbortMultipartUpload(AbortMultipartUpload::new(
                    bucket, key, upload_id,
                )?)
            }
            _ => return Err(Error::unknown_operation(name)),
        };

        Ok(Self {
            kind,
            headers: params.into_iter().collect(),
        })
    }

    /// Build the path-style request against `endpoint`, such as
    /// `https://ap-beijing.myqcloud.com`.
    pub(crate) fn into_request(self, endpoint: &str) -> Result<Request<Bytes>> {
        let mut headers = HeaderMap::new();
        for (k, v) in &self.headers {
            let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| {
                Error::invalid_params(format!("invalid header name: {k}")).with_source(e)
            })?;
            let value = HeaderValue::from_str(v).map_err(|e| {
                Error::invalid_params(format!("invalid value of header {k}")).with_source(e)
            })?;
            headers.insert(name, value);
        }

        let path = self.location().path();
        let (method, query, body) = match self.kind {
            OperationKind::PutObject(op) => {
                if let Some(acl) = op.acl {
                    headers.insert(X_COS_ACL, HeaderValue::from_static(acl.as_str()));
                }
                headers.insert(CONTENT_LENGTH, HeaderValue::from(op.body.len()));
                (Method::PUT, vec![], op.body)
            }
            OperationKind::GetObject(op) => (Method::GET, op.query, Bytes::new()),
            OperationKind::HeadObject(_) => (Method::HEAD, vec![], Bytes::new()),
            OperationKind::InitiateMultipartUpload(op) => {
                if let Some(acl) = op.acl {
                    headers.insert(X_COS_ACL, HeaderValue::from_static(acl.as_str()));
                }
                (
                    Method::POST,
                    vec![("uploads".to_string(), String::new())],
                    Bytes::new(),
                )
            }
            OperationKind::UploadPart(op) => {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(op.body.len()));
                (
                    Method::PUT,
                    vec![
                        ("partNumber".to_string(), op.part_number.to_string()),
                        ("uploadId".to_string(), op.upload_id),
                    ],
                    op.body,
                )
            }
            OperationKind::CompleteMultipartUpload(op) => {
                let body = Bytes::from(xml::complete_body(&op.parts)?);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                (
                    Method::POST,
                    vec![("uploadId".to_string(), op.upload_id)],
                    body,
                )
            }
            OperationKind::AbortMultipartUpload(op) => (
                Method::DELETE,
                vec![("uploadId".to_string(), op.upload_id)],
                Bytes::new(),
            ),
        };

        let mut uri = format!("{endpoint}{path}");
        for (i, (k, v)) in query.iter().enumerate() {
            uri.push(if i == 0 { '?' } else { '&' });
            uri.extend(utf8_percent_encode(k, &QUERY_ENCODE_SET));
            if !v.is_empty() {
                uri.push('=');
                uri.extend(utf8_percent_encode(v, &QUERY_ENCODE_SET));
            }
        }

        let mut req = Request::builder().method(method).uri(uri).body(body)?;
        *req.headers_mut() = headers;
        Ok(req)
    }
}

fn parse_acl(acl: Option<String>) -> Result<Option<Acl>> {
    acl.map(|v| v.parse::<Acl>()).transpose()
}

fn required(params: &mut BTreeMap<String, String>, op: &str, key: &str) -> Result<String> {
    params
        .remove(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::invalid_params(format!("{op} requires {key}")))
}

fn required_location(
    params: &mut BTreeMap<String, String>,
    op: &str,
) -> Result<(String, String)> {
    let bucket = required(params, op, "Bucket")?;
    let key = required(params, op, "Key")?;
    Ok((bucket, key))
}

macro_rules! impl_from_operation {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for Operation {
                fn from(op: $ty) -> Self {
                    Operation {
                        kind: OperationKind::$ty(op),
                        headers: Vec::new(),
                    }
                }
            }
        )*
    };
}

impl_from_operation!(
    PutObject,
    GetObject,
    HeadObject,
    InitiateMultipartUpload,
    UploadPart,
    CompleteMultipartUpload,
    AbortMultipartUpload,
);
