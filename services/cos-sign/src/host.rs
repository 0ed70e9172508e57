use http::header::HOST;
use http::request::Parts;
use http::uri::{Authority, PathAndQuery};
use http::Uri;
use log::debug;
use qcos_core::{Error, Intercept, Result};
use std::str::FromStr;

/// HostResolver rewrites path-style requests into virtual-hosted style.
///
/// `https://ap-beijing.myqcloud.com/examplebucket/key` becomes
/// `https://examplebucket-1250000000.ap-beijing.myqcloud.com/key`. It must
/// run before signing so the signature covers the final host and path.
#[derive(Debug, Clone)]
pub struct HostResolver {
    app_id: String,
}

impl HostResolver {
    /// Create a resolver for the given account id.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }

    /// Append the account id to a bucket name.
    ///
    /// Buckets that already carry the `-{app_id}` suffix are left alone.
    pub fn virtual_bucket(&self, bucket: &str) -> Result<String> {
        if bucket.is_empty() {
            return Err(Error::invalid_argument("bucket name must not be empty"));
        }
        if self.app_id.is_empty() || bucket.ends_with(&format!("-{}", self.app_id)) {
            return Ok(bucket.to_string());
        }
        Ok(format!("{bucket}-{}", self.app_id))
    }

    /// Build the virtual host of `bucket` under a regional endpoint.
    pub fn virtual_host(&self, bucket: &str, endpoint: &str) -> Result<String> {
        Ok(format!("{}.{endpoint}", self.virtual_bucket(bucket)?))
    }

    /// Rewrite a path-style URI whose first path segment is the bucket.
    pub fn resolve(&self, uri: &Uri) -> Result<Uri> {
        let authority = uri
            .authority()
            .ok_or_else(|| Error::invalid_argument("request without authority"))?;

        let path = uri.path().strip_prefix('/').unwrap_or(uri.path());
        let (bucket, rest) = path.split_once('/').unwrap_or((path, ""));
        let host = self.virtual_host(bucket, authority.as_str())?;

        let paq = match uri.query() {
            Some(query) => format!("/{rest}?{query}"),
            None => format!("/{rest}"),
        };

        let mut parts = uri.clone().into_parts();
        parts.authority = Some(Authority::from_str(&host)?);
        parts.path_and_query = Some(PathAndQuery::from_str(&paq)?);
        Ok(Uri::from_parts(parts)?)
    }
}

impl Intercept for HostResolver {
    fn name(&self) -> &'static str {
        "host"
    }

    fn intercept(&self, req: &mut Parts) -> Result<()> {
        let uri = self.resolve(&req.uri)?;
        debug!("resolved {} into {uri}", req.uri);

        if let Some(authority) = uri.authority() {
            req.headers.insert(HOST, authority.as_str().parse()?);
        }
        req.uri = uri;
        Ok(())
    }
}
