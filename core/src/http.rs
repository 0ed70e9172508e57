use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is the transport every prepared request is finally handed to.
///
/// Implementations only move bytes: signing, host rewriting and status
/// interpretation all happen before and after this call.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
