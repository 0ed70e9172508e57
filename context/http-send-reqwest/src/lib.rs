//! Reqwest-based HTTP transport for qcos.
//!
//! [`ReqwestHttpSend`] implements the `HttpSend` trait from `qcos_core`.
//! The whole response body is collected before it is handed back, since
//! every COS response the client consumes is either empty or a small XML
//! document.
//!
//! ```no_run
//! use qcos_core::Context;
//! use qcos_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! # fn main() -> qcos_core::Result<()> {
//! let http = ReqwestHttpSend::with_timeouts(Duration::from_secs(600), Duration::from_secs(600))?;
//! let ctx = Context::new().with_http_send(http);
//! # let _ = ctx;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use qcos_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};
use std::time::Duration;

/// HTTP transport backed by a [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a transport with a total request timeout and a connect timeout.
    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::unexpected("failed to build http client").with_source(e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::invalid_argument("request is not sendable").with_source(e))?;
        log::debug!("sending {} {}", req.method(), req.url());

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::dispatch("failed to send request").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::dispatch("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
