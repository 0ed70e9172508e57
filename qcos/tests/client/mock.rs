#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http::header::ETAG;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use qcos::{Client, Context, Credential, Error, Result};
use qcos_core::{HttpSend, StaticEnv};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

pub const REGION: &str = "ap-beijing";
pub const APP_ID: &str = "1250000000";
pub const BUCKET: &str = "examplebucket";
pub const UPLOAD_ID: &str = "1585130821cbb7df1d11846c073ad648";

/// What a recorded request was, judged from its method and query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Initiate,
    Put,
    Part(u32),
    Complete,
    Abort,
    Get,
    Head,
    Other,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub kind: Kind,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<Recorded>,
    fail_parts: BTreeSet<u32>,
    hang_parts: BTreeSet<u32>,
    abort_status: Option<StatusCode>,
    complete_status: Option<StatusCode>,
    complete_body: Option<String>,
}

/// In-memory COS that records every request it receives.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    state: Arc<Mutex<State>>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer uploads of this part with a 500.
    pub fn fail_part(self, n: u32) -> Self {
        self.state.lock().unwrap().fail_parts.insert(n);
        self
    }

    /// Never answer uploads of this part.
    pub fn hang_part(self, n: u32) -> Self {
        self.state.lock().unwrap().hang_parts.insert(n);
        self
    }

    pub fn abort_status(self, status: StatusCode) -> Self {
        self.state.lock().unwrap().abort_status = Some(status);
        self
    }

    pub fn complete_with(self, status: StatusCode, body: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.complete_status = Some(status);
            state.complete_body = Some(body.to_string());
        }
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn kinds(&self) -> Vec<Kind> {
        self.requests().iter().map(|r| r.kind).collect()
    }

    pub fn count(&self, f: impl Fn(Kind) -> bool) -> usize {
        self.kinds().into_iter().filter(|k| f(*k)).count()
    }
}

fn classify(method: &Method, uri: &Uri) -> Kind {
    let query: HashMap<&str, &str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|v| !v.is_empty())
        .map(|v| v.split_once('=').unwrap_or((v, "")))
        .collect();

    match *method {
        Method::POST if query.contains_key("uploads") => Kind::Initiate,
        Method::POST if query.contains_key("uploadId") => Kind::Complete,
        Method::PUT if query.contains_key("partNumber") => {
            Kind::Part(query["partNumber"].parse().unwrap())
        }
        Method::PUT => Kind::Put,
        Method::DELETE if query.contains_key("uploadId") => Kind::Abort,
        Method::GET => Kind::Get,
        Method::HEAD => Kind::Head,
        _ => Kind::Other,
    }
}

fn respond(status: StatusCode, body: impl Into<Bytes>) -> http::Response<Bytes> {
    Response::builder().status(status).body(body.into()).unwrap()
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let kind = classify(&parts.method, &parts.uri);

        let (hang, resp) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(Recorded {
                kind,
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                headers: parts.headers.clone(),
                body: body.clone(),
            });

            match kind {
                Kind::Initiate => (
                    false,
                    respond(
                        StatusCode::OK,
                        format!(
                            "<InitiateMultipartUploadResult><Bucket>{BUCKET}-{APP_ID}</Bucket><Key>k</Key><UploadId>{UPLOAD_ID}</UploadId></InitiateMultipartUploadResult>"
                        ),
                    ),
                ),
                Kind::Part(n) if state.hang_parts.contains(&n) => {
                    (true, respond(StatusCode::OK, ""))
                }
                Kind::Part(n) if state.fail_parts.contains(&n) => (
                    false,
                    respond(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "<Error><Code>InternalError</Code><Message>boom</Message><RequestId>r</RequestId></Error>",
                    ),
                ),
                Kind::Part(n) => {
                    let mut resp = respond(StatusCode::OK, "");
                    resp.headers_mut()
                        .insert(ETAG, format!("\"etag-{n}\"").parse().unwrap());
                    (false, resp)
                }
                Kind::Complete => (
                    false,
                    respond(
                        state.complete_status.unwrap_or(StatusCode::OK),
                        state.complete_body.clone().unwrap_or_else(|| {
                            "<CompleteMultipartUploadResult><Location>l</Location></CompleteMultipartUploadResult>".to_string()
                        }),
                    ),
                ),
                Kind::Abort => (
                    false,
                    respond(state.abort_status.unwrap_or(StatusCode::NO_CONTENT), ""),
                ),
                Kind::Put => {
                    let mut resp = respond(StatusCode::OK, "");
                    resp.headers_mut()
                        .insert(ETAG, "\"etag-put\"".parse().unwrap());
                    (false, resp)
                }
                Kind::Get => (false, respond(StatusCode::OK, "hello")),
                Kind::Head | Kind::Other => (false, respond(StatusCode::OK, "")),
            }
        };

        if hang {
            std::future::pending::<()>().await;
        }
        Ok(resp)
    }
}

/// A mock that refuses every request at the transport level.
#[derive(Debug, Clone, Default)]
pub struct RefusingHttpSend;

#[async_trait]
impl HttpSend for RefusingHttpSend {
    async fn http_send(&self, _: Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::dispatch("connection refused"))
    }
}

pub fn credential() -> Credential {
    Credential::new(APP_ID, "AKIDQjz3ltompVjBni5LitkWHFlFpwkn9U5q", "BQYIM75p8x0iWVFSIgqEKwFprpRSVHlz")
}

pub fn context(http: impl HttpSend) -> Context {
    Context::new()
        .with_file_read(qcos_file_read_tokio::TokioFileRead)
        .with_http_send(http)
        .with_env(StaticEnv::default())
}

pub fn client(mock: &MockHttpSend) -> Client {
    Client::builder()
        .region(REGION)
        .credential(credential())
        .context(context(mock.clone()))
        .build()
        .unwrap()
}
