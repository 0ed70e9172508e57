use crate::xml::parse_error;
use crate::{GetObject, Operation, Pipeline};
use bytes::Bytes;
use chrono::TimeDelta;
use http::{HeaderMap, Method, Request, Uri};
use log::debug;
use qcos_core::time::{now, DateTime};
use qcos_core::{Context, Error, Intercept, Result, Signer};
use qcos_sign::{
    Config, Credential, HostResolver, RequestSigner, SignedNames, DEFAULT_SIGN_WINDOW,
    ENDPOINT_SUFFIX,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default multipart threshold and minimum part size.
pub const DEFAULT_MIN_PART_SIZE: u64 = 1024 * 1024;

/// Default number of parts uploaded at the same time.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Response of a dispatched request, body fully collected.
pub type Response = http::Response<Bytes>;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity token of a client.
///
/// Every built client gets a fresh one, clones of a client share it. A
/// [`PreparedRequest`] remembers the token of the client that built it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A request built by [`Client::execute_operation`], not yet sent.
///
/// It is still path-style and unsigned: the host rewrite and the signature
/// are applied when it is dispatched or presigned.
#[derive(Debug)]
pub struct PreparedRequest {
    client: ClientId,
    name: &'static str,
    request: Request<Bytes>,
}

impl PreparedRequest {
    /// Identity of the client that built this request.
    pub fn client_id(&self) -> ClientId {
        self.client
    }

    /// Name of the operation, such as `UploadPart`.
    pub fn operation_name(&self) -> &'static str {
        self.name
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Path-style URI.
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Headers set so far.
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Request body.
    pub fn body(&self) -> &Bytes {
        self.request.body()
    }
}

/// When a presigned URL stops working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// At an absolute instant.
    At(DateTime),
    /// After a duration counted from signing time.
    In(Duration),
}

impl Expiration {
    /// Normalize into an absolute instant.
    pub fn resolve(&self, now: DateTime) -> Result<DateTime> {
        match self {
            Expiration::At(t) => Ok(*t),
            Expiration::In(d) => {
                let d = TimeDelta::from_std(*d).map_err(|e| {
                    Error::invalid_argument("expiration is too far away").with_source(e)
                })?;
                now.checked_add_signed(d)
                    .ok_or_else(|| Error::invalid_argument("expiration overflows"))
            }
        }
    }
}

impl From<Duration> for Expiration {
    fn from(d: Duration) -> Self {
        Expiration::In(d)
    }
}

impl From<DateTime> for Expiration {
    fn from(t: DateTime) -> Self {
        Expiration::At(t)
    }
}

/// Builder of [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: Config,
    scheme: Option<String>,
    min_part_size: Option<u64>,
    upload_concurrency: Option<usize>,
    sign_window: Option<Duration>,
    context: Option<Context>,
    time: Option<DateTime>,
}

impl ClientBuilder {
    /// Use this config. Unset fields are loaded from the environment.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the region, such as `ap-beijing` or `cos.ap-beijing`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set the static credential.
    pub fn credential(mut self, cred: Credential) -> Self {
        self.config.app_id = Some(cred.app_id);
        self.config.secret_id = Some(cred.secret_id);
        self.config.secret_key = Some(cred.secret_key);
        self.config.security_token = cred.security_token;
        self
    }

    /// Set the URL scheme, `https` (default) or `http`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Set the multipart threshold and minimum part size.
    pub fn min_part_size(mut self, size: u64) -> Self {
        self.min_part_size = Some(size);
        self
    }

    /// Set how many parts are uploaded at the same time.
    pub fn upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = Some(concurrency);
        self
    }

    /// Set the validity window of header signatures.
    pub fn sign_window(mut self, window: Duration) -> Self {
        self.sign_window = Some(window);
        self
    }

    /// Use this context instead of the default one.
    pub fn context(mut self, ctx: Context) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Sign with a fixed time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn signing_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let ctx = match self.context {
            Some(ctx) => ctx,
            None => crate::default_context()?,
        };
        let config = self.config.with_env(&ctx);

        let region = config
            .region
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::invalid_argument("region is required"))?;
        let scheme = self.scheme.unwrap_or_else(|| "https".to_string());
        if scheme != "https" && scheme != "http" {
            return Err(Error::invalid_argument(format!(
                "unsupported scheme: {scheme}"
            )));
        }
        let min_part_size = self.min_part_size.unwrap_or(DEFAULT_MIN_PART_SIZE);
        if min_part_size == 0 {
            return Err(Error::invalid_argument("min part size must be positive"));
        }
        let upload_concurrency = self
            .upload_concurrency
            .unwrap_or(DEFAULT_UPLOAD_CONCURRENCY);
        if upload_concurrency == 0 {
            return Err(Error::invalid_argument("upload concurrency must be positive"));
        }

        let mut request_signer =
            RequestSigner::new().with_window(self.sign_window.unwrap_or(DEFAULT_SIGN_WINDOW));
        if let Some(time) = self.time {
            request_signer = request_signer.with_time(time);
        }

        let cred = config.credential();
        let host = HostResolver::new(cred.app_id.clone());
        let signer = Signer::new(cred, request_signer.clone());
        let pipeline = Pipeline::new()
            .with_step(host.clone())
            .with_step(signer.clone());

        let id = ClientId::next();
        let endpoint = format!("{scheme}://{region}.{ENDPOINT_SUFFIX}");
        debug!("built client {id:?} for {endpoint} with {config:?}");

        Ok(Client {
            inner: Arc::new(ClientInner {
                id,
                ctx,
                endpoint,
                pipeline,
                host,
                signer,
                request_signer,
                time: self.time,
                min_part_size,
                upload_concurrency,
            }),
        })
    }
}

/// Client of one COS region and account.
///
/// Cheap to clone. Clones share the same identity, so requests prepared by
/// one clone can be dispatched by another.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    id: ClientId,
    ctx: Context,
    endpoint: String,
    pipeline: Pipeline,
    host: HostResolver,
    signer: Signer<Credential>,
    request_signer: RequestSigner,
    time: Option<DateTime>,
    min_part_size: u64,
    upload_concurrency: usize,
}

impl Client {
    /// Create a builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Identity of this client.
    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    /// Context used for file reads and transport.
    pub fn context(&self) -> &Context {
        &self.inner.ctx
    }

    /// Regional endpoint, such as `https://ap-beijing.myqcloud.com`.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Multipart threshold used when upload options don't override it.
    pub fn min_part_size(&self) -> u64 {
        self.inner.min_part_size
    }

    /// Part upload concurrency used when upload options don't override it.
    pub fn upload_concurrency(&self) -> usize {
        self.inner.upload_concurrency
    }

    /// Names of the steps applied to every dispatched request, in order.
    pub fn pipeline(&self) -> Vec<&'static str> {
        self.inner.pipeline.names()
    }

    fn now(&self) -> DateTime {
        self.inner.time.unwrap_or_else(now)
    }

    fn check_owner(&self, req: &PreparedRequest) -> Result<()> {
        if req.client != self.inner.id {
            return Err(Error::invalid_argument(format!(
                "request {} was built by client {:?}, not by this client {:?}",
                req.name, req.client, self.inner.id
            )));
        }
        Ok(())
    }

    /// Build the request of an operation.
    pub fn execute_operation(&self, op: impl Into<Operation>) -> Result<PreparedRequest> {
        let op = op.into();
        let name = op.name();
        let request = op.into_request(&self.inner.endpoint)?;
        Ok(PreparedRequest {
            client: self.inner.id,
            name,
            request,
        })
    }

    /// Build the request of an operation given by name and flat parameters.
    ///
    /// See [`Operation::from_params`].
    pub fn execute<I, K, V>(&self, name: &str, params: I) -> Result<PreparedRequest>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.execute_operation(Operation::from_params(name, params)?)
    }

    /// Final virtual-hosted URL of an operation, without any signature.
    pub fn build_url(&self, op: impl Into<Operation>) -> Result<String> {
        let req = self.execute_operation(op)?;
        Ok(self.inner.host.resolve(req.uri())?.to_string())
    }

    /// Run the pipeline and send the request, whatever the response status.
    ///
    /// Transport failures are returned as `Dispatch` errors.
    pub async fn send(&self, req: PreparedRequest) -> Result<Response> {
        self.check_owner(&req)?;
        let name = req.name;

        let (mut parts, body) = req.request.into_parts();
        self.inner.pipeline.apply(&mut parts)?;
        debug!("dispatching {name}: {} {}", parts.method, parts.uri);

        let resp = self
            .inner
            .ctx
            .http_send(Request::from_parts(parts, body))
            .await
            .map_err(|e| Error::dispatch(format!("failed to send {name} request")).with_source(e))?;
        debug!("{name} responded with {}", resp.status());
        Ok(resp)
    }

    /// Send the request and fail on any non-2xx status.
    pub async fn dispatch(&self, req: PreparedRequest) -> Result<Response> {
        let name = req.name;
        let resp = self.send(req).await?;
        if !resp.status().is_success() {
            return Err(status_error(name, &resp));
        }
        Ok(resp)
    }

    /// Presign `req`, signing the host header and every query parameter.
    pub fn presigned_url(&self, req: &PreparedRequest, expires: Expiration) -> Result<String> {
        self.presigned_url_with(req, expires, SignedNames::Default)
    }

    /// Presign `req`, signing the given names.
    ///
    /// The token is carried in the query string, so the URL works as a plain
    /// link. `req` itself is left untouched.
    pub fn presigned_url_with(
        &self,
        req: &PreparedRequest,
        expires: Expiration,
        names: SignedNames,
    ) -> Result<String> {
        self.check_owner(req)?;

        let mut parts = Request::new(()).into_parts().0;
        parts.method = req.method().clone();
        parts.uri = req.uri().clone();
        parts.headers = req.headers().clone();

        self.inner.host.intercept(&mut parts)?;
        let expires_at = expires.resolve(self.now())?;
        self.inner.request_signer.presign(
            &mut parts,
            self.inner.signer.credential(),
            expires_at,
            &names,
        )?;
        Ok(parts.uri.to_string())
    }

    /// URL of an object, presigned when `expires` is given.
    pub fn get_object_url(
        &self,
        bucket: &str,
        key: &str,
        expires: Option<Expiration>,
    ) -> Result<String> {
        let op = GetObject::new(bucket, key)?;
        match expires {
            Some(expires) => self.presigned_url(&self.execute_operation(op)?, expires),
            None => self.build_url(op),
        }
    }
}

/// Error for a non-2xx response, carrying the service error when present.
pub(crate) fn status_error(name: &str, resp: &Response) -> Error {
    let status = resp.status();
    match parse_error(resp.body()) {
        Some(se) => {
            Error::dispatch(format!("{name} failed with status {status}: {}", se.code))
                .with_source(se)
        }
        None => Error::dispatch(format!("{name} failed with status {status}")),
    }
}
