use crate::constants::{DEFAULT_SIGN_WINDOW, X_COS_SECURITY_TOKEN};
use crate::{sign_request, Credential, SignatureScope, SignedNames};
use chrono::TimeDelta;
use http::header::{AUTHORIZATION, DATE, HOST};
use http::request::Parts;
use http::HeaderValue;
use log::{debug, warn};
use qcos_core::time::{format_http_date, now, DateTime};
use qcos_core::{Error, Result, SignRequest, SigningRequest};
use std::time::Duration;

/// RequestSigner that implements Tencent COS signing.
///
/// - [Tencent COS Signature](https://cloud.tencent.com/document/product/436/7778)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    time: Option<DateTime>,
    window: Duration,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self {
            time: None,
            window: DEFAULT_SIGN_WINDOW,
        }
    }
}

impl RequestSigner {
    /// Create a new request signer for Tencent COS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long a header signature stays valid after send time.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    fn now(&self) -> DateTime {
        self.time.unwrap_or_else(now)
    }

    /// Sign the request with an `Authorization` header.
    ///
    /// Every header and query parameter present at this point is signed.
    pub fn sign_header(&self, req: &mut Parts, cred: &Credential) -> Result<()> {
        let mut signing_req = SigningRequest::build(req)?;

        let scope = SignatureScope::with_window(self.now(), self.window)?
            .with_names(&SignedNames::All, &signing_req);
        let token = sign_request(cred, &signing_req, &scope)?;

        if !signing_req.headers.contains_key(DATE) {
            signing_req
                .headers
                .insert(DATE, format_http_date(self.now()).parse()?);
        }
        signing_req.headers.insert(AUTHORIZATION, {
            let mut value: HeaderValue = token.as_str().parse()?;
            value.set_sensitive(true);
            value
        });

        if let Some(token) = &cred.security_token {
            signing_req.headers.insert(X_COS_SECURITY_TOKEN, {
                let mut value: HeaderValue = token.parse()?;
                value.set_sensitive(true);
                value
            });
        }

        signing_req.apply(req)
    }

    /// Sign the request into its query string, valid until `expires_at`.
    ///
    /// An `expires_at` that is not after now still yields a well formed
    /// token, whose one second window ends at `expires_at`.
    pub fn presign(
        &self,
        req: &mut Parts,
        cred: &Credential,
        expires_at: DateTime,
        names: &SignedNames,
    ) -> Result<()> {
        let now = self.now();
        let mut signing_req = SigningRequest::build(req)?;

        if !signing_req.headers.contains_key(HOST) {
            let host = signing_req.authority.as_str().parse()?;
            signing_req.headers.insert(HOST, host);
        }

        let valid_from = if expires_at.timestamp() <= now.timestamp() {
            warn!("presigning with expiration {expires_at} which is not after {now}");
            expires_at - TimeDelta::seconds(1)
        } else {
            now
        };
        let scope = SignatureScope::new(valid_from, expires_at).with_names(names, &signing_req);
        let token = sign_request(cred, &signing_req, &scope)?;
        debug!("presigned with key time {}", scope.key_time());

        for (k, v) in token.pairs() {
            signing_req.query_push(k, v);
        }
        if let Some(token) = &cred.security_token {
            signing_req.query_push(X_COS_SECURITY_TOKEN, token.as_str());
        }

        signing_req.apply(req)
    }
}

impl SignRequest for RequestSigner {
    type Credential = Credential;

    fn sign_request(
        &self,
        req: &mut Parts,
        cred: &Self::Credential,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        match expires_in {
            None => self.sign_header(req, cred),
            Some(expires_in) => {
                let expires_in = TimeDelta::from_std(expires_in).map_err(|e| {
                    Error::invalid_scope("expiration is too far away").with_source(e)
                })?;
                let expires_at = self
                    .now()
                    .checked_add_signed(expires_in)
                    .ok_or_else(|| Error::invalid_scope("expiration overflows"))?;
                self.presign(req, cred, expires_at, &SignedNames::Default)
            }
        }
    }
}
