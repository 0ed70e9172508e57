use chrono::TimeDelta;
use http::header::HOST;
use qcos_core::time::DateTime;
use qcos_core::{Error, Result, SigningRequest};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Validity window and signed names of one signing operation.
///
/// Names are stored lower cased. A scope is created fresh for every
/// signature and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureScope {
    valid_from: DateTime,
    valid_until: DateTime,
    signed_headers: BTreeSet<String>,
    signed_params: BTreeSet<String>,
}

impl SignatureScope {
    /// Create a scope that signs no header and no parameter yet.
    pub fn new(valid_from: DateTime, valid_until: DateTime) -> Self {
        Self {
            valid_from,
            valid_until,
            signed_headers: BTreeSet::new(),
            signed_params: BTreeSet::new(),
        }
    }

    /// Create a scope that starts at `valid_from` and lasts `window`.
    pub fn with_window(valid_from: DateTime, window: Duration) -> Result<Self> {
        let window = TimeDelta::from_std(window)
            .map_err(|e| Error::invalid_scope("signature window is too large").with_source(e))?;
        let valid_until = valid_from
            .checked_add_signed(window)
            .ok_or_else(|| Error::invalid_scope("signature window overflows"))?;
        Ok(Self::new(valid_from, valid_until))
    }

    /// Add header names to sign.
    pub fn with_signed_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.signed_headers
            .extend(names.into_iter().map(|v| v.as_ref().to_lowercase()));
        self
    }

    /// Add query parameter names to sign.
    pub fn with_signed_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.signed_params
            .extend(names.into_iter().map(|v| v.as_ref().to_lowercase()));
        self
    }

    /// Add the names selected by `names` out of those present in `req`.
    pub fn with_names(self, names: &SignedNames, req: &SigningRequest) -> Self {
        match names {
            SignedNames::Default => {
                let hosts = req.header_names().into_iter().filter(|k| k == HOST.as_str());
                self.with_signed_headers(hosts)
                    .with_signed_params(req.query_names())
            }
            SignedNames::All => self
                .with_signed_headers(req.header_names())
                .with_signed_params(req.query_names()),
            SignedNames::Selected { headers, params } => {
                self.with_signed_headers(headers).with_signed_params(params)
            }
        }
    }

    /// Start of the validity window.
    pub fn valid_from(&self) -> DateTime {
        self.valid_from
    }

    /// End of the validity window.
    pub fn valid_until(&self) -> DateTime {
        self.valid_until
    }

    /// Check whether the lower cased header name is signed.
    pub fn is_signed_header(&self, name: &str) -> bool {
        self.signed_headers.contains(name)
    }

    /// Check whether the lower cased parameter name is signed.
    pub fn is_signed_param(&self, name: &str) -> bool {
        self.signed_params.contains(name)
    }

    /// `{valid_from};{valid_until}` in unix seconds.
    pub fn key_time(&self) -> String {
        format!(
            "{};{}",
            self.valid_from.timestamp(),
            self.valid_until.timestamp()
        )
    }

    /// Reject empty or inverted windows.
    ///
    /// The service only sees whole seconds, so the comparison is done on
    /// unix seconds as well.
    pub fn validate(&self) -> Result<()> {
        if self.valid_until.timestamp() <= self.valid_from.timestamp() {
            return Err(Error::invalid_scope(format!(
                "signature scope {} is empty or inverted",
                self.key_time()
            )));
        }
        Ok(())
    }

    /// Check whether the window has already ended at `now`.
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        self.valid_until <= now
    }
}

/// Which headers and query parameters a signature covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SignedNames {
    /// The `host` header and every query parameter present.
    #[default]
    Default,
    /// Every header and every query parameter present.
    All,
    /// Exactly the given names. Names absent from the request are ignored.
    Selected {
        /// Header names.
        headers: Vec<String>,
        /// Query parameter names.
        params: Vec<String>,
    },
}

/// Token produced by the canonical signer.
///
/// It is a `&` joined list of `q-*` pairs, usable verbatim as an
/// `Authorization` header or split into query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    /// Borrow the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the token string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Iterate over the `(name, value)` pairs of this token in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .split('&')
            .map(|kv| kv.split_once('=').unwrap_or((kv, "")))
    }

    /// Get the value of one pair, such as `q-key-time`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs().find(|(k, _)| *k == name).map(|(_, v)| v)
    }
}

impl Display for SignedToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
