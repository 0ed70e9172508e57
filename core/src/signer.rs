use crate::{Error, Intercept, Result, SignRequest, SigningCredential};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Signer binds one immutable credential to a request signer.
///
/// The credential is shared read-only by every clone, so concurrent part
/// uploads sign without any synchronization.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    credential: Arc<K>,
    builder: Arc<dyn SignRequest<Credential = K>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(credential: K, builder: impl SignRequest<Credential = K>) -> Self {
        Self {
            credential: Arc::new(credential),
            builder: Arc::new(builder),
        }
    }

    /// Get the credential used by this signer.
    pub fn credential(&self) -> &K {
        &self.credential
    }

    /// Signing request.
    pub fn sign(&self, req: &mut http::request::Parts, expires_in: Option<Duration>) -> Result<()> {
        if !self.credential.is_valid() {
            warn!("refusing to sign {} {}: credential is not valid", req.method, req.uri);
            return Err(Error::invalid_credentials(
                "secret id and secret key must not be empty",
            ));
        }

        debug!("signing {} {} with expires_in {expires_in:?}", req.method, req.uri);
        self.builder.sign_request(req, &self.credential, expires_in)
    }
}

impl<K: SigningCredential> Intercept for Signer<K> {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn intercept(&self, req: &mut http::request::Parts) -> Result<()> {
        self.sign(req, None)
    }
}
