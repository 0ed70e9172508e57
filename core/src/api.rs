use crate::Result;
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is the trait used by signer as the signing key.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential carries usable secret material.
    fn is_valid(&self) -> bool;
}

/// SignRequest is the trait used by signer to sign the request.
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: SigningCredential;

    /// Sign the request in place.
    ///
    /// ## Expires In
    ///
    /// Without `expires_in` the signature is attached as a header and stays
    /// valid for the signer's own short window. With `expires_in` the
    /// signature is carried in the query string instead, so the resulting URI
    /// works without any custom header.
    fn sign_request(
        &self,
        req: &mut http::request::Parts,
        cred: &Self::Credential,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}

/// Intercept is one step of the pipeline every outgoing request passes
/// through right before transmission.
///
/// Steps run in a fixed order, exactly once per request. They are plain
/// synchronous transformations and never perform I/O.
pub trait Intercept: Debug + Send + Sync + 'static {
    /// Short name of this step, used in logs.
    fn name(&self) -> &'static str;

    /// Transform the outgoing request.
    fn intercept(&self, req: &mut http::request::Parts) -> Result<()>;
}
