//! Tencent COS request signing.
//!
//! - [`sign`] is the canonical signer: a pure function from credential,
//!   request components and [`SignatureScope`] to a [`SignedToken`].
//! - [`RequestSigner`] plugs the canonical signer into
//!   [`qcos_core::Signer`], either as an `Authorization` header or as
//!   presigned query parameters.
//! - [`HostResolver`] rewrites path-style requests into virtual-hosted
//!   style before they are signed.
//!
//! See [Tencent COS Signature](https://cloud.tencent.com/document/product/436/7778)
//! for the algorithm.

mod constants;
pub use constants::*;

mod credential;
pub use credential::Credential;

mod config;
pub use config::Config;

mod scope;
pub use scope::{SignatureScope, SignedNames, SignedToken};

mod sign;
pub use sign::{sign, sign_request};

mod sign_request;
pub use sign_request::RequestSigner;

mod host;
pub use host::HostResolver;
