//! Core components for signing and dispatching object storage requests.
//!
//! This crate provides the foundational types and traits for the qcos
//! workspace. It holds no provider specific logic.
//!
//! ## Overview
//!
//! - **Context**: a container that holds implementations for file reading,
//!   HTTP sending and environment access.
//! - **Traits**: [`SignRequest`] signs a request with a credential,
//!   [`Intercept`] is one step of the outgoing request pipeline.
//! - **Signer**: binds an immutable credential to a [`SignRequest`] and runs
//!   as the authorization step of that pipeline.
//!
//! ## Example
//!
//! ```
//! use http::header::AUTHORIZATION;
//! use qcos_core::{Intercept, Result, SignRequest, Signer, SigningCredential};
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     token: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.token.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct BearerSigner;
//!
//! impl SignRequest for BearerSigner {
//!     type Credential = MyCredential;
//!
//!     fn sign_request(
//!         &self,
//!         req: &mut http::request::Parts,
//!         cred: &Self::Credential,
//!         _expires_in: Option<Duration>,
//!     ) -> Result<()> {
//!         req.headers
//!             .insert(AUTHORIZATION, format!("Bearer {}", cred.token).parse()?);
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let signer = Signer::new(MyCredential { token: "t".to_string() }, BearerSigner);
//! let mut parts = http::Request::builder()
//!     .uri("https://example.com")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! signer.intercept(&mut parts)?;
//! assert!(parts.headers.contains_key(AUTHORIZATION));
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod context;
pub use context::{Context, NoopEnv, NoopFileRead, NoopHttpSend};
mod fs;
pub use fs::FileRead;
mod http;
pub use self::http::HttpSend;
mod env;
pub use env::{Env, OsEnv, StaticEnv};

mod api;
pub use api::{Intercept, SignRequest, SigningCredential};
mod request;
pub use request::{SigningRequest, QUERY_ENCODE_SET};
mod signer;
pub use signer::Signer;
