#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub use qcos_core::{time, Context, Error, ErrorKind, Result};
pub use qcos_sign::{Config, Credential, SignedNames};

/// Signing primitives: canonical signer, scopes and host resolution.
pub mod sign {
    pub use qcos_sign::*;
}

mod body;
pub use body::Body;
mod client;
pub use client::{
    Client, ClientBuilder, ClientId, Expiration, PreparedRequest, Response, DEFAULT_MIN_PART_SIZE,
    DEFAULT_UPLOAD_CONCURRENCY,
};
mod context;
pub use context::default_context;
mod key;
pub use key::{decode_key, encode_key, explode_key};
mod operation;
pub use operation::{
    AbortMultipartUpload, Acl, CompleteMultipartUpload, GetObject, HeadObject,
    InitiateMultipartUpload, ObjectLocation, Operation, OperationKind, PutObject, UploadPart,
};
mod part;
pub use part::{part_size_for, plan_parts, PartDescriptor, PartResult, PartUploader, MAX_PARTS};
mod pipeline;
pub use pipeline::Pipeline;
mod upload;
pub use upload::{UploadOptions, UploadPlan, UploadSession, UploadState};
mod xml;
pub use xml::ServiceError;
