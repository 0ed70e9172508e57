use crate::PartResult;
use qcos_core::{Error, Result};
use quick_xml::{de, se};
use serde::{Deserialize, Serialize};

/// Error document returned by the service.
///
/// Attached as the source of dispatch and completion errors.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[serde(default, rename_all = "PascalCase")]
#[error("{code}: {message} (request id: {request_id})")]
pub struct ServiceError {
    /// Error code such as `NoSuchKey` or `InvalidPart`.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Request id assigned by the service.
    pub request_id: String,
}

/// Parse `body` if it is an `<Error>` document.
pub(crate) fn parse_error(body: &[u8]) -> Option<ServiceError> {
    let s = std::str::from_utf8(body).ok()?.trim_start();
    let root = match s.strip_prefix("<?xml") {
        Some(rest) => rest.split_once("?>")?.1.trim_start(),
        None => s,
    };
    if !(root.starts_with("<Error>") || root.starts_with("<Error ")) {
        return None;
    }
    de::from_str(root).ok()
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InitiateMultipartUploadResult {
    upload_id: String,
}

/// Extract the upload id from an initiate response.
pub(crate) fn parse_upload_id(body: &[u8]) -> Result<String> {
    let s = std::str::from_utf8(body)
        .map_err(|e| Error::unexpected("initiate response is not utf-8").with_source(e))?;
    let resp: InitiateMultipartUploadResult = de::from_str(s).map_err(|e| {
        Error::unexpected("failed to parse initiate multipart upload response").with_source(e)
    })?;
    if resp.upload_id.is_empty() {
        return Err(Error::unexpected("initiate response carries no upload id"));
    }
    Ok(resp.upload_id)
}

#[derive(Debug, Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
struct CompleteMultipartUpload<'a> {
    #[serde(rename = "Part")]
    parts: Vec<CompletedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct CompletedPart<'a> {
    #[serde(rename = "PartNumber")]
    part_number: u32,
    #[serde(rename = "ETag")]
    etag: &'a str,
}

/// Render the part list of a completion request, in the given order.
pub(crate) fn complete_body(parts: &[PartResult]) -> Result<String> {
    let doc = CompleteMultipartUpload {
        parts: parts
            .iter()
            .map(|p| CompletedPart {
                part_number: p.index,
                etag: &p.etag,
            })
            .collect(),
    };
    se::to_string(&doc)
        .map_err(|e| Error::unexpected("failed to render completion body").with_source(e))
}
