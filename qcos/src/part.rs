use crate::{Body, Client, UploadPart, UploadSession};
use bytes::Bytes;
use http::header::ETAG;
use log::debug;
use qcos_core::{Error, Result};

/// The service accepts at most this many parts per upload.
pub const MAX_PARTS: u64 = 10_000;

/// One byte range of a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartDescriptor {
    /// Part number, starting at 1.
    pub index: u32,
    /// Offset of the first byte.
    pub offset: u64,
    /// Number of bytes.
    pub length: u64,
}

/// An uploaded part and the entity tag the service returned for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResult {
    /// Part number, starting at 1.
    pub index: u32,
    /// Entity tag, kept exactly as returned (quotes included).
    pub etag: String,
}

impl PartResult {
    /// Create a new part result.
    pub fn new(index: u32, etag: impl Into<String>) -> Self {
        Self {
            index,
            etag: etag.into(),
        }
    }
}

/// Part size used for an upload of `total_size` bytes.
///
/// Never below `min_part_size`, and large enough to stay within
/// [`MAX_PARTS`].
pub fn part_size_for(total_size: u64, min_part_size: u64) -> u64 {
    min_part_size.max(total_size.div_ceil(MAX_PARTS))
}

/// Split `[0, total_size)` into contiguous parts of `part_size` bytes.
///
/// Only the last part may be shorter. An empty body has no parts.
pub fn plan_parts(total_size: u64, part_size: u64) -> Result<Vec<PartDescriptor>> {
    if part_size == 0 {
        return Err(Error::invalid_argument("part size must be positive"));
    }
    let count = total_size.div_ceil(part_size);
    if count > u64::from(u32::MAX) {
        return Err(Error::invalid_argument(format!(
            "{total_size} bytes in parts of {part_size} bytes needs too many parts"
        )));
    }

    Ok((0..count)
        .map(|i| {
            let offset = i * part_size;
            PartDescriptor {
                index: (i + 1) as u32,
                offset,
                length: part_size.min(total_size - offset),
            }
        })
        .collect())
}

/// Uploads the parts of one session.
///
/// Cheap to share between workers: the body is either reference counted
/// bytes or a file path.
#[derive(Debug, Clone)]
pub struct PartUploader {
    client: Client,
    session: UploadSession,
    body: Body,
}

impl PartUploader {
    /// Create an uploader for `session` reading from `body`.
    pub fn new(client: Client, session: UploadSession, body: Body) -> Self {
        Self {
            client,
            session,
            body,
        }
    }

    /// Read the slice of `part` and upload it.
    ///
    /// Safe to call again for the same part: a later upload of the same part
    /// number replaces the earlier one.
    pub async fn upload(&self, part: PartDescriptor) -> Result<PartResult> {
        let slice = self
            .body
            .read_range(self.client.context(), part.offset, part.length)
            .await
            .map_err(|e| Error::part_upload_failed(part.index).with_source(e))?;

        self.client
            .upload_part(&self.session, part, slice)
            .await
            .map_err(|e| Error::part_upload_failed(part.index).with_source(e))
    }
}

impl Client {
    /// Upload one slice as part `part.index` of `session`.
    pub async fn upload_part(
        &self,
        session: &UploadSession,
        part: PartDescriptor,
        slice: Bytes,
    ) -> Result<PartResult> {
        if slice.len() as u64 != part.length {
            return Err(Error::invalid_argument(format!(
                "part {} expects {} bytes but got {}",
                part.index,
                part.length,
                slice.len()
            )));
        }

        let op = UploadPart::new(
            session.plan().bucket(),
            session.plan().key(),
            session.upload_id(),
            part.index,
            slice,
        )?;
        let req = self.execute_operation(session.plan().with_extra_params(op.into()))?;
        let resp = self.dispatch(req).await?;

        let etag = resp
            .headers()
            .get(ETAG)
            .ok_or_else(|| Error::unexpected(format!("part {} response has no etag", part.index)))?
            .to_str()?
            .to_string();
        debug!("uploaded part {} with etag {etag}", part.index);
        Ok(PartResult::new(part.index, etag))
    }
}
