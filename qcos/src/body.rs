use bytes::Bytes;
use qcos_core::{Context, Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Payload of an upload.
///
/// Both variants support random access, so a part upload only ever holds
/// its own slice in memory. Readers that cannot seek are buffered once by
/// [`Body::buffer`].
#[derive(Debug, Clone)]
pub enum Body {
    /// In-memory bytes. Slicing is zero-copy.
    Bytes(Bytes),
    /// A local file, read range by range through [`Context::file_read_range`].
    File {
        /// Path of the file.
        path: String,
    },
}

impl Body {
    /// Upload the file at `path`.
    pub fn file(path: impl Into<String>) -> Self {
        Body::File { path: path.into() }
    }

    /// Drain a non-seekable reader into memory.
    pub async fn buffer<R: AsyncRead + Unpin>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| Error::unexpected("failed to buffer upload body").with_source(e))?;
        Ok(Body::Bytes(Bytes::from(buf)))
    }

    /// Total size in bytes.
    pub async fn size(&self, ctx: &Context) -> Result<u64> {
        match self {
            Body::Bytes(bs) => Ok(bs.len() as u64),
            Body::File { path } => ctx.file_size(path).await,
        }
    }

    /// Read `[offset, offset + length)`.
    pub async fn read_range(&self, ctx: &Context, offset: u64, length: u64) -> Result<Bytes> {
        match self {
            Body::Bytes(bs) => {
                let end = offset
                    .checked_add(length)
                    .filter(|end| *end <= bs.len() as u64)
                    .ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "range {offset}+{length} is out of body of {} bytes",
                            bs.len()
                        ))
                    })?;
                Ok(bs.slice(offset as usize..end as usize))
            }
            Body::File { path } => ctx.file_read_range(path, offset, length).await,
        }
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bs: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bs))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}
