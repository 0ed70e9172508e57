use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// FileRead gives random access to local files used as upload bodies.
///
/// Multipart uploads read one part at a time through `file_read_range`, so a
/// large file is never loaded into memory as a whole.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Return the size of the file in bytes.
    async fn file_size(&self, path: &str) -> Result<u64>;

    /// Read exactly `length` bytes starting at `offset`.
    async fn file_read_range(&self, path: &str, offset: u64, length: u64) -> Result<Bytes>;
}
