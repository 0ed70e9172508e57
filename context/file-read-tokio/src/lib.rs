// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Tokio-based file reading implementation for qcos.
//!
//! This crate provides `TokioFileRead`, an async file reader that implements
//! the `FileRead` trait from `qcos_core` using Tokio's file system operations.
//!
//! ## Overview
//!
//! Uploads backed by a local file read one part at a time: the file is
//! opened, seeked to the part offset and exactly one part is read. A
//! multi-gigabyte file therefore never has to fit in memory.
//!
//! ## Example
//!
//! ```no_run
//! use qcos_core::Context;
//! use qcos_file_read_tokio::TokioFileRead;
//!
//! #[tokio::main]
//! async fn main() -> qcos_core::Result<()> {
//!     let ctx = Context::new().with_file_read(TokioFileRead);
//!
//!     let size = ctx.file_size("/path/to/archive.tar").await?;
//!     let head = ctx.file_read_range("/path/to/archive.tar", 0, size.min(512)).await?;
//!     println!("read {} of {size} bytes", head.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use qcos_core::{Error, FileRead, Result};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_size(&self, path: &str) -> Result<u64> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::unexpected(format!("failed to stat file {path}")).with_source(e))?;
        if !meta.is_file() {
            return Err(Error::invalid_argument(format!("{path} is not a file")));
        }
        Ok(meta.len())
    }

    async fn file_read_range(&self, path: &str, offset: u64, length: u64) -> Result<Bytes> {
        let len = usize::try_from(length).map_err(|_| {
            Error::invalid_argument(format!("range length {length} does not fit in memory"))
        })?;

        let mut f = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::unexpected(format!("failed to open file {path}")).with_source(e))?;
        f.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0; len];
        f.read_exact(&mut buf).await.map_err(|e| {
            Error::unexpected(format!(
                "failed to read {length} bytes at offset {offset} from {path}"
            ))
            .with_source(e)
        })?;
        Ok(Bytes::from(buf))
    }
}
