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

use qcos_core::{Context, OsEnv, Result};

/// Context backed by tokio file reads, a reqwest transport and the process
/// environment.
///
/// Requests time out after ten minutes, which leaves room for large parts on
/// slow links.
#[cfg(feature = "default-context")]
pub fn default_context() -> Result<Context> {
    use qcos_file_read_tokio::TokioFileRead;
    use qcos_http_send_reqwest::ReqwestHttpSend;
    use std::time::Duration;

    let http = ReqwestHttpSend::with_timeouts(Duration::from_secs(600), Duration::from_secs(600))?;
    Ok(Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(http)
        .with_env(OsEnv))
}

/// Context reading only the process environment.
///
/// File reads and transport are no-ops: pass your own context to
/// [`crate::ClientBuilder::context`].
#[cfg(not(feature = "default-context"))]
pub fn default_context() -> Result<Context> {
    Ok(Context::new().with_env(OsEnv))
}
