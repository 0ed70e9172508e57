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

use crate::constants::*;
use crate::Credential;
use qcos_core::utils::Redact;
use qcos_core::Context;
use std::fmt::{Debug, Formatter};

/// Config for Tencent COS clients.
///
/// Fields that are already set are never overwritten by environment lookups.
#[derive(Clone, Default)]
pub struct Config {
    /// Region such as `ap-guangzhou` or `cos.ap-guangzhou`.
    pub region: Option<String>,
    /// Account id (APPID)
    pub app_id: Option<String>,
    /// Secret ID
    pub secret_id: Option<String>,
    /// Secret Key
    pub secret_key: Option<String>,
    /// Security token for temporary credentials
    pub security_token: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("app_id", &self.app_id)
            .field("secret_id", &Redact::from(&self.secret_id))
            .field("secret_key", &Redact::from(&self.secret_key))
            .field("security_token", &Redact::from(&self.security_token))
            .finish()
    }
}

impl Config {
    /// Load config from environment variables.
    pub fn from_env(ctx: &Context) -> Self {
        Self::default().with_env(ctx)
    }

    /// Fill every unset field from environment variables.
    pub fn with_env(self, ctx: &Context) -> Self {
        let lookup = |primary: &str, fallback: &str| {
            ctx.env_var(primary)
                .or_else(|| ctx.env_var(fallback))
                .filter(|v| !v.is_empty())
        };

        Self {
            region: self
                .region
                .or_else(|| lookup(TENCENTCLOUD_REGION, QCLOUD_REGION)),
            app_id: self
                .app_id
                .or_else(|| lookup(TENCENTCLOUD_APPID, QCLOUD_APPID)),
            secret_id: self
                .secret_id
                .or_else(|| lookup(TENCENTCLOUD_SECRET_ID, QCLOUD_SECRET_ID)),
            secret_key: self
                .secret_key
                .or_else(|| lookup(TENCENTCLOUD_SECRET_KEY, QCLOUD_SECRET_KEY)),
            security_token: self
                .security_token
                .or_else(|| lookup(TENCENTCLOUD_SECURITY_TOKEN, QCLOUD_SECURITY_TOKEN)),
        }
    }

    /// Build the static credential described by this config.
    ///
    /// Missing fields become empty strings; signing rejects them later.
    pub fn credential(&self) -> Credential {
        Credential {
            app_id: self.app_id.clone().unwrap_or_default(),
            secret_id: self.secret_id.clone().unwrap_or_default(),
            secret_key: self.secret_key.clone().unwrap_or_default(),
            security_token: self.security_token.clone(),
        }
    }
}
