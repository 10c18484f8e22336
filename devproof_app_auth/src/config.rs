//
// Copyright 2025 The Project Oak Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use devproof_crypto::Address;
use serde::{Deserialize, Serialize};

use crate::identity::{DeviceId, IdentityHash};

/// Construction parameters of a whitelist instance. The notice period and the
/// device flag are fixed for the lifetime of the instance.
///
/// ```json
/// {
///   "owner": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
///   "noticePeriod": 120,
///   "allowAnyDevice": true,
///   "initialCodeHash": "0x…"
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppAuthConfig {
    pub owner: Address,
    /// In seconds.
    pub notice_period: u64,
    #[serde(default)]
    pub allow_any_device: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_code_hash: Option<IdentityHash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_devices: Vec<DeviceId>,
}

impl AppAuthConfig {
    pub fn notice_period(&self) -> Duration {
        Duration::from_secs(self.notice_period)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("couldn't parse whitelist config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("couldn't read config file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }
}
