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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::{DeviceId, IdentityHash};

pub const CODE_NOT_ALLOWED: &str = "code identity not allowed";
pub const DEVICE_NOT_ALLOWED: &str = "device not allowed";

/// What a booting application presents to the key management service.
///
/// Only the code identity hash and the device are checked here; the
/// application id and measurements are carried through for the caller.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootDescriptor {
    pub code_identity_hash: IdentityHash,
    pub device_id: DeviceId,
    #[serde(with = "prefixed_hex", default)]
    pub application_id: Vec<u8>,
    #[serde(default)]
    pub measurements: BTreeMap<String, String>,
}

impl BootDescriptor {
    pub fn new(code_identity_hash: IdentityHash, device_id: DeviceId) -> Self {
        BootDescriptor {
            code_identity_hash,
            device_id,
            application_id: Vec::new(),
            measurements: BTreeMap::new(),
        }
    }
}

/// Byte strings as `0x`-prefixed hex; the prefix is optional on input.
mod prefixed_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        hex::decode(value.strip_prefix("0x").unwrap_or(&value)).map_err(de::Error::custom)
    }
}

/// Result of an admission check. `reason` is empty when allowed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AdmissionDecision {
    pub fn allow() -> Self {
        AdmissionDecision { allowed: true, reason: String::new() }
    }

    pub fn deny(reason: &str) -> Self {
        AdmissionDecision { allowed: false, reason: reason.to_string() }
    }
}
