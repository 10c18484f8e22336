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

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Everything a relying party needs to check one application-signed message.
///
/// Fields are kept as raw bytes exactly as received; structural validation is
/// part of verification so that a malformed record is reported, not rejected
/// at parse time. The serialized field names follow the proof struct the
/// on-chain verifier consumes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureChain {
    #[serde(with = "hex_array")]
    pub message_hash: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub message_signature: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub app_signature: Vec<u8>,
    #[serde(rename = "kmsSignature", with = "hex_bytes")]
    pub root_signature: Vec<u8>,
    #[serde(rename = "derivedCompressedPubkey", with = "hex_bytes")]
    pub derived_public_key: Vec<u8>,
    #[serde(rename = "appCompressedPubkey", with = "hex_bytes")]
    pub app_public_key: Vec<u8>,
    pub purpose: String,
}

/// The identity the key-management root binds an application key to.
///
/// dstack application ids are 20 bytes, but the id is treated as an opaque
/// byte string and hashed exactly as given.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ApplicationId(Vec<u8>);

impl ApplicationId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ApplicationId(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for ApplicationId {
    type Err = hex::FromHexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        hex::decode(value.strip_prefix("0x").unwrap_or(value)).map(ApplicationId)
    }
}

impl Serialize for ApplicationId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ApplicationId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
}

/// `0x`-prefixed hex for variable-length byte fields.
pub(crate) mod hex_bytes {
    use alloc::{format, string::String, vec::Vec};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::decode_hex(&value).map_err(serde::de::Error::custom)
    }
}

/// `0x`-prefixed hex for 32-byte hashes.
pub(crate) mod hex_array {
    use alloc::string::String;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        super::hex_bytes::serialize(bytes, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let value = String::deserialize(deserializer)?;
        let bytes = super::decode_hex(&value).map_err(serde::de::Error::custom)?;
        bytes.as_slice().try_into().map_err(|_| {
            serde::de::Error::invalid_length(bytes.len(), &"32 bytes")
        })
    }
}
