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

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Implements hex `Display`, `Debug` and serde for a 32-byte identifier.
macro_rules! hex_identifier {
    ($name:ident) => {
        impl $name {
            pub const fn new(bytes: [u8; 32]) -> Self {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(de::Error::custom)
            }
        }
    };
}

/// Digest of a reproducibly built code artifact, e.g. a dstack compose hash.
/// Equality is the only thing the whitelist looks at.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IdentityHash([u8; 32]);

hex_identifier!(IdentityHash);

impl IdentityHash {
    /// SHA-256 of the canonical JSON of an `app-compose` document: keys
    /// sorted, no insignificant whitespace, non-ASCII characters escaped as
    /// `\uXXXX`. This is the compose hash dstack measures into the TDX
    /// `mr_config_id` register.
    ///
    /// Nothing about the deployment (name, instance, salt) is folded in; two
    /// deployments of the same compose document share an identity.
    pub fn from_app_compose(compose: &Value) -> Self {
        IdentityHash(Sha256::digest(canonical_json(compose).as_bytes()).into())
    }
}

impl FromStr for IdentityHash {
    type Err = hex::FromHexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(value.strip_prefix("0x").unwrap_or(value), &mut bytes)?;
        Ok(IdentityHash(bytes))
    }
}

/// Identifier of a single TEE instance.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeviceId([u8; 32]);

hex_identifier!(DeviceId);

/// Shorter inputs are left-padded with zeros, so `0xabcd` names the same
/// device as `0x00…abcd`.
impl FromStr for DeviceId {
    type Err = hex::FromHexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value.strip_prefix("0x").unwrap_or(value);
        if digits.len() > 64 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(padded, &mut bytes)?;
        Ok(DeviceId(bytes))
    }
}

fn canonical_json(value: &Value) -> String {
    let mut output = String::new();
    write_canonical(value, &mut output);
    output
}

fn write_canonical(value: &Value, output: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            output.push('{');
            for (index, (key, value)) in sorted.into_iter().enumerate() {
                if index > 0 {
                    output.push(',');
                }
                write_ascii_json(&Value::String(key.clone()), output);
                output.push(':');
                write_canonical(value, output);
            }
            output.push('}');
        }
        Value::Array(items) => {
            output.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    output.push(',');
                }
                write_canonical(item, output);
            }
            output.push(']');
        }
        scalar => write_ascii_json(scalar, output),
    }
}

fn write_ascii_json(scalar: &Value, output: &mut String) {
    for character in scalar.to_string().chars() {
        if character.is_ascii() {
            output.push(character);
        } else {
            let mut units = [0u16; 2];
            for unit in character.encode_utf16(&mut units) {
                output.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use serde_json::json;

    use super::*;

    #[googletest::test]
    fn canonical_json_sorts_keys_recursively() {
        let compose = json!({"name": "oracle", "features": ["kms"], "a": {"z": 1, "b": true}});
        assert_that!(
            canonical_json(&compose),
            eq(r#"{"a":{"b":true,"z":1},"features":["kms"],"name":"oracle"}"#)
        );
    }

    #[googletest::test]
    fn canonical_json_escapes_non_ascii() {
        let compose = json!({"name": "café ☕"});
        assert_that!(canonical_json(&compose), eq(r#"{"name":"caf\u00e9 \u2615"}"#));
    }

    #[googletest::test]
    fn compose_hash_ignores_key_order() {
        let first = json!({"manifest_version": 2, "name": "timelock-oracle", "kms_enabled": true});
        let second = json!({"kms_enabled": true, "name": "timelock-oracle", "manifest_version": 2});
        assert_that!(
            IdentityHash::from_app_compose(&first),
            eq(IdentityHash::from_app_compose(&second))
        );
        assert_that!(
            IdentityHash::from_app_compose(&first),
            eq(IdentityHash(Sha256::digest(
                br#"{"kms_enabled":true,"manifest_version":2,"name":"timelock-oracle"}"#
            )
            .into()))
        );
    }

    #[googletest::test]
    fn identity_hash_round_trips_through_hex() {
        let hash: IdentityHash = format!("0x{}", "01".repeat(32)).parse().unwrap();
        assert_that!(hash, eq(IdentityHash::new([1u8; 32])));
        assert_that!(hash.to_string(), eq(&format!("0x{}", "01".repeat(32))));
        assert_that!("0x0102".parse::<IdentityHash>(), err(anything()));
    }

    #[googletest::test]
    fn device_id_is_left_padded() {
        let device: DeviceId = "0xabcd".parse().unwrap();
        let mut expected = [0u8; 32];
        expected[30] = 0xab;
        expected[31] = 0xcd;
        assert_that!(device, eq(DeviceId::new(expected)));
        assert_that!(format!("0x{}", "f".repeat(65)).parse::<DeviceId>(), err(anything()));
    }
}
