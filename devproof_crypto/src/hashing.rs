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

use alloc::{format, vec::Vec};

use sha3::{Digest, Keccak256};

/// Prefix of the EIP-191 `personal_sign` message format (version `0x45`).
pub const EIP191_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Hashes `message` the way `personal_sign` does:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
///
/// Signatures over application messages are produced over a 32-byte message
/// hash, so the length component is `"32"` in practice.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let length = format!("{}", message.len());
    let mut payload = Vec::with_capacity(EIP191_PREFIX.len() + length.len() + message.len());
    payload.extend_from_slice(EIP191_PREFIX);
    payload.extend_from_slice(length.as_bytes());
    payload.extend_from_slice(message);
    keccak256(&payload)
}
