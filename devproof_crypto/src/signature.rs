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

use core::fmt;

use crate::{CryptoError, SIGNATURE_LENGTH};

/// An Ethereum-style recoverable ECDSA signature: `r || s || v`.
///
/// `v` is kept as supplied. Both the raw recovery id (`0`/`1`) and the
/// legacy `27`/`28` form are understood by [`RecoverableSignature::recovery_id`].
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct RecoverableSignature([u8; SIGNATURE_LENGTH]);

impl RecoverableSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::MalformedSignature(bytes.len()))?;
        Ok(RecoverableSignature(bytes))
    }

    pub(crate) fn from_parts(r_and_s: &[u8], recovery_id: u8) -> Self {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(r_and_s);
        bytes[64] = 27 + recovery_id;
        RecoverableSignature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..64]
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Returns the y-parity bit encoded in `v`, or `None` for any `v` other
    /// than `0`, `1`, `27` or `28`.
    pub fn recovery_id(&self) -> Option<u8> {
        match self.v() {
            v @ (0 | 1) => Some(v),
            v @ (27 | 28) => Some(v - 27),
            _ => None,
        }
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature(0x{})", hex::encode(self.0))
    }
}
