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

//! secp256k1 primitives shared by the signature chain verifier and its
//! callers: Keccak-256 and EIP-191 hashing, 20-byte addresses, compressed
//! public keys and 65-byte recoverable signatures.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod address;
pub mod hashing;
pub mod public_key;
pub mod recovery;
pub mod signature;
pub mod signer;

pub use address::Address;
pub use hashing::{eip191_hash, keccak256};
pub use public_key::{decompress_public_key, CompressedPublicKey, UncompressedPublicKey};
pub use recovery::{recover_signer, KeyRecovery, Secp256k1};
pub use signature::RecoverableSignature;
pub use signer::{signing_key_from_seed, Signer};

pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;
pub const SIGNATURE_LENGTH: usize = 65;

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum CryptoError {
    #[error("malformed signature: expected 65 bytes, got {0}")]
    MalformedSignature(usize),
    #[error("malformed public key: {0}")]
    MalformedPublicKey(&'static str),
    #[error("x-coordinate is not on the secp256k1 curve")]
    PointNotOnCurve,
    #[error("could not recover a public key from the signature")]
    RecoveryFailed,
    #[error("signature recovers to the zero address")]
    ZeroAddress,
    #[error("signing failed")]
    SigningFailed,
    #[error("invalid hex: {0}")]
    InvalidHex(hex::FromHexError),
}

// Not `#[from]`: `FromHexError` is only an `Error` with hex's `std` feature.
impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidHex(err)
    }
}
