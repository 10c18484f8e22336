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

//! Verification of the three-hop chain of custody behind an application
//! signature:
//!
//! 1. the key-management root signs the application's public key, scoped to
//!    an application id;
//! 2. the application key signs a derived key, scoped to a purpose;
//! 3. the derived key signs the application message.
//!
//! A relying party that trusts the root address can accept a message from a
//! specific application without ever talking to the key-management service.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod chain;
pub mod issuer;
pub mod verifier;

pub use chain::{ApplicationId, SignatureChain};
pub use verifier::{
    ChainEvent, ChainFailure, ChainVerification, MalformedInput, SignatureChainVerifier,
};

/// Domain separation tag the key-management root prepends to every
/// application key it certifies.
pub const ROOT_ATTESTATION_DOMAIN: &[u8] = b"dstack-kms-issued:";

/// Separator between the purpose and the hex-encoded derived key in the
/// message the application key signs.
pub const PURPOSE_SEPARATOR: &str = ":";
