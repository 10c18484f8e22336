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

//! The signing side of the chain. The key-management root, the application
//! and its derived key each produce one hop; the digests here are the exact
//! preimages the verifier reconstructs.

use alloc::{format, vec::Vec};

use devproof_crypto::{
    eip191_hash, keccak256, CompressedPublicKey, CryptoError, RecoverableSignature, Signer,
};

use crate::{chain::ApplicationId, PURPOSE_SEPARATOR, ROOT_ATTESTATION_DOMAIN};

/// `keccak256("dstack-kms-issued:" || application_id || app_public_key)`.
pub fn root_attestation_digest(
    application_id: &ApplicationId,
    app_public_key: &CompressedPublicKey,
) -> [u8; 32] {
    let mut message = Vec::with_capacity(
        ROOT_ATTESTATION_DOMAIN.len() + application_id.as_bytes().len() + 33,
    );
    message.extend_from_slice(ROOT_ATTESTATION_DOMAIN);
    message.extend_from_slice(application_id.as_bytes());
    message.extend_from_slice(app_public_key.as_bytes());
    keccak256(&message)
}

/// `keccak256(purpose || ":" || lowercase_hex(derived_public_key))`.
///
/// The application key signs this digest directly, without the EIP-191
/// envelope.
pub fn app_attestation_digest(purpose: &str, derived_public_key: &CompressedPublicKey) -> [u8; 32] {
    let message =
        format!("{purpose}{PURPOSE_SEPARATOR}{}", hex::encode(derived_public_key.as_bytes()));
    keccak256(message.as_bytes())
}

/// Issued by the key-management root when it hands a key to an application.
pub fn issue_root_signature<S: Signer>(
    root: &S,
    application_id: &ApplicationId,
    app_public_key: &CompressedPublicKey,
) -> Result<RecoverableSignature, CryptoError> {
    root.sign_prehash(&root_attestation_digest(application_id, app_public_key))
}

/// Issued by the application key when it derives a purpose-scoped key.
pub fn issue_app_signature<S: Signer>(
    app: &S,
    purpose: &str,
    derived_public_key: &CompressedPublicKey,
) -> Result<RecoverableSignature, CryptoError> {
    app.sign_prehash(&app_attestation_digest(purpose, derived_public_key))
}

/// Signs an application message hash with the derived key, `personal_sign`
/// style.
pub fn sign_message<S: Signer>(
    derived: &S,
    message_hash: &[u8; 32],
) -> Result<RecoverableSignature, CryptoError> {
    derived.sign_prehash(&eip191_hash(message_hash))
}
