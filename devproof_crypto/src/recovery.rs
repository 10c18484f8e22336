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

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::{
    address::Address,
    public_key::{CompressedPublicKey, UncompressedPublicKey},
    signature::RecoverableSignature,
    CryptoError,
};

/// The two curve operations the signature chain verifier needs. Kept behind a
/// trait so that chain verification logic can be exercised without real curve
/// arithmetic.
pub trait KeyRecovery: Send + Sync {
    /// Recovers the address that produced `signature` over `prehash`.
    fn recover_signer(
        &self,
        prehash: &[u8; 32],
        signature: &RecoverableSignature,
    ) -> Result<Address, CryptoError>;

    /// Derives the address of a compressed public key.
    fn address_of(&self, public_key: &CompressedPublicKey) -> Result<Address, CryptoError>;
}

/// [`KeyRecovery`] over secp256k1, backed by the `k256` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1;

impl KeyRecovery for Secp256k1 {
    fn recover_signer(
        &self,
        prehash: &[u8; 32],
        signature: &RecoverableSignature,
    ) -> Result<Address, CryptoError> {
        recover_signer(prehash, signature)
    }

    fn address_of(&self, public_key: &CompressedPublicKey) -> Result<Address, CryptoError> {
        public_key.address()
    }
}

/// Recovers the signer of a 32-byte prehash, as `ecrecover` does.
///
/// High-`s` signatures are rejected (`k256` only accepts normalized
/// signatures), which rules out the classic ECDSA malleability.
pub fn recover_signer(
    prehash: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    let recovery_id = signature
        .recovery_id()
        .and_then(RecoveryId::from_byte)
        .ok_or(CryptoError::RecoveryFailed)?;
    let parsed = Signature::from_slice(&signature.as_bytes()[..64])
        .map_err(|_| CryptoError::RecoveryFailed)?;
    let verifying_key = VerifyingKey::recover_from_prehash(prehash, &parsed, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    let address = UncompressedPublicKey::from_affine(verifying_key.as_affine())?.address();
    if address.is_zero() {
        return Err(CryptoError::ZeroAddress);
    }
    Ok(address)
}
