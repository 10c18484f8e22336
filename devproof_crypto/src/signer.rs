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

use k256::ecdsa::SigningKey;

use crate::{
    address::Address,
    hashing::keccak256,
    public_key::{CompressedPublicKey, UncompressedPublicKey},
    signature::RecoverableSignature,
    CryptoError,
};

/// Produces recoverable signatures. Implemented by whatever holds a key: the
/// key-management root, an application key or a derived key.
pub trait Signer {
    fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature, CryptoError>;

    fn public_key(&self) -> UncompressedPublicKey;

    fn compressed_public_key(&self) -> CompressedPublicKey {
        self.public_key().compress()
    }

    fn address(&self) -> Address {
        self.public_key().address()
    }
}

impl Signer for SigningKey {
    /// Signs with RFC 6979 nonces; the result is low-`s` with `v` in `27/28`.
    fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (signature, recovery_id) =
            self.sign_prehash_recoverable(prehash).map_err(|_| CryptoError::SigningFailed)?;
        Ok(RecoverableSignature::from_parts(&signature.to_bytes(), recovery_id.to_byte()))
    }

    fn public_key(&self) -> UncompressedPublicKey {
        UncompressedPublicKey::from_affine(self.verifying_key().as_affine())
            .expect("a signing key never maps to the identity point")
    }
}

/// Derives a signing key from `keccak256(seed)`. Meant for tests and demos
/// where reproducible keys matter more than secrecy.
pub fn signing_key_from_seed(seed: &[u8]) -> Result<SigningKey, CryptoError> {
    SigningKey::from_slice(&keccak256(seed)).map_err(|_| CryptoError::SigningFailed)
}
