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

use devproof_crypto::{
    eip191_hash, Address, CompressedPublicKey, CryptoError, KeyRecovery, RecoverableSignature,
    Secp256k1,
};
use devproof_time::Instant;
use log::{debug, info};
use serde::Serialize;

use crate::{
    chain::{ApplicationId, SignatureChain},
    issuer::{app_attestation_digest, root_attestation_digest},
};

/// Structurally invalid input. Reported as an error rather than a rejection
/// because it points at a broken caller, not at a forged chain.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum MalformedInput {
    #[error("malformed signature in `{field}`: {source}")]
    MalformedSignature { field: &'static str, source: CryptoError },
    #[error("malformed public key in `{field}`: {source}")]
    MalformedPublicKey { field: &'static str, source: CryptoError },
}

/// Which hop of the chain failed to check out.
#[derive(thiserror::Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainFailure {
    #[error("root signature does not recover to the trusted root")]
    RootSignatureInvalid,
    #[error("message signature does not recover to the derived key")]
    MessageSignatureInvalid,
    #[error("app signature does not recover to the app key")]
    AppSignatureInvalid,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainVerification {
    Verified,
    Rejected(ChainFailure),
}

impl ChainVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainVerification::Verified)
    }

    pub fn failure(&self) -> Option<ChainFailure> {
        match self {
            ChainVerification::Verified => None,
            ChainVerification::Rejected(failure) => Some(*failure),
        }
    }
}

/// Audit record for a successfully verified message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "eventType")]
pub enum ChainEvent {
    #[serde(rename_all = "camelCase")]
    ChainVerified {
        #[serde(with = "crate::chain::hex_array")]
        message_hash: [u8; 32],
        application_id: ApplicationId,
        at: Instant,
    },
}

/// The chain record after structural validation.
struct ParsedChain {
    message_signature: RecoverableSignature,
    app_signature: RecoverableSignature,
    root_signature: RecoverableSignature,
    derived_public_key: CompressedPublicKey,
    app_public_key: CompressedPublicKey,
}

impl ParsedChain {
    fn parse(chain: &SignatureChain) -> Result<Self, MalformedInput> {
        let signature = |field: &'static str, bytes: &[u8]| {
            RecoverableSignature::from_bytes(bytes)
                .map_err(|source| MalformedInput::MalformedSignature { field, source })
        };
        let public_key = |field: &'static str, bytes: &[u8]| {
            CompressedPublicKey::from_bytes(bytes)
                .map_err(|source| MalformedInput::MalformedPublicKey { field, source })
        };
        Ok(ParsedChain {
            message_signature: signature("message_signature", &chain.message_signature)?,
            app_signature: signature("app_signature", &chain.app_signature)?,
            root_signature: signature("root_signature", &chain.root_signature)?,
            derived_public_key: public_key("derived_public_key", &chain.derived_public_key)?,
            app_public_key: public_key("app_public_key", &chain.app_public_key)?,
        })
    }
}

/// Checks signature chains against a single trusted root.
///
/// The root address is fixed for the lifetime of the verifier; there is
/// deliberately no way to change it.
pub struct SignatureChainVerifier<R: KeyRecovery = Secp256k1> {
    root: Address,
    recovery: R,
}

impl SignatureChainVerifier<Secp256k1> {
    pub fn new(root: Address) -> Self {
        Self::with_recovery(root, Secp256k1)
    }
}

impl<R: KeyRecovery> SignatureChainVerifier<R> {
    pub fn with_recovery(root: Address, recovery: R) -> Self {
        Self { root, recovery }
    }

    pub fn root(&self) -> Address {
        self.root
    }

    /// Verifies every hop of `chain` for `application_id`.
    ///
    /// Hops are evaluated in a fixed order and the first failing one is
    /// reported: the root attestation, then the message signature, then the
    /// cross-check between the app signature and the claimed app key. Curve
    /// failures inside a hop (a point off the curve, an unrecoverable
    /// signature) count as that hop failing.
    pub fn verify(
        &self,
        chain: &SignatureChain,
        application_id: &ApplicationId,
    ) -> Result<ChainVerification, MalformedInput> {
        let parsed = ParsedChain::parse(chain)?;

        let app_digest = app_attestation_digest(&chain.purpose, &parsed.derived_public_key);
        let recovered_app_signer =
            self.recovery.recover_signer(&app_digest, &parsed.app_signature).ok();

        let root_digest = root_attestation_digest(application_id, &parsed.app_public_key);
        match self.recovery.recover_signer(&root_digest, &parsed.root_signature) {
            Ok(signer) if signer == self.root => {}
            _ => return Ok(self.reject(ChainFailure::RootSignatureInvalid)),
        }

        let message_digest = eip191_hash(&chain.message_hash);
        let message_signer =
            self.recovery.recover_signer(&message_digest, &parsed.message_signature).ok();
        let derived_address = self.recovery.address_of(&parsed.derived_public_key).ok();
        if !same_signer(message_signer, derived_address) {
            return Ok(self.reject(ChainFailure::MessageSignatureInvalid));
        }

        let app_address = self.recovery.address_of(&parsed.app_public_key).ok();
        if !same_signer(recovered_app_signer, app_address) {
            return Ok(self.reject(ChainFailure::AppSignatureInvalid));
        }

        Ok(ChainVerification::Verified)
    }

    /// Boolean form of [`SignatureChainVerifier::verify`]; malformed input is
    /// `false`.
    pub fn is_valid(&self, chain: &SignatureChain, application_id: &ApplicationId) -> bool {
        match self.verify(chain, application_id) {
            Ok(verification) => verification.is_valid(),
            Err(err) => {
                debug!("signature chain is malformed: {err}");
                false
            }
        }
    }

    /// Like [`SignatureChainVerifier::verify`], additionally returning an
    /// audit event when the chain verifies.
    pub fn verify_and_record(
        &self,
        chain: &SignatureChain,
        application_id: &ApplicationId,
        now: Instant,
    ) -> Result<(ChainVerification, Option<ChainEvent>), MalformedInput> {
        let verification = self.verify(chain, application_id)?;
        let event = verification.is_valid().then(|| {
            info!(
                "verified message 0x{} from application {application_id} at {now}",
                hex::encode(chain.message_hash)
            );
            ChainEvent::ChainVerified {
                message_hash: chain.message_hash,
                application_id: application_id.clone(),
                at: now,
            }
        });
        Ok((verification, event))
    }

    fn reject(&self, failure: ChainFailure) -> ChainVerification {
        debug!("signature chain rejected: {failure}");
        ChainVerification::Rejected(failure)
    }
}

fn same_signer(recovered: Option<Address>, expected: Option<Address>) -> bool {
    matches!((recovered, expected), (Some(recovered), Some(expected)) if recovered == expected)
}
