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

use std::{collections::BTreeMap, fmt};

use devproof_crypto::{Address, KeyRecovery, Secp256k1};
use devproof_signature_chain::{ApplicationId, ChainVerification, SignatureChainVerifier};
use devproof_time::Instant;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{report::PriceReport, OracleError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub requester: Address,
    pub reward: u128,
    pub created_at: Instant,
    pub fulfilled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "eventType")]
pub enum OracleEvent {
    #[serde(rename_all = "camelCase")]
    RequestCreated { id: RequestId, requester: Address, reward: u128 },
    #[serde(rename_all = "camelCase")]
    RequestFulfilled { id: RequestId, price: u128, fulfiller: Address },
}

/// Reward owed to the fulfiller of a request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Payout {
    pub request: RequestId,
    pub recipient: Address,
    pub amount: u128,
    pub event: OracleEvent,
}

/// Open and fulfilled price requests for one oracle application.
pub struct RequestBook<R: KeyRecovery = Secp256k1> {
    verifier: SignatureChainVerifier<R>,
    application_id: ApplicationId,
    requests: BTreeMap<RequestId, PriceRequest>,
    next_id: u64,
}

impl RequestBook<Secp256k1> {
    pub fn new(root: Address, application_id: ApplicationId) -> Self {
        Self::with_verifier(SignatureChainVerifier::new(root), application_id)
    }
}

impl<R: KeyRecovery> RequestBook<R> {
    pub fn with_verifier(
        verifier: SignatureChainVerifier<R>,
        application_id: ApplicationId,
    ) -> Self {
        RequestBook { verifier, application_id, requests: BTreeMap::new(), next_id: 0 }
    }

    pub fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    pub fn get(&self, id: RequestId) -> Option<&PriceRequest> {
        self.requests.get(&id)
    }

    /// Opens a request escrowing `reward`.
    pub fn request(
        &mut self,
        requester: Address,
        reward: u128,
        now: Instant,
    ) -> Result<(RequestId, OracleEvent), OracleError> {
        if reward == 0 {
            return Err(OracleError::ZeroReward);
        }
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests
            .insert(id, PriceRequest { requester, reward, created_at: now, fulfilled: false });
        info!("request {id} from {requester} with reward {reward}");
        Ok((id, OracleEvent::RequestCreated { id, requester, reward }))
    }

    /// Settles request `id` with `report` and pays its reward to `fulfiller`.
    pub fn fulfill(
        &mut self,
        id: RequestId,
        report: &PriceReport,
        fulfiller: Address,
    ) -> Result<Payout, OracleError> {
        let request = self.requests.get_mut(&id).ok_or(OracleError::UnknownRequest(id))?;
        if request.fulfilled {
            return Err(OracleError::AlreadyFulfilled(id));
        }
        if !report.signs_own_price() {
            debug!("report for request {id} signs a different message");
            return Err(OracleError::MessageHashMismatch {
                signed: report.chain.message_hash,
                expected: report.expected_message_hash(),
            });
        }
        if let ChainVerification::Rejected(failure) =
            self.verifier.verify(&report.chain, &self.application_id)?
        {
            return Err(OracleError::ProofRejected(failure));
        }

        request.fulfilled = true;
        info!("request {id} fulfilled by {fulfiller} at price {}", report.price);
        Ok(Payout {
            request: id,
            recipient: fulfiller,
            amount: request.reward,
            event: OracleEvent::RequestFulfilled { id, price: report.price, fulfiller },
        })
    }
}
