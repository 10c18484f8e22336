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

use devproof_crypto::keccak256;
use devproof_signature_chain::SignatureChain;
use serde::{Deserialize, Serialize};

/// Hash the oracle signs for a price observation: the Solidity
/// `keccak256(abi.encode(uint256 price, uint256 timestamp))`.
pub fn price_message_hash(price: u128, timestamp: u64) -> [u8; 32] {
    let mut encoded = [0u8; 64];
    encoded[16..32].copy_from_slice(&price.to_be_bytes());
    encoded[56..64].copy_from_slice(&timestamp.to_be_bytes());
    keccak256(&encoded)
}

/// A signed price observation. `price` is in cents.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceReport {
    pub price: u128,
    pub timestamp: u64,
    #[serde(rename = "proof")]
    pub chain: SignatureChain,
}

impl PriceReport {
    /// Whether the chain signs this report's price and timestamp rather than
    /// some other message.
    pub fn signs_own_price(&self) -> bool {
        self.chain.message_hash == self.expected_message_hash()
    }

    pub fn expected_message_hash(&self) -> [u8; 32] {
        price_message_hash(self.price, self.timestamp)
    }
}
