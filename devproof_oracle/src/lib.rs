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

//! Price oracle escrow, the relying party of the signature chain.
//!
//! Requesters lock a reward; anyone holding a price report signed by the
//! oracle application's derived key can claim it. The only thing checked
//! about the fulfiller is the signature chain of the report they submit.

pub mod report;
pub mod requests;

use devproof_signature_chain::{ChainFailure, MalformedInput};

pub use report::{price_message_hash, PriceReport};
pub use requests::{OracleEvent, Payout, PriceRequest, RequestBook, RequestId};

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum OracleError {
    #[error("a request needs a non-zero reward")]
    ZeroReward,
    #[error("no request with id {0}")]
    UnknownRequest(RequestId),
    #[error("request {0} was already fulfilled")]
    AlreadyFulfilled(RequestId),
    #[error(
        "report signs message 0x{} but price and timestamp hash to 0x{}",
        hex::encode(signed),
        hex::encode(expected)
    )]
    MessageHashMismatch { signed: [u8; 32], expected: [u8; 32] },
    #[error("malformed proof: {0}")]
    Malformed(#[from] MalformedInput),
    #[error("proof rejected: {0}")]
    ProofRejected(ChainFailure),
}
