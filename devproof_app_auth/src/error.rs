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

use devproof_crypto::Address;
use devproof_time::Instant;

use crate::identity::{DeviceId, IdentityHash};

/// Reasons a whitelist transition is refused. A refused transition leaves the
/// state untouched.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum AppAuthError {
    #[error("{caller} is not the owner")]
    NotOwner { caller: Address },
    #[error("{hash} was already proposed at {proposed_at}")]
    AlreadyProposed { hash: IdentityHash, proposed_at: Instant },
    #[error("{hash} is already allowed")]
    AlreadyActive { hash: IdentityHash },
    #[error("{hash} has no pending proposal")]
    NotProposed { hash: IdentityHash },
    #[error("notice period for {hash} runs until {activates_at}, now is {now}")]
    NoticePeriodNotElapsed { hash: IdentityHash, activates_at: Instant, now: Instant },
    #[error("{hash} is not allowed")]
    NotAllowed { hash: IdentityHash },
    #[error("device {device} is already allowed")]
    DeviceAlreadyAllowed { device: DeviceId },
    #[error("device {device} is not allowed")]
    DeviceNotAllowed { device: DeviceId },
    #[error("activation time of a proposal made at {proposed_at} overflows")]
    TimestampOverflow { proposed_at: Instant },
}
