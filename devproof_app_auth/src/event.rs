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
use serde::{Deserialize, Serialize};

use crate::identity::{DeviceId, IdentityHash};

/// Record of one applied transition, for anyone indexing the whitelist.
///
/// `ComposeHashProposed` is the one users care about: it starts the window in
/// which they can leave before the new code is admitted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "eventType")]
pub enum AppAuthEvent {
    #[serde(rename_all = "camelCase")]
    ComposeHashProposed { hash: IdentityHash, proposed_at: Instant, activates_at: Instant },
    #[serde(rename_all = "camelCase")]
    ComposeHashActivated { hash: IdentityHash, activated_by: Address, at: Instant },
    #[serde(rename_all = "camelCase")]
    ComposeHashCancelled { hash: IdentityHash, at: Instant },
    #[serde(rename_all = "camelCase")]
    ComposeHashRemoved { hash: IdentityHash, at: Instant },
    #[serde(rename_all = "camelCase")]
    DeviceAdded { device: DeviceId, at: Instant },
    #[serde(rename_all = "camelCase")]
    DeviceRemoved { device: DeviceId, at: Instant },
}

impl AppAuthEvent {
    /// When the transition was applied.
    pub fn at(&self) -> Instant {
        match self {
            AppAuthEvent::ComposeHashProposed { proposed_at, .. } => *proposed_at,
            AppAuthEvent::ComposeHashActivated { at, .. }
            | AppAuthEvent::ComposeHashCancelled { at, .. }
            | AppAuthEvent::ComposeHashRemoved { at, .. }
            | AppAuthEvent::DeviceAdded { at, .. }
            | AppAuthEvent::DeviceRemoved { at, .. } => *at,
        }
    }
}
