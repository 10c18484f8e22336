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

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use devproof_crypto::Address;
use devproof_time::Instant;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    boot::{AdmissionDecision, BootDescriptor, CODE_NOT_ALLOWED, DEVICE_NOT_ALLOWED},
    config::AppAuthConfig,
    error::AppAuthError,
    event::AppAuthEvent,
    identity::{DeviceId, IdentityHash},
    store::AppAuthState,
};

/// Lifecycle of a code identity hash.
///
/// ```text
/// Unknown --propose--> Proposed --activate (after notice)--> Allowed
///    ^                     |                                   |
///    +------- cancel ------+                                   |
///    +------------------------------ remove -------------------+
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum HashState {
    Unknown,
    #[serde(rename_all = "camelCase")]
    Proposed { proposed_at: Instant },
    Allowed,
}

/// Whitelist of code identities and devices for one application.
///
/// All operations take the current time explicitly. Owner-only operations
/// check the caller before anything else; a failed operation never changes
/// state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppAuth {
    owner: Address,
    notice_period: Duration,
    allow_any_device: bool,
    // Absent hashes are `Unknown`. Keeping proposals and allowed hashes in one
    // map means a hash is never both.
    hashes: BTreeMap<IdentityHash, HashState>,
    devices: BTreeSet<DeviceId>,
}

impl AppAuth {
    pub fn new(config: &AppAuthConfig) -> Self {
        let hashes = config
            .initial_code_hash
            .iter()
            .map(|hash| (*hash, HashState::Allowed))
            .collect();
        AppAuth {
            owner: config.owner,
            notice_period: config.notice_period(),
            allow_any_device: config.allow_any_device,
            hashes,
            devices: config.initial_devices.iter().copied().collect(),
        }
    }

    /// Restores an instance from a snapshot taken with [`AppAuth::state`].
    pub fn from_state(state: AppAuthState) -> Self {
        let hashes = state
            .hashes
            .into_iter()
            .filter(|(_, hash_state)| *hash_state != HashState::Unknown)
            .collect();
        AppAuth {
            owner: state.owner,
            notice_period: Duration::from_secs(state.notice_period),
            allow_any_device: state.allow_any_device,
            hashes,
            devices: state.devices,
        }
    }

    pub fn state(&self) -> AppAuthState {
        AppAuthState {
            owner: self.owner,
            notice_period: self.notice_period.as_secs(),
            allow_any_device: self.allow_any_device,
            hashes: self.hashes.clone(),
            devices: self.devices.clone(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn notice_period(&self) -> Duration {
        self.notice_period
    }

    pub fn allow_any_device(&self) -> bool {
        self.allow_any_device
    }

    pub fn state_of(&self, hash: &IdentityHash) -> HashState {
        self.hashes.get(hash).copied().unwrap_or(HashState::Unknown)
    }

    /// When `hash` was proposed, if it has a pending proposal.
    pub fn proposed_at(&self, hash: &IdentityHash) -> Option<Instant> {
        match self.state_of(hash) {
            HashState::Proposed { proposed_at } => Some(proposed_at),
            HashState::Unknown | HashState::Allowed => None,
        }
    }

    /// Earliest time at which the pending proposal for `hash` can be
    /// activated.
    pub fn activates_at(&self, hash: &IdentityHash) -> Result<Instant, AppAuthError> {
        let proposed_at =
            self.proposed_at(hash).ok_or(AppAuthError::NotProposed { hash: *hash })?;
        self.activation_time(proposed_at)
    }

    pub fn is_code_allowed(&self, hash: &IdentityHash) -> bool {
        self.state_of(hash) == HashState::Allowed
    }

    pub fn is_device_allowed(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }

    pub fn allowed_hashes(&self) -> impl Iterator<Item = &IdentityHash> {
        self.hashes.iter().filter(|(_, state)| **state == HashState::Allowed).map(|(hash, _)| hash)
    }

    pub fn pending_proposals(&self) -> impl Iterator<Item = (&IdentityHash, Instant)> {
        self.hashes.iter().filter_map(|(hash, state)| match state {
            HashState::Proposed { proposed_at } => Some((hash, *proposed_at)),
            HashState::Unknown | HashState::Allowed => None,
        })
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.iter()
    }

    /// Starts the notice period for `hash`.
    pub fn propose(
        &mut self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<AppAuthEvent, AppAuthError> {
        self.check_owner(caller)?;
        match self.state_of(&hash) {
            HashState::Allowed => return Err(AppAuthError::AlreadyActive { hash }),
            HashState::Proposed { proposed_at } => {
                return Err(AppAuthError::AlreadyProposed { hash, proposed_at })
            }
            HashState::Unknown => {}
        }
        let activates_at = self.activation_time(now)?;
        self.hashes.insert(hash, HashState::Proposed { proposed_at: now });
        info!("proposed {hash} at {now}, activatable from {activates_at}");
        Ok(AppAuthEvent::ComposeHashProposed { hash, proposed_at: now, activates_at })
    }

    /// Promotes a proposal whose notice period has elapsed. Anyone may call
    /// this. Activating an already allowed hash is a no-op and returns
    /// `Ok(None)`.
    pub fn activate(
        &mut self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<Option<AppAuthEvent>, AppAuthError> {
        let proposed_at = match self.state_of(&hash) {
            HashState::Allowed => {
                debug!("{hash} is already allowed, nothing to activate");
                return Ok(None);
            }
            HashState::Unknown => return Err(AppAuthError::NotProposed { hash }),
            HashState::Proposed { proposed_at } => proposed_at,
        };
        let activates_at = self.activation_time(proposed_at)?;
        if now < activates_at {
            debug!("refusing to activate {hash} at {now}, notice period runs until {activates_at}");
            return Err(AppAuthError::NoticePeriodNotElapsed { hash, activates_at, now });
        }
        self.hashes.insert(hash, HashState::Allowed);
        info!("activated {hash} at {now} by {caller}");
        Ok(Some(AppAuthEvent::ComposeHashActivated { hash, activated_by: caller, at: now }))
    }

    /// Withdraws a pending proposal.
    pub fn cancel(
        &mut self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<AppAuthEvent, AppAuthError> {
        self.check_owner(caller)?;
        if self.proposed_at(&hash).is_none() {
            return Err(AppAuthError::NotProposed { hash });
        }
        self.hashes.remove(&hash);
        info!("cancelled proposal for {hash} at {now}");
        Ok(AppAuthEvent::ComposeHashCancelled { hash, at: now })
    }

    /// Revokes an allowed hash immediately. Revocation only ever shrinks the
    /// set of admitted code, so it is not timelocked.
    pub fn remove(
        &mut self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<AppAuthEvent, AppAuthError> {
        self.check_owner(caller)?;
        if !self.is_code_allowed(&hash) {
            return Err(AppAuthError::NotAllowed { hash });
        }
        self.hashes.remove(&hash);
        info!("removed {hash} at {now}");
        Ok(AppAuthEvent::ComposeHashRemoved { hash, at: now })
    }

    pub fn add_device(
        &mut self,
        caller: Address,
        device: DeviceId,
        now: Instant,
    ) -> Result<AppAuthEvent, AppAuthError> {
        self.check_owner(caller)?;
        if !self.devices.insert(device) {
            return Err(AppAuthError::DeviceAlreadyAllowed { device });
        }
        info!("added device {device} at {now}");
        Ok(AppAuthEvent::DeviceAdded { device, at: now })
    }

    pub fn remove_device(
        &mut self,
        caller: Address,
        device: DeviceId,
        now: Instant,
    ) -> Result<AppAuthEvent, AppAuthError> {
        self.check_owner(caller)?;
        if !self.devices.remove(&device) {
            return Err(AppAuthError::DeviceNotAllowed { device });
        }
        info!("removed device {device} at {now}");
        Ok(AppAuthEvent::DeviceRemoved { device, at: now })
    }

    /// Decides whether a booting application may receive its keys. The code
    /// identity is checked before the device, so an application failing both
    /// is reported as a code failure.
    pub fn is_app_allowed(&self, boot: &BootDescriptor) -> AdmissionDecision {
        if !self.is_code_allowed(&boot.code_identity_hash) {
            debug!("denied boot of {}: {CODE_NOT_ALLOWED}", boot.code_identity_hash);
            return AdmissionDecision::deny(CODE_NOT_ALLOWED);
        }
        if !self.allow_any_device && !self.is_device_allowed(&boot.device_id) {
            debug!("denied boot on {}: {DEVICE_NOT_ALLOWED}", boot.device_id);
            return AdmissionDecision::deny(DEVICE_NOT_ALLOWED);
        }
        AdmissionDecision::allow()
    }

    fn check_owner(&self, caller: Address) -> Result<(), AppAuthError> {
        if caller != self.owner {
            debug!("{caller} is not the owner {}", self.owner);
            return Err(AppAuthError::NotOwner { caller });
        }
        Ok(())
    }

    fn activation_time(&self, proposed_at: Instant) -> Result<Instant, AppAuthError> {
        proposed_at
            .checked_add(self.notice_period)
            .ok_or(AppAuthError::TimestampOverflow { proposed_at })
    }
}
