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

use std::sync::{Arc, Mutex};

use devproof_crypto::Address;
use devproof_time::Instant;
use log::info;

use crate::{
    boot::{AdmissionDecision, BootDescriptor},
    config::AppAuthConfig,
    engine::AppAuth,
    error::AppAuthError,
    event::AppAuthEvent,
    identity::{DeviceId, IdentityHash},
    store::{StateStore, StoreError},
};

#[derive(thiserror::Error, Debug)]
pub enum TransitionError {
    #[error(transparent)]
    Rejected(#[from] AppAuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("whitelist lock is poisoned")]
    Poisoned,
}

/// Thread-safe handle to an [`AppAuth`], optionally backed by a
/// [`StateStore`].
///
/// Transitions are serialized by a single lock. With a store attached, a
/// transition is applied to a copy, saved, and only then made visible, so a
/// failed save leaves both the store and the in-memory state unchanged.
#[derive(Clone)]
pub struct SharedAppAuth {
    inner: Arc<Mutex<AppAuth>>,
    store: Option<Arc<dyn StateStore>>,
}

impl SharedAppAuth {
    pub fn new(app_auth: AppAuth) -> Self {
        SharedAppAuth { inner: Arc::new(Mutex::new(app_auth)), store: None }
    }

    /// Resumes from the state in `store`, or starts from `config` and saves
    /// the initial state if the store is empty.
    pub fn open(
        store: Arc<dyn StateStore>,
        config: &AppAuthConfig,
    ) -> Result<Self, TransitionError> {
        let app_auth = match store.load()? {
            Some(state) => {
                info!("resuming whitelist owned by {}", state.owner);
                AppAuth::from_state(state)
            }
            None => {
                let app_auth = AppAuth::new(config);
                store.save(&app_auth.state())?;
                info!("initialized whitelist owned by {}", config.owner);
                app_auth
            }
        };
        Ok(SharedAppAuth { inner: Arc::new(Mutex::new(app_auth)), store: Some(store) })
    }

    /// Runs `read` against the current state.
    pub fn read<T>(&self, read: impl FnOnce(&AppAuth) -> T) -> Result<T, TransitionError> {
        let guard = self.inner.lock().map_err(|_| TransitionError::Poisoned)?;
        Ok(read(&*guard))
    }

    pub fn is_app_allowed(
        &self,
        boot: &BootDescriptor,
    ) -> Result<AdmissionDecision, TransitionError> {
        self.read(|app_auth| app_auth.is_app_allowed(boot))
    }

    pub fn propose(
        &self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<AppAuthEvent, TransitionError> {
        self.transition(|app_auth| app_auth.propose(caller, hash, now))
    }

    pub fn activate(
        &self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<Option<AppAuthEvent>, TransitionError> {
        self.transition(|app_auth| app_auth.activate(caller, hash, now))
    }

    pub fn cancel(
        &self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<AppAuthEvent, TransitionError> {
        self.transition(|app_auth| app_auth.cancel(caller, hash, now))
    }

    pub fn remove(
        &self,
        caller: Address,
        hash: IdentityHash,
        now: Instant,
    ) -> Result<AppAuthEvent, TransitionError> {
        self.transition(|app_auth| app_auth.remove(caller, hash, now))
    }

    pub fn add_device(
        &self,
        caller: Address,
        device: DeviceId,
        now: Instant,
    ) -> Result<AppAuthEvent, TransitionError> {
        self.transition(|app_auth| app_auth.add_device(caller, device, now))
    }

    pub fn remove_device(
        &self,
        caller: Address,
        device: DeviceId,
        now: Instant,
    ) -> Result<AppAuthEvent, TransitionError> {
        self.transition(|app_auth| app_auth.remove_device(caller, device, now))
    }

    fn transition<T>(
        &self,
        apply: impl FnOnce(&mut AppAuth) -> Result<T, AppAuthError>,
    ) -> Result<T, TransitionError> {
        let mut guard = self.inner.lock().map_err(|_| TransitionError::Poisoned)?;
        let Some(store) = &self.store else {
            return Ok(apply(&mut *guard)?);
        };
        let mut next = guard.clone();
        let outcome = apply(&mut next)?;
        store.save(&next.state())?;
        *guard = next;
        Ok(outcome)
    }
}
