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

//! Timelocked whitelist of code identities and devices.
//!
//! [`AppAuth`] answers whether a booting application may receive its keys and
//! governs how the set of permitted code identities changes: the owner can
//! only *propose* a new identity, which becomes usable once a fixed notice
//! period has passed and someone (anyone) activates it. Users watching the
//! emitted events therefore always get the notice period to exit before new
//! code can touch their data.

pub mod boot;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod identity;
pub mod shared;
pub mod store;

pub use boot::{AdmissionDecision, BootDescriptor};
pub use config::AppAuthConfig;
pub use engine::{AppAuth, HashState};
pub use error::AppAuthError;
pub use event::AppAuthEvent;
pub use identity::{DeviceId, IdentityHash};
pub use shared::{SharedAppAuth, TransitionError};
pub use store::{AppAuthState, FileStore, MemoryStore, StateLock, StateStore, StoreError};
