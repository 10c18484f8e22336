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

//! Time primitives for the authorization core.
//!
//! Nothing in the core reads a wall clock on its own: every time-gated
//! operation takes an [`Instant`] from its caller. The [`Clock`] trait is the
//! seam through which callers obtain one.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod instant;

pub use clock::{Clock, FixedClock, ManualClock};
#[cfg(feature = "std")]
pub use clock::SystemClock;
pub use instant::{Instant, UNIX_EPOCH};
