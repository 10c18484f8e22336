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

use std::{sync::Arc, thread, time::Duration};

use devproof_app_auth::{
    AppAuth, AppAuthConfig, AppAuthError, AppAuthEvent, AppAuthState, BootDescriptor, DeviceId,
    FileStore, HashState, IdentityHash, MemoryStore, SharedAppAuth, StateStore, StoreError,
    TransitionError,
};
use devproof_crypto::Address;
use devproof_time::{Clock, Instant, ManualClock};
use googletest::prelude::*;
use mockall::mock;

const CODE_NOT_ALLOWED: &str = "code identity not allowed";
const DEVICE_NOT_ALLOWED: &str = "device not allowed";

fn owner() -> Address {
    "0x8f2cF602C9695b23130367ed78d8F557554de7C5".parse().unwrap()
}

fn stranger() -> Address {
    "0x000000000000000000000000000000000000dead".parse().unwrap()
}

fn hash(byte: u8) -> IdentityHash {
    IdentityHash::new([byte; 32])
}

fn device(byte: u8) -> DeviceId {
    DeviceId::new([byte; 32])
}

fn at(seconds: i64) -> Instant {
    Instant::from_unix_seconds(seconds)
}

fn config(notice_period: u64, allow_any_device: bool) -> AppAuthConfig {
    AppAuthConfig {
        owner: owner(),
        notice_period,
        allow_any_device,
        initial_code_hash: None,
        initial_devices: Vec::new(),
    }
}

fn boot(code: IdentityHash, device: DeviceId) -> BootDescriptor {
    BootDescriptor::new(code, device)
}

fn rejection<T: std::fmt::Debug>(result: Result<T, TransitionError>) -> AppAuthError {
    match result {
        Err(TransitionError::Rejected(error)) => error,
        other => panic!("expected a rejected transition, got {other:?}"),
    }
}

#[googletest::test]
fn two_minute_notice_period_walkthrough() {
    let mut app_auth = AppAuth::new(&config(120, true));
    let h = hash(0xaa);

    let proposed = app_auth.propose(owner(), h, at(1000));
    assert_that!(
        proposed,
        ok(eq(&AppAuthEvent::ComposeHashProposed {
            hash: h,
            proposed_at: at(1000),
            activates_at: at(1120),
        }))
    );
    assert_that!(app_auth.activates_at(&h), ok(eq(&at(1120))));

    assert_that!(
        app_auth.activate(stranger(), h, at(1119)),
        err(eq(&AppAuthError::NoticePeriodNotElapsed {
            hash: h,
            activates_at: at(1120),
            now: at(1119),
        }))
    );
    assert_that!(
        app_auth.activate(stranger(), h, at(1120)),
        ok(some(eq(&AppAuthEvent::ComposeHashActivated {
            hash: h,
            activated_by: stranger(),
            at: at(1120),
        })))
    );

    let decision = app_auth.is_app_allowed(&boot(h, device(0x42)));
    assert_that!(decision.allowed, eq(true));
    assert_that!(decision.reason, eq(""));
    assert_that!(app_auth.state_of(&h), eq(HashState::Allowed));
    assert_that!(app_auth.proposed_at(&h), none());
}

#[googletest::test]
fn activation_opens_exactly_at_the_boundary() {
    for notice_period in [1u64, 60, 120, 86_400] {
        for proposed_at in [0i64, 1000, 1_700_000_000] {
            let mut app_auth = AppAuth::new(&config(notice_period, true));
            let h = hash(1);
            app_auth.propose(owner(), h, at(proposed_at)).unwrap();
            let boundary = proposed_at + notice_period as i64;

            expect_that!(
                app_auth.activate(stranger(), h, at(boundary - 1)),
                err(anything()),
                "one second early, notice period {}",
                notice_period
            );
            expect_that!(
                app_auth.state_of(&h),
                eq(HashState::Proposed { proposed_at: at(proposed_at) })
            );
            expect_that!(
                app_auth.activate(stranger(), h, at(boundary)),
                ok(some(anything())),
                "at the boundary, notice period {}",
                notice_period
            );
        }
    }
}

#[googletest::test]
fn late_activation_succeeds() {
    let mut app_auth = AppAuth::new(&config(120, true));
    app_auth.propose(owner(), hash(1), at(1000)).unwrap();

    assert_that!(app_auth.activate(owner(), hash(1), at(1_000_000)), ok(some(anything())));
}

#[googletest::test]
fn proposal_does_not_admit_before_activation() {
    let clock = ManualClock::at_instant(at(1000));
    let mut app_auth = AppAuth::new(&config(120, true));
    app_auth.propose(owner(), hash(1), clock.get_time()).unwrap();

    let decision = app_auth.is_app_allowed(&boot(hash(1), device(1)));
    assert_that!(decision.allowed, eq(false));
    assert_that!(decision.reason, eq(CODE_NOT_ALLOWED));

    // Elapsed time alone changes nothing: the hash stays proposed and denied
    // until someone activates it.
    clock.advance(Duration::from_secs(600));
    assert_that!(app_auth.activates_at(&hash(1)), ok(eq(&at(1120))));
    assert_that!(clock.get_time(), gt(at(1120)));
    assert_that!(app_auth.state_of(&hash(1)), eq(HashState::Proposed { proposed_at: at(1000) }));
    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(1))).allowed, eq(false));

    app_auth.activate(stranger(), hash(1), clock.get_time()).unwrap();
    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(1))).allowed, eq(true));
}

#[googletest::test]
fn zero_notice_period_still_needs_activation() {
    let mut app_auth = AppAuth::new(&config(0, true));
    app_auth.propose(owner(), hash(1), at(1000)).unwrap();

    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(1))).allowed, eq(false));
    assert_that!(app_auth.activate(stranger(), hash(1), at(1000)), ok(some(anything())));
    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(1))).allowed, eq(true));
}

#[googletest::test]
fn code_rejection_takes_precedence_over_device_rejection() {
    let app_auth = AppAuth::new(&config(120, false));

    let decision = app_auth.is_app_allowed(&boot(hash(9), device(9)));

    assert_that!(decision.allowed, eq(false));
    assert_that!(decision.reason, eq(CODE_NOT_ALLOWED));
}

#[googletest::test]
fn device_gate_applies_once_code_is_allowed() {
    let mut config = config(120, false);
    config.initial_code_hash = Some(hash(1));
    let mut app_auth = AppAuth::new(&config);

    let decision = app_auth.is_app_allowed(&boot(hash(1), device(7)));
    assert_that!(decision.allowed, eq(false));
    assert_that!(decision.reason, eq(DEVICE_NOT_ALLOWED));

    assert_that!(
        app_auth.add_device(owner(), device(7), at(5)),
        ok(eq(&AppAuthEvent::DeviceAdded { device: device(7), at: at(5) }))
    );
    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(7))).allowed, eq(true));

    assert_that!(
        app_auth.remove_device(owner(), device(7), at(6)),
        ok(eq(&AppAuthEvent::DeviceRemoved { device: device(7), at: at(6) }))
    );
    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(7))).allowed, eq(false));
}

#[googletest::test]
fn device_preconditions_are_enforced() {
    let mut config = config(120, false);
    config.initial_devices = vec![device(1)];
    let mut app_auth = AppAuth::new(&config);

    assert_that!(app_auth.is_device_allowed(&device(1)), eq(true));
    assert_that!(
        app_auth.add_device(owner(), device(1), at(0)),
        err(eq(&AppAuthError::DeviceAlreadyAllowed { device: device(1) }))
    );
    assert_that!(
        app_auth.remove_device(owner(), device(2), at(0)),
        err(eq(&AppAuthError::DeviceNotAllowed { device: device(2) }))
    );
    assert_that!(
        app_auth.add_device(stranger(), device(3), at(0)),
        err(eq(&AppAuthError::NotOwner { caller: stranger() }))
    );
}

#[googletest::test]
fn cancelled_proposal_can_never_be_activated() {
    let mut app_auth = AppAuth::new(&config(120, true));
    app_auth.propose(owner(), hash(1), at(1000)).unwrap();

    assert_that!(
        app_auth.cancel(owner(), hash(1), at(1010)),
        ok(eq(&AppAuthEvent::ComposeHashCancelled { hash: hash(1), at: at(1010) }))
    );
    assert_that!(app_auth.state_of(&hash(1)), eq(HashState::Unknown));
    for later in [1120, 1_000_000] {
        assert_that!(
            app_auth.activate(stranger(), hash(1), at(later)),
            err(eq(&AppAuthError::NotProposed { hash: hash(1) }))
        );
    }
    assert_that!(
        app_auth.cancel(owner(), hash(1), at(1011)),
        err(eq(&AppAuthError::NotProposed { hash: hash(1) }))
    );
}

#[googletest::test]
fn reproposal_after_cancel_restarts_the_clock() {
    let mut app_auth = AppAuth::new(&config(120, true));
    app_auth.propose(owner(), hash(1), at(1000)).unwrap();
    app_auth.cancel(owner(), hash(1), at(1100)).unwrap();
    app_auth.propose(owner(), hash(1), at(1110)).unwrap();

    assert_that!(app_auth.activates_at(&hash(1)), ok(eq(&at(1230))));
    assert_that!(app_auth.activate(stranger(), hash(1), at(1120)), err(anything()));
}

#[googletest::test]
fn double_proposal_keeps_original_timestamp() {
    let mut app_auth = AppAuth::new(&config(120, true));
    app_auth.propose(owner(), hash(1), at(1000)).unwrap();

    assert_that!(
        app_auth.propose(owner(), hash(1), at(1050)),
        err(eq(&AppAuthError::AlreadyProposed { hash: hash(1), proposed_at: at(1000) }))
    );
    assert_that!(app_auth.proposed_at(&hash(1)), some(eq(at(1000))));
    assert_that!(app_auth.activates_at(&hash(1)), ok(eq(&at(1120))));
}

#[googletest::test]
fn governance_is_owner_only() {
    let mut config = config(120, true);
    config.initial_code_hash = Some(hash(2));
    let mut app_auth = AppAuth::new(&config);
    app_auth.propose(owner(), hash(1), at(0)).unwrap();
    let before = app_auth.clone();
    let not_owner = AppAuthError::NotOwner { caller: stranger() };

    assert_that!(app_auth.propose(stranger(), hash(3), at(1)), err(eq(&not_owner)));
    assert_that!(app_auth.cancel(stranger(), hash(1), at(1)), err(eq(&not_owner)));
    assert_that!(app_auth.remove(stranger(), hash(2), at(1)), err(eq(&not_owner)));
    assert_that!(app_auth.remove_device(stranger(), device(1), at(1)), err(eq(&not_owner)));
    assert_that!(app_auth, eq(&before));
}

#[googletest::test]
fn owner_check_comes_before_state_checks() {
    let mut app_auth = AppAuth::new(&config(120, true));

    assert_that!(
        app_auth.cancel(stranger(), hash(1), at(0)),
        err(eq(&AppAuthError::NotOwner { caller: stranger() }))
    );
}

#[googletest::test]
fn allowed_hash_transitions() {
    let mut config = config(120, true);
    config.initial_code_hash = Some(hash(1));
    let mut app_auth = AppAuth::new(&config);

    assert_that!(app_auth.state_of(&hash(1)), eq(HashState::Allowed));
    assert_that!(
        app_auth.propose(owner(), hash(1), at(0)),
        err(eq(&AppAuthError::AlreadyActive { hash: hash(1) }))
    );
    assert_that!(app_auth.activate(stranger(), hash(1), at(0)), ok(none()));
    assert_that!(
        app_auth.activates_at(&hash(1)),
        err(eq(&AppAuthError::NotProposed { hash: hash(1) }))
    );

    assert_that!(
        app_auth.remove(owner(), hash(1), at(10)),
        ok(eq(&AppAuthEvent::ComposeHashRemoved { hash: hash(1), at: at(10) }))
    );
    assert_that!(app_auth.is_app_allowed(&boot(hash(1), device(0))).reason, eq(CODE_NOT_ALLOWED));
    assert_that!(
        app_auth.remove(owner(), hash(1), at(11)),
        err(eq(&AppAuthError::NotAllowed { hash: hash(1) }))
    );
}

#[googletest::test]
fn removed_hash_goes_through_the_full_timelock_again() {
    let mut config = config(120, true);
    config.initial_code_hash = Some(hash(1));
    let mut app_auth = AppAuth::new(&config);
    app_auth.remove(owner(), hash(1), at(100)).unwrap();

    app_auth.propose(owner(), hash(1), at(100)).unwrap();

    assert_that!(app_auth.activate(stranger(), hash(1), at(219)), err(anything()));
    assert_that!(app_auth.activate(stranger(), hash(1), at(220)), ok(some(anything())));
}

#[googletest::test]
fn remove_does_not_touch_pending_proposals() {
    let mut app_auth = AppAuth::new(&config(120, true));
    app_auth.propose(owner(), hash(1), at(0)).unwrap();

    assert_that!(
        app_auth.remove(owner(), hash(1), at(1)),
        err(eq(&AppAuthError::NotAllowed { hash: hash(1) }))
    );
    assert_that!(app_auth.proposed_at(&hash(1)), some(eq(at(0))));
}

#[googletest::test]
fn overflowing_activation_time_is_refused() {
    let mut app_auth = AppAuth::new(&config(u64::MAX, true));

    assert_that!(
        app_auth.propose(owner(), hash(1), at(0)),
        err(eq(&AppAuthError::TimestampOverflow { proposed_at: at(0) }))
    );
    assert_that!(app_auth.state_of(&hash(1)), eq(HashState::Unknown));
}

#[googletest::test]
fn listing_reflects_state() {
    let mut config = config(120, true);
    config.initial_code_hash = Some(hash(1));
    let mut app_auth = AppAuth::new(&config);
    app_auth.propose(owner(), hash(2), at(7)).unwrap();

    assert_that!(
        app_auth.allowed_hashes().copied().collect::<Vec<_>>(),
        elements_are![eq(&hash(1))]
    );
    assert_that!(
        app_auth.pending_proposals().map(|(pending, since)| (*pending, since)).collect::<Vec<_>>(),
        elements_are![eq(&(hash(2), at(7)))]
    );
}

#[googletest::test]
fn state_snapshot_restores_identical_engine() {
    let mut config = config(120, false);
    config.initial_code_hash = Some(hash(1));
    config.initial_devices = vec![device(1)];
    let mut app_auth = AppAuth::new(&config);
    app_auth.propose(owner(), hash(2), at(50)).unwrap();

    let json = serde_json::to_string(&app_auth.state()).unwrap();
    let restored = AppAuth::from_state(serde_json::from_str::<AppAuthState>(&json).unwrap());

    assert_that!(restored, eq(&app_auth));
    assert_that!(restored.activates_at(&hash(2)), ok(eq(&at(170))));
}

#[googletest::test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("whitelist.json");
    let config = config(120, true);

    {
        let store: Arc<dyn StateStore> = Arc::new(FileStore::new(&path));
        let shared = SharedAppAuth::open(store, &config).unwrap();
        shared.propose(owner(), hash(1), at(1000)).unwrap();
    }

    let store: Arc<dyn StateStore> = Arc::new(FileStore::new(&path));
    let shared = SharedAppAuth::open(store, &config).unwrap();
    assert_that!(
        shared.read(|app_auth| app_auth.activates_at(&hash(1))).unwrap(),
        ok(eq(&at(1120)))
    );
    assert_that!(shared.activate(stranger(), hash(1), at(1120)).unwrap(), some(anything()));

    let reloaded = FileStore::new(&path).load().unwrap().unwrap();
    assert_that!(reloaded.hashes.get(&hash(1)), some(eq(&HashState::Allowed)));
    // Only the state file is left behind; no temporary files.
    assert_that!(std::fs::read_dir(dir.path()).unwrap().count(), eq(1));
}

#[googletest::test]
fn locked_file_store_updates_do_not_lose_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("whitelist.json");
    FileStore::new(&path).save(&AppAuth::new(&config(120, false)).state()).unwrap();

    let handles: Vec<_> = (1..=8u8)
        .map(|byte| {
            let store = FileStore::new(&path);
            thread::spawn(move || {
                let _lock = store.lock().unwrap();
                let mut app_auth = AppAuth::from_state(store.load().unwrap().unwrap());
                app_auth.add_device(owner(), device(byte), at(i64::from(byte))).unwrap();
                store.save(&app_auth.state()).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let saved = AppAuth::from_state(FileStore::new(&path).load().unwrap().unwrap());
    assert_that!(saved.devices().count(), eq(8));
}

#[googletest::test]
fn file_store_is_empty_before_first_save() {
    let dir = tempfile::tempdir().unwrap();

    assert_that!(FileStore::new(dir.path().join("absent.json")).load().unwrap(), none());
}

#[googletest::test]
fn corrupt_state_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("whitelist.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_that!(FileStore::new(&path).load(), err(anything()));
}

#[googletest::test]
fn shared_handle_reports_rejections() {
    let shared = SharedAppAuth::new(AppAuth::new(&config(120, true)));

    assert_that!(
        rejection(shared.propose(stranger(), hash(1), at(0))),
        eq(&AppAuthError::NotOwner { caller: stranger() })
    );
    assert_that!(shared.is_app_allowed(&boot(hash(1), device(1))).unwrap().allowed, eq(false));
}

#[googletest::test]
fn racing_activations_emit_exactly_one_event() {
    let store = Arc::new(MemoryStore::new());
    let shared = SharedAppAuth::open(store.clone(), &config(120, true)).unwrap();
    shared.propose(owner(), hash(1), at(1000)).unwrap();

    let handles: Vec<_> = (0..8u8)
        .map(|index| {
            let shared = shared.clone();
            let caller = Address::new([index; 20]);
            thread::spawn(move || shared.activate(caller, hash(1), at(1120)).unwrap())
        })
        .collect();
    let events: Vec<_> = handles.into_iter().filter_map(|handle| handle.join().unwrap()).collect();

    assert_that!(events.len(), eq(1));
    assert_that!(
        store.load().unwrap().unwrap().hashes.get(&hash(1)),
        some(eq(&HashState::Allowed))
    );
}

mock! {
    Store {}

    impl StateStore for Store {
        fn load(&self) -> Result<Option<AppAuthState>, StoreError>;
        fn save(&self, state: &AppAuthState) -> Result<(), StoreError>;
    }
}

#[googletest::test]
fn failed_save_leaves_state_unchanged() {
    let mut store = MockStore::new();
    let initial = AppAuth::new(&config(120, true)).state();
    store.expect_load().times(1).returning(move || Ok(Some(initial.clone())));
    store.expect_save().times(1).returning(|_| {
        Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
    });
    let shared = SharedAppAuth::open(Arc::new(store), &config(120, true)).unwrap();

    let result = shared.propose(owner(), hash(1), at(0));

    assert_that!(matches!(result, Err(TransitionError::Store(_))), eq(true));
    assert_that!(
        shared.read(|app_auth| app_auth.state_of(&hash(1))).unwrap(),
        eq(HashState::Unknown)
    );
}

#[googletest::test]
fn rejected_transition_is_not_saved() {
    let mut store = MockStore::new();
    store.expect_load().times(1).returning(|| Ok(None));
    // Only the initial state is saved.
    store.expect_save().times(1).returning(|_| Ok(()));
    let shared = SharedAppAuth::open(Arc::new(store), &config(120, true)).unwrap();

    assert_that!(
        rejection(shared.cancel(owner(), hash(1), at(0))),
        eq(&AppAuthError::NotProposed { hash: hash(1) })
    );
    assert_that!(
        shared.read(|app_auth| app_auth.notice_period()).unwrap(),
        eq(Duration::from_secs(120))
    );
}
