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

//! The `whitelist` command. Every invocation locks the state file, loads it,
//! applies at most one transition and writes it back before unlocking.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Args, Subcommand};
use devproof_app_auth::{
    AdmissionDecision, AppAuth, AppAuthConfig, AppAuthEvent, BootDescriptor, DeviceId, FileStore,
    IdentityHash, StateStore,
};
use devproof_crypto::Address;
use devproof_time::Instant;
use serde::Serialize;

// Example:
//   devproof whitelist --state=whitelist.json --caller=0x… propose 0x…
#[derive(Args)]
pub(crate) struct WhitelistArgs {
    #[arg(long, help = "Path to the whitelist state file.")]
    state: PathBuf,

    #[arg(long, help = "Address the call is made from. Required for owner-only commands.")]
    caller: Option<Address>,

    #[command(subcommand)]
    command: WhitelistCommands,
}

#[derive(Subcommand)]
pub(crate) enum WhitelistCommands {
    #[command(about = "Create the state file from a config.")]
    Init {
        #[arg(long, help = "Path to the whitelist config JSON.")]
        config: PathBuf,
    },
    #[command(about = "Propose a code identity hash, starting its notice period.")]
    Propose { hash: IdentityHash },
    #[command(about = "Activate a proposal whose notice period has elapsed.")]
    Activate { hash: IdentityHash },
    #[command(about = "Cancel a pending proposal.")]
    Cancel { hash: IdentityHash },
    #[command(about = "Revoke an allowed code identity hash.")]
    Remove { hash: IdentityHash },
    #[command(about = "Allow a device.")]
    AddDevice { device: DeviceId },
    #[command(about = "Disallow a device.")]
    RemoveDevice { device: DeviceId },
    #[command(about = "Check whether an application may boot.")]
    Check {
        #[arg(long)]
        code: IdentityHash,
        #[arg(long)]
        device: DeviceId,
    },
    #[command(about = "Print the whitelist.")]
    Status,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    owner: Address,
    notice_period: u64,
    allow_any_device: bool,
    allowed: Vec<IdentityHash>,
    pending: Vec<PendingProposal>,
    devices: Vec<DeviceId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingProposal {
    hash: IdentityHash,
    proposed_at: Instant,
    activates_at: Option<Instant>,
}

pub(crate) fn run(now: Instant, args: WhitelistArgs) -> anyhow::Result<ExitCode> {
    let store = FileStore::new(&args.state);
    let _lock = store.lock().context("couldn't lock the state file")?;

    if let WhitelistCommands::Init { config } = &args.command {
        anyhow::ensure!(
            store.load()?.is_none(),
            "{} already holds a whitelist",
            args.state.display()
        );
        let config = AppAuthConfig::load(config)?;
        store.save(&AppAuth::new(&config).state()).context("couldn't write the state file")?;
        log::info!("created whitelist {} owned by {}", args.state.display(), config.owner);
        return Ok(ExitCode::SUCCESS);
    }

    let state = store
        .load()
        .context("couldn't read the state file")?
        .with_context(|| format!("{} does not exist, run `init` first", args.state.display()))?;
    let mut app_auth = AppAuth::from_state(state);

    match apply(&mut app_auth, args.caller, now, args.command)? {
        Outcome::Transition(event) => {
            store.save(&app_auth.state()).context("couldn't write the state file")?;
            println!("{}", serde_json::to_string(&event)?);
        }
        Outcome::Unchanged => log::info!("nothing to do"),
        Outcome::Decision(decision) => {
            println!("{}", serde_json::to_string(&decision)?);
            if !decision.allowed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Outcome::Status(status) => println!("{}", serde_json::to_string_pretty(&status)?),
    }
    Ok(ExitCode::SUCCESS)
}

enum Outcome {
    Transition(AppAuthEvent),
    Unchanged,
    Decision(AdmissionDecision),
    Status(Status),
}

fn apply(
    app_auth: &mut AppAuth,
    caller: Option<Address>,
    now: Instant,
    command: WhitelistCommands,
) -> anyhow::Result<Outcome> {
    let owner_call = || caller.context("--caller is required for this command");
    let event = match command {
        WhitelistCommands::Init { .. } => anyhow::bail!("whitelist is already initialized"),
        WhitelistCommands::Propose { hash } => app_auth.propose(owner_call()?, hash, now)?,
        WhitelistCommands::Activate { hash } => {
            // Activation is permissionless; the caller is only recorded.
            match app_auth.activate(caller.unwrap_or(Address::ZERO), hash, now)? {
                Some(event) => event,
                None => return Ok(Outcome::Unchanged),
            }
        }
        WhitelistCommands::Cancel { hash } => app_auth.cancel(owner_call()?, hash, now)?,
        WhitelistCommands::Remove { hash } => app_auth.remove(owner_call()?, hash, now)?,
        WhitelistCommands::AddDevice { device } => {
            app_auth.add_device(owner_call()?, device, now)?
        }
        WhitelistCommands::RemoveDevice { device } => {
            app_auth.remove_device(owner_call()?, device, now)?
        }
        WhitelistCommands::Check { code, device } => {
            return Ok(Outcome::Decision(
                app_auth.is_app_allowed(&BootDescriptor::new(code, device)),
            ));
        }
        WhitelistCommands::Status => return Ok(Outcome::Status(status(app_auth))),
    };
    Ok(Outcome::Transition(event))
}

fn status(app_auth: &AppAuth) -> Status {
    Status {
        owner: app_auth.owner(),
        notice_period: app_auth.notice_period().as_secs(),
        allow_any_device: app_auth.allow_any_device(),
        allowed: app_auth.allowed_hashes().copied().collect(),
        pending: app_auth
            .pending_proposals()
            .map(|(hash, proposed_at)| PendingProposal {
                hash: *hash,
                proposed_at,
                activates_at: app_auth.activates_at(hash).ok(),
            })
            .collect(),
        devices: app_auth.devices().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use devproof_app_auth::{AppAuthError, HashState};
    use googletest::prelude::*;

    use super::*;

    fn owner() -> Address {
        "0x8f2cF602C9695b23130367ed78d8F557554de7C5".parse().unwrap()
    }

    fn hash() -> IdentityHash {
        IdentityHash::new([0x11; 32])
    }

    fn app_auth() -> AppAuth {
        AppAuth::new(&AppAuthConfig {
            owner: owner(),
            notice_period: 120,
            allow_any_device: true,
            initial_code_hash: None,
            initial_devices: Vec::new(),
        })
    }

    #[googletest::test]
    fn governance_commands_need_a_caller() {
        let mut app_auth = app_auth();

        let result = apply(
            &mut app_auth,
            None,
            Instant::from_unix_seconds(0),
            WhitelistCommands::Propose { hash: hash() },
        );

        assert_that!(result.map(|_| ()), err(displays_as(contains_substring("--caller"))));
        assert_that!(app_auth.state_of(&hash()), eq(HashState::Unknown));
    }

    #[googletest::test]
    fn engine_errors_are_surfaced() {
        let mut app_auth = app_auth();

        let result = apply(
            &mut app_auth,
            Some(owner()),
            Instant::from_unix_seconds(0),
            WhitelistCommands::Cancel { hash: hash() },
        );

        let error = result.err().and_then(|err| err.downcast::<AppAuthError>().ok());
        assert_that!(error, some(eq(&AppAuthError::NotProposed { hash: hash() })));
    }

    #[googletest::test]
    fn activation_without_caller_is_allowed() {
        let mut app_auth = app_auth();
        app_auth.propose(owner(), hash(), Instant::from_unix_seconds(0)).unwrap();

        let outcome = apply(
            &mut app_auth,
            None,
            Instant::from_unix_seconds(120),
            WhitelistCommands::Activate { hash: hash() },
        )
        .unwrap();

        assert_that!(
            matches!(outcome, Outcome::Transition(AppAuthEvent::ComposeHashActivated { .. })),
            eq(true)
        );
        assert_that!(app_auth.state_of(&hash()), eq(HashState::Allowed));
    }

    #[googletest::test]
    fn concurrent_invocations_keep_every_transition() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("whitelist.json");
        FileStore::new(&state).save(&app_auth().state()).unwrap();

        let handles: Vec<_> = (1..=8u8)
            .map(|byte| {
                let args = WhitelistArgs {
                    state: state.clone(),
                    caller: Some(owner()),
                    command: WhitelistCommands::AddDevice { device: DeviceId::new([byte; 32]) },
                };
                std::thread::spawn(move || run(Instant::from_unix_seconds(10), args).map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let saved = AppAuth::from_state(FileStore::new(&state).load().unwrap().unwrap());
        assert_that!(saved.devices().count(), eq(8));
    }

    #[googletest::test]
    fn state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("whitelist.json");
        let config = dir.path().join("config.json");
        std::fs::write(
            &config,
            r#"{
                "owner": "0x8f2cF602C9695b23130367ed78d8F557554de7C5",
                "noticePeriod": 120,
                "allowAnyDevice": true
            }"#,
        )
        .unwrap();
        let args = |command| WhitelistArgs { state: state.clone(), caller: Some(owner()), command };

        let at = Instant::from_unix_seconds;

        run(at(0), args(WhitelistCommands::Init { config: config.clone() })).unwrap();
        run(at(1000), args(WhitelistCommands::Propose { hash: hash() })).unwrap();
        assert_that!(
            run(at(1119), args(WhitelistCommands::Activate { hash: hash() })),
            err(anything())
        );
        run(at(1120), args(WhitelistCommands::Activate { hash: hash() })).unwrap();

        let saved = AppAuth::from_state(FileStore::new(&state).load().unwrap().unwrap());
        assert_that!(saved.state_of(&hash()), eq(HashState::Allowed));
        assert_that!(
            run(at(0), args(WhitelistCommands::Init { config })),
            err(anything())
        );
    }
}
