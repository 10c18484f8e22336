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

//! The `compose-hash` command.

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Args;
use devproof_app_auth::IdentityHash;

// Example:
//   devproof compose-hash --compose=app-compose.json
#[derive(Args)]
pub(crate) struct ComposeHashArgs {
    #[arg(long, help = "Path to the app-compose.json to hash.")]
    compose: PathBuf,
}

pub(crate) fn compose_hash(args: ComposeHashArgs) -> anyhow::Result<ExitCode> {
    let compose = fs::read_to_string(&args.compose)
        .with_context(|| format!("couldn't read {}", args.compose.display()))?;
    let compose: serde_json::Value =
        serde_json::from_str(&compose).context("app-compose is not valid JSON")?;
    println!("{}", IdentityHash::from_app_compose(&compose));
    Ok(ExitCode::SUCCESS)
}
