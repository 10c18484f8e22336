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

//! `devproof`: checks signature chains and administers a timelocked
//! whitelist stored in a local file.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use devproof_time::{Clock, FixedClock, Instant, SystemClock};

mod compose;
mod verify;
mod whitelist;

#[derive(Parser)]
#[command(name = "devproof", about = "Signature chain and whitelist tooling.")]
struct Params {
    #[arg(
        long,
        global = true,
        help = "Time in seconds since the Unix epoch, or the system time if not set."
    )]
    now: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Verify the signature chain of a report.")]
    VerifyChain(verify::VerifyChainArgs),

    #[command(about = "Compute the code identity hash of an app-compose file.")]
    ComposeHash(compose::ComposeHashArgs),

    #[command(about = "Inspect or change a whitelist state file.")]
    Whitelist(whitelist::WhitelistArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let params = Params::parse();
    let clock: Box<dyn Clock> = match params.now {
        Some(seconds) => Box::new(FixedClock::at_instant(Instant::from_unix_seconds(seconds))),
        None => Box::new(SystemClock),
    };
    let now = clock.get_time();

    match params.command {
        Commands::VerifyChain(args) => verify::verify_chain(now, args),
        Commands::ComposeHash(args) => compose::compose_hash(args),
        Commands::Whitelist(args) => whitelist::run(now, args),
    }
}
