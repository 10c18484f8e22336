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

//! The `verify-chain` command. Accepts either a bare signature chain or a
//! price report wrapping one; for a price report the signed message must also
//! match the reported price and timestamp.

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Args;
use devproof_crypto::Address;
use devproof_oracle::PriceReport;
use devproof_signature_chain::{ApplicationId, SignatureChain, SignatureChainVerifier};
use devproof_time::Instant;
use serde::Deserialize;

// Example:
//   devproof verify-chain --report=price.json \
//     --root=0x8f2cF602C9695b23130367ed78d8F557554de7C5 --app-id=0x…
#[derive(Args)]
pub(crate) struct VerifyChainArgs {
    #[arg(long, help = "Path to a JSON signature chain or price report.")]
    report: PathBuf,

    #[arg(long, help = "Address of the trusted key-management root.")]
    root: Address,

    #[arg(long, help = "Hex application id the chain must be scoped to.")]
    app_id: ApplicationId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportFile {
    Price(PriceReport),
    Chain(SignatureChain),
}

pub(crate) fn verify_chain(now: Instant, args: VerifyChainArgs) -> anyhow::Result<ExitCode> {
    let json = fs::read_to_string(&args.report)
        .with_context(|| format!("couldn't read {}", args.report.display()))?;
    let report: ReportFile = serde_json::from_str(&json)
        .context("report is neither a signature chain nor a price report")?;

    let chain = match &report {
        ReportFile::Price(price_report) => {
            if !price_report.signs_own_price() {
                println!("rejected: signed message does not match price and timestamp");
                return Ok(ExitCode::FAILURE);
            }
            &price_report.chain
        }
        ReportFile::Chain(chain) => chain,
    };

    let verifier = SignatureChainVerifier::new(args.root);
    let (verification, event) = verifier
        .verify_and_record(chain, &args.app_id, now)
        .context("signature chain is malformed")?;
    match (verification.failure(), event) {
        (None, Some(event)) => {
            println!("verified");
            log::debug!("{}", serde_json::to_string(&event)?);
            Ok(ExitCode::SUCCESS)
        }
        (Some(failure), _) => {
            println!("rejected: {failure}");
            Ok(ExitCode::FAILURE)
        }
        (None, None) => anyhow::bail!("verified chain produced no event"),
    }
}
