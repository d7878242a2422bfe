/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! `--finalize` and `--check-state`.

use anyhow::{Context, Result};
use attestor::config::TrustConfig;
use attestor::install_state::{InstallStateChecker, InstallStateFinalizer};
use attestor::Severity;

pub fn finalize(config: &TrustConfig) -> Result<()> {
    let outcome = InstallStateFinalizer::new(config.clone()).finalize()?;

    for warning in &outcome.warnings {
        eprintln!("WARNING: {}", warning);
    }
    println!("Install state finalized: {}", outcome.state_path.display());
    println!("  Signature:     {}", outcome.signature_path.display());
    println!("  Manifest hash: {}", outcome.state.manifest_hash);
    println!("  Signer:        {}", outcome.state.signer_fingerprint);
    Ok(())
}

pub fn check(config: &TrustConfig) -> Result<()> {
    let report = InstallStateChecker::new(config.clone()).check();

    for finding in &report.findings {
        eprintln!("{}: {}", finding.severity(), finding);
    }
    if report.passed() {
        println!("Install state OK ({} warnings)", report.warnings().count());
        return Ok(());
    }

    let critical = report.critical().count();
    let first = report
        .findings
        .into_iter()
        .find(|finding| finding.severity() == Severity::Critical)
        .context("install state check failed")?;
    Err(first).context(format!(
        "install state check failed with {} critical findings",
        critical
    ))
}
