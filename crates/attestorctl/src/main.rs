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

//! attestorctl - sign and verify installation artifacts.
//!
//! Exit codes: 0 on success, 1 when signing or verification fails, 2 when
//! the environment is not usable (configuration, missing keys, I/O).

use anyhow::{Context, Result};
use attestor::config::ConfigLoader;
use attestor::crypto::Algorithm;
use attestor::security::ArtifactClass;
use attestor::TrustError;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

/// Attestor - chain of trust for installation artifacts
#[derive(Parser, Debug)]
#[command(name = "attestorctl")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args([
            "generate_keys",
            "sign",
            "verify",
            "fingerprint",
            "capture_units",
            "recheck_units",
            "finalize",
            "check_state",
        ])
        .multiple(false)
))]
struct Cli {
    /// Generate the key pair for --algorithm if it does not exist yet
    #[arg(long)]
    generate_keys: bool,

    /// Sign an artifact (defaults to the configured path for --class)
    #[arg(long, value_name = "ARTIFACT", num_args = 0..=1)]
    sign: Option<Option<PathBuf>>,

    /// Verify an artifact (defaults to the configured path for --class)
    #[arg(long, value_name = "ARTIFACT", num_args = 0..=1)]
    verify: Option<Option<PathBuf>>,

    /// Print the fingerprint of the public key for --algorithm
    #[arg(long)]
    fingerprint: bool,

    /// Record unit hashes in the install manifest and re-sign it
    #[arg(long)]
    capture_units: bool,

    /// Recheck unit hashes against the signed install manifest
    #[arg(long)]
    recheck_units: bool,

    /// Produce the signed, immutable install state
    #[arg(long)]
    finalize: bool,

    /// Verify the install state against the manifest and deployed units
    #[arg(long)]
    check_state: bool,

    /// Artifact class: manifest, state, schema or model-manifest
    #[arg(long, default_value = "manifest")]
    class: ArtifactClass,

    /// Key algorithm (defaults to the algorithm of --class)
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Signature file (defaults to the configured path for --class)
    #[arg(long, value_name = "PATH")]
    signature: Option<PathBuf>,

    /// Public key file (defaults to the key directory)
    #[arg(long, value_name = "PATH")]
    public_key: Option<PathBuf>,

    /// Configuration file (can also be set via ATTESTOR_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Trust failures exit with 1; everything else is environmental.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TrustError>() {
        Some(trust) if !trust.is_environmental() => 1,
        _ => 2,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::new()
        .load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    tracing::debug!(key_dir = %config.key_dir.display(), "Configuration loaded");
    let algorithm = cli.algorithm.unwrap_or_else(|| cli.class.algorithm());

    if cli.generate_keys {
        return commands::keys::generate(&config, algorithm);
    }
    if cli.fingerprint {
        return commands::keys::fingerprint(&config, algorithm, cli.public_key.as_deref());
    }
    if let Some(artifact) = cli.sign {
        return commands::sign::run(&config, cli.class, artifact, cli.signature);
    }
    if let Some(artifact) = cli.verify {
        return commands::verify::run(
            &config,
            cli.class,
            artifact,
            cli.signature,
            cli.public_key,
        );
    }
    if cli.capture_units {
        return commands::units::capture(&config);
    }
    if cli.recheck_units {
        return commands::units::recheck(&config);
    }
    if cli.finalize {
        return commands::finalize::finalize(&config);
    }
    if cli.check_state {
        return commands::finalize::check(&config);
    }

    // No action: make sure the signing key exists and sign the manifest
    commands::keys::generate(&config, Algorithm::Ed25519)?;
    commands::sign::run(&config, ArtifactClass::InstallManifest, None, None)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
