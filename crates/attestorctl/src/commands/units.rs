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

//! `--capture-units` and `--recheck-units`.

use anyhow::{Context, Result};
use attestor::config::TrustConfig;
use attestor::crypto::Algorithm;
use attestor::manifest::InstallManifest;
use attestor::security::{
    Artifact, ArtifactClass, ArtifactSigner, ArtifactVerifier, ContentIntegrityIndex,
    FileArtifactSigner, FileArtifactVerifier, FileKeyManager, KeyManager, Trusted,
};
use attestor::TrustError;

fn verified_manifest(config: &TrustConfig) -> Result<Trusted<InstallManifest>> {
    let trusted = FileArtifactVerifier::new().verify_document::<InstallManifest>(
        &Artifact::new(ArtifactClass::InstallManifest, config.manifest_path.clone()),
        &config.manifest_signature_path,
        &config.public_key_path(Algorithm::Ed25519),
    )?;
    for warning in trusted.warnings() {
        eprintln!("WARNING: {}", warning);
    }
    Ok(trusted)
}

/// Hashes every unit listed in the signed manifest, rewrites the manifest
/// and signs it again.
pub fn capture(config: &TrustConfig) -> Result<()> {
    let mut manifest = verified_manifest(config)?.into_content();
    if manifest.systemd_units.is_empty() {
        return Err(TrustError::NoUnits).context("nothing to capture");
    }
    let index = ContentIntegrityIndex::new();

    let units: Vec<_> = manifest
        .systemd_units
        .iter()
        .map(|unit| (unit.name.clone(), unit.install_path.clone()))
        .collect();
    for (name, install_path) in &units {
        let hash = index.record(&mut manifest, name, install_path)?;
        println!("{}  {}", hash, name);
    }

    manifest.write(&config.manifest_path)?;
    let keypair = FileKeyManager::from_config(config).load_keypair(Algorithm::Ed25519)?;
    FileArtifactSigner::new().sign(
        &Artifact::new(ArtifactClass::InstallManifest, config.manifest_path.clone()),
        &keypair,
        &config.manifest_signature_path,
    )?;

    println!("Recorded {} unit hashes and re-signed the manifest", units.len());
    Ok(())
}

pub fn recheck(config: &TrustConfig) -> Result<()> {
    let manifest = verified_manifest(config)?;
    let violations = ContentIntegrityIndex::new().recheck(&manifest.content().systemd_units);

    for violation in &violations {
        eprintln!("CRITICAL: {}", violation);
    }
    match violations.into_iter().next() {
        Some(first) => Err(first.into_error()).context("unit integrity recheck failed"),
        None => {
            println!(
                "All {} units match the signed manifest",
                manifest.content().systemd_units.len()
            );
            Ok(())
        }
    }
}
