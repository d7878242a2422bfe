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

//! `--sign`.

use anyhow::Result;
use attestor::config::TrustConfig;
use attestor::security::{
    Artifact, ArtifactClass, ArtifactSigner, FileArtifactSigner, FileKeyManager, KeyManager,
};
use std::path::PathBuf;

/// Signs with the class's key pair, generating it on first use.
pub fn run(
    config: &TrustConfig,
    class: ArtifactClass,
    artifact_path: Option<PathBuf>,
    signature_path: Option<PathBuf>,
) -> Result<()> {
    let artifact_path = artifact_path.unwrap_or_else(|| config.artifact_path(class).to_path_buf());
    let signature_path =
        signature_path.unwrap_or_else(|| config.signature_path(class).to_path_buf());

    let keypair = FileKeyManager::from_config(config).ensure_keypair(class.algorithm())?;
    for warning in keypair.warnings() {
        eprintln!("WARNING: {}", warning);
    }
    let signature = FileArtifactSigner::new().sign(
        &Artifact::new(class, artifact_path.clone()),
        &keypair,
        &signature_path,
    )?;

    println!("Signed {} ({})", artifact_path.display(), class);
    println!("  Signature:    {}", signature.path.display());
    println!("  Content hash: {}", signature.content_hash);
    println!("  Signer:       {}", signature.signer_fingerprint);
    Ok(())
}
