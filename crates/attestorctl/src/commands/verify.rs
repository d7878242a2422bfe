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

//! `--verify`.

use anyhow::Result;
use attestor::config::TrustConfig;
use attestor::security::{Artifact, ArtifactClass, ArtifactVerifier, FileArtifactVerifier};
use std::path::PathBuf;

pub fn run(
    config: &TrustConfig,
    class: ArtifactClass,
    artifact_path: Option<PathBuf>,
    signature_path: Option<PathBuf>,
    public_key_path: Option<PathBuf>,
) -> Result<()> {
    let artifact_path = artifact_path.unwrap_or_else(|| config.artifact_path(class).to_path_buf());
    let signature_path =
        signature_path.unwrap_or_else(|| config.signature_path(class).to_path_buf());
    let public_key_path =
        public_key_path.unwrap_or_else(|| config.public_key_path(class.algorithm()));

    let trusted = FileArtifactVerifier::new().verify(
        &Artifact::new(class, artifact_path),
        &signature_path,
        &public_key_path,
    )?;

    for warning in trusted.warnings() {
        eprintln!("WARNING: {}", warning);
    }
    println!("Verified {} ({})", trusted.artifact_path().display(), class);
    println!("  Content hash: {}", trusted.content_hash());
    println!("  Signer:       {}", trusted.signer_fingerprint());
    Ok(())
}
