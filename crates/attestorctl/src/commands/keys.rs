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

//! `--generate-keys` and `--fingerprint`.

use anyhow::Result;
use attestor::config::TrustConfig;
use attestor::crypto::Algorithm;
use attestor::security::{load_public_key, FileKeyManager, KeyManager};
use std::path::Path;

pub fn generate(config: &TrustConfig, algorithm: Algorithm) -> Result<()> {
    let keypair = FileKeyManager::from_config(config).ensure_keypair(algorithm)?;
    for warning in keypair.warnings() {
        eprintln!("WARNING: {}", warning);
    }

    println!("Key pair ({}):", algorithm);
    println!("  Private key: {}", keypair.private_key_path().display());
    println!("  Public key:  {}", keypair.public_key_path().display());
    println!("  Fingerprint: {}", keypair.fingerprint());
    Ok(())
}

pub fn fingerprint(
    config: &TrustConfig,
    algorithm: Algorithm,
    public_key_path: Option<&Path>,
) -> Result<()> {
    let path = public_key_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.public_key_path(algorithm));
    let public_key = load_public_key(algorithm, &path)?;
    let fingerprint = public_key.fingerprint().map_err(|e| {
        attestor::TrustError::InvalidKey {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;

    println!("{}", fingerprint);
    Ok(())
}
