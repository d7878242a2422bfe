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

//! Key pair lifecycle across runs.

use crate::fixtures::TestInstall;
use attestor::crypto::{compute_key_fingerprint, Algorithm};
use attestor::security::{FileKeyManager, KeyManager};
use attestor::TrustError;
use std::os::unix::fs::PermissionsExt;

fn mode(path: &std::path::Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[test]
fn test_repeated_runs_reuse_the_same_key() {
    let install = TestInstall::new();
    let private_path = install.config.private_key_path(Algorithm::Ed25519);

    let first = install.keypair(Algorithm::Ed25519);
    let content = std::fs::read(&private_path).unwrap();
    let modified = std::fs::metadata(&private_path).unwrap().modified().unwrap();

    for _ in 0..3 {
        let again = FileKeyManager::from_config(&install.config)
            .ensure_keypair(Algorithm::Ed25519)
            .unwrap();
        assert_eq!(again.fingerprint(), first.fingerprint());
    }

    assert_eq!(std::fs::read(&private_path).unwrap(), content);
    assert_eq!(
        std::fs::metadata(&private_path).unwrap().modified().unwrap(),
        modified
    );
}

#[test]
fn test_key_file_modes() {
    let install = TestInstall::new();
    let keypair = install.keypair(Algorithm::Ed25519);

    assert_eq!(mode(keypair.private_key_path()), 0o600);
    assert_eq!(mode(keypair.public_key_path()), 0o644);
}

#[test]
fn test_fingerprint_is_sha256_of_raw_public_key() {
    let install = TestInstall::new();
    let keypair = install.keypair(Algorithm::Ed25519);

    let raw = keypair.public_key().raw_bytes().unwrap();
    assert_eq!(raw.len(), 32);
    assert_eq!(keypair.fingerprint(), compute_key_fingerprint(&raw));
}

#[test]
fn test_algorithms_have_independent_keys() {
    let install = TestInstall::new();
    let ed25519 = install.keypair(Algorithm::Ed25519);
    let rsa = install.keypair(Algorithm::RsaPssSha256);

    assert_ne!(ed25519.private_key_path(), rsa.private_key_path());
    assert_ne!(ed25519.fingerprint(), rsa.fingerprint());
}

#[test]
fn test_corrupt_private_key_is_not_replaced() {
    let install = TestInstall::new();
    let private_path = install.config.private_key_path(Algorithm::Ed25519);
    std::fs::write(&private_path, "garbage").unwrap();

    let result = FileKeyManager::from_config(&install.config).ensure_keypair(Algorithm::Ed25519);
    assert!(matches!(result, Err(TrustError::InvalidKey { .. })));
    assert_eq!(std::fs::read(&private_path).unwrap(), b"garbage");
}
