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

//! End-to-end finalize runs.

use crate::fixtures::{TestInstall, UNIT_NAME};
use attestor::crypto::{compute_content_hash, Algorithm};
use attestor::install_state::{DbMode, InstallState, InstallStateFinalizer, Stage};
use attestor::manifest::InstallManifest;
use attestor::security::{
    ArtifactClass, ArtifactVerifier, ContentIntegrityIndex, FileArtifactVerifier,
};
use attestor::TrustError;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn mode(path: &Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

/// Every file under the install root with its content and mode.
fn snapshot(root: &Path) -> Vec<(std::path::PathBuf, Vec<u8>, u32)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push((path.clone(), std::fs::read(&path).unwrap(), mode(&path)));
            }
        }
    }
    files.sort();
    files
}

#[test]
fn test_deploy_finalize_and_detect_drift() {
    let install = TestInstall::new();
    let outcome = install.finalizer().finalize().unwrap();

    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(mode(&outcome.state_path), 0o444);
    assert_eq!(mode(&outcome.signature_path), 0o444);
    assert_eq!(mode(&install.config.manifest_signature_path), 0o644);

    // The state on disk is exactly what the run reported
    let trusted = FileArtifactVerifier::new()
        .verify_document::<InstallState>(
            &install.artifact(ArtifactClass::InstallState),
            &outcome.signature_path,
            &install.public_key_path(ArtifactClass::InstallState),
        )
        .unwrap();
    assert_eq!(trusted.content(), &outcome.state);
    assert_eq!(outcome.state.db.mode, DbMode::Ha);
    assert_eq!(outcome.state.db.host, "db.internal");

    // The signed manifest records the hash of "X"
    let manifest = FileArtifactVerifier::new()
        .verify_document::<InstallManifest>(
            &install.artifact(ArtifactClass::InstallManifest),
            install.signature_path(ArtifactClass::InstallManifest),
            &install.public_key_path(ArtifactClass::InstallManifest),
        )
        .unwrap();
    let unit = manifest.content().unit(UNIT_NAME).unwrap();
    assert_eq!(unit.sha256_hash, Some(compute_content_hash(b"X")));
    assert_eq!(outcome.state.manifest_hash, manifest.content_hash());

    // Post-install modification of the unit
    std::fs::write(&install.unit_path, "Y").unwrap();
    let violations = ContentIntegrityIndex::new().recheck(&manifest.content().systemd_units);
    assert_eq!(violations.len(), 1);
    match violations[0].clone().into_error() {
        TrustError::HashMismatch {
            name,
            expected,
            actual,
        } => {
            assert_eq!(name, UNIT_NAME);
            assert_eq!(expected, compute_content_hash(b"X"));
            assert_eq!(actual, compute_content_hash(b"Y"));
        }
        other => panic!("Expected HashMismatch, got {:?}", other),
    }

    // A second finalize is refused and touches nothing
    let before = snapshot(&install.root);
    let err = install.finalizer().finalize().unwrap_err();
    assert!(matches!(err, TrustError::AlreadyFinalized { .. }));
    assert_eq!(snapshot(&install.root), before);
}

#[test]
fn test_signer_fingerprint_recorded() {
    let install = TestInstall::new();
    let outcome = install.finalizer().finalize().unwrap();

    assert_eq!(
        outcome.state.signer_fingerprint,
        install.keypair(Algorithm::Ed25519).fingerprint()
    );
}

#[test]
fn test_stepwise_run_follows_stage_order() {
    let install = TestInstall::new();
    let mut finalizer = install.finalizer();

    finalizer.ensure_keys().unwrap();
    finalizer.sign_manifest().unwrap();
    assert!(matches!(
        finalizer.verify_prerequisites(),
        Err(TrustError::OrderViolation {
            current: Stage::ManifestSigned,
            attempted: Stage::PrereqsVerified,
        })
    ));

    finalizer.hash_units().unwrap();
    finalizer.verify_prerequisites().unwrap();
    finalizer.draft_state().unwrap();
    assert!(matches!(
        finalizer.freeze(),
        Err(TrustError::OrderViolation { .. })
    ));
    finalizer.sign_state().unwrap();
    finalizer.freeze().unwrap();
    assert_eq!(finalizer.stage(), Stage::Immutable);
    assert!(matches!(
        finalizer.freeze(),
        Err(TrustError::OrderViolation { .. })
    ));
}

#[test]
fn test_unsigned_schema_blocks_finalize() {
    let install = TestInstall::new();
    std::fs::remove_file(install.signature_path(ArtifactClass::DatabaseSchema)).unwrap();

    let err = install.finalizer().finalize().unwrap_err();
    assert!(matches!(err, TrustError::MissingSignature { .. }));
    assert!(!install.config.state_path.exists());
}

#[test]
fn test_tampered_schema_blocks_finalize() {
    let install = TestInstall::new();
    std::fs::write(&install.config.schema_path, "DROP TABLE readings;\n").unwrap();

    let err = install.finalizer().finalize().unwrap_err();
    assert!(matches!(err, TrustError::SignatureInvalid { .. }));
    assert!(!install.config.state_path.exists());
}

#[test]
fn test_db_env_file_probe() {
    let install = TestInstall::new();
    let env_path = &install.config.db_env_path;
    std::fs::write(
        env_path,
        "DB_HOST=10.0.0.5\nDB_PORT=6432\nDB_NAME=telemetry\n\
         DB_USER=svc\nDB_PASS='p=w'\nDB_MODE=standalone\n",
    )
    .unwrap();
    std::fs::set_permissions(env_path, std::fs::Permissions::from_mode(0o600)).unwrap();

    let outcome = InstallStateFinalizer::new(install.config.clone())
        .with_installer_identity(crate::fixtures::FixedIdentity)
        .finalize()
        .unwrap();
    assert_eq!(outcome.state.db.host, "10.0.0.5");
    assert_eq!(outcome.state.db.port, 6432);
    assert_eq!(outcome.state.db.mode, DbMode::Standalone);
}

#[test]
fn test_partial_db_env_blocks_finalize() {
    let install = TestInstall::new();
    std::fs::write(&install.config.db_env_path, "DB_HOST=10.0.0.5\nDB_PORT=6432\n").unwrap();

    let err = InstallStateFinalizer::new(install.config.clone())
        .with_installer_identity(crate::fixtures::FixedIdentity)
        .finalize()
        .unwrap_err();
    assert!(matches!(err, TrustError::PrerequisiteFailed { .. }));
    assert!(err.is_environmental());
    assert!(!install.config.state_path.exists());
}
