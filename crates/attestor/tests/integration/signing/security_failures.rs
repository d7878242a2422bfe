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

//! Security failure integration tests.
//!
//! Every failure below must be a hard error with no trusted content.

use crate::fixtures::TestInstall;
use attestor::crypto::Algorithm;
use attestor::security::{
    ArtifactClass, ArtifactVerifier, FileArtifactVerifier, FileKeyManager, KeyManager,
};
use attestor::TrustError;
use std::os::unix::fs::PermissionsExt;

fn verify(install: &TestInstall, class: ArtifactClass) -> Result<(), TrustError> {
    FileArtifactVerifier::new()
        .verify(
            &install.artifact(class),
            install.signature_path(class),
            &install.public_key_path(class),
        )
        .map(|_| ())
}

#[test]
fn test_tampered_schema_rejected() {
    let install = TestInstall::new();

    let mut content = std::fs::read(&install.config.schema_path).unwrap();
    content[3] ^= 0x01;
    std::fs::write(&install.config.schema_path, &content).unwrap();

    match verify(&install, ArtifactClass::DatabaseSchema) {
        Err(TrustError::SignatureInvalid { path }) => {
            assert_eq!(path, install.config.schema_path)
        }
        other => panic!("Expected SignatureInvalid, got {:?}", other),
    }
}

#[test]
fn test_semantic_manifest_change_rejected() {
    let install = TestInstall::new();
    install.sign(ArtifactClass::InstallManifest).unwrap();

    let mut manifest = install.manifest();
    manifest.db_initialized = false;
    install.write_manifest(&manifest);

    assert!(matches!(
        verify(&install, ArtifactClass::InstallManifest),
        Err(TrustError::SignatureInvalid { .. })
    ));
}

#[test]
fn test_untrusted_signer_rejected() {
    let install = TestInstall::new();
    install.sign(ArtifactClass::InstallManifest).unwrap();

    // Replace the trusted key pair with a fresh one
    std::fs::remove_file(install.config.private_key_path(Algorithm::Ed25519)).unwrap();
    std::fs::remove_file(install.config.public_key_path(Algorithm::Ed25519)).unwrap();
    FileKeyManager::from_config(&install.config)
        .ensure_keypair(Algorithm::Ed25519)
        .unwrap();

    assert!(matches!(
        verify(&install, ArtifactClass::InstallManifest),
        Err(TrustError::SignatureInvalid { .. })
    ));
}

#[test]
fn test_truncated_signature_is_malformed() {
    let install = TestInstall::new();
    let sig_path = install.signature_path(ArtifactClass::DatabaseSchema);
    let sig = std::fs::read(sig_path).unwrap();
    std::fs::write(sig_path, &sig[..32]).unwrap();

    assert!(matches!(
        verify(&install, ArtifactClass::DatabaseSchema),
        Err(TrustError::MalformedSignature { .. })
    ));
}

#[test]
fn test_non_hex_rsa_signature_is_malformed() {
    let install = TestInstall::new();
    let path = &install.config.model_manifest_path;
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, r#"{"models":[]}"#).unwrap();
    install.sign(ArtifactClass::ModelManifest).unwrap();

    std::fs::write(
        install.signature_path(ArtifactClass::ModelManifest),
        "zz".repeat(256),
    )
    .unwrap();

    assert!(matches!(
        verify(&install, ArtifactClass::ModelManifest),
        Err(TrustError::MalformedSignature { .. })
    ));
}

#[test]
fn test_wrong_algorithm_key_rejected() {
    let install = TestInstall::new();
    install.keypair(Algorithm::RsaPssSha256);

    // An RSA public key where the Ed25519 one is expected
    let result = FileArtifactVerifier::new().verify(
        &install.artifact(ArtifactClass::DatabaseSchema),
        install.signature_path(ArtifactClass::DatabaseSchema),
        &install.config.public_key_path(Algorithm::RsaPssSha256),
    );
    assert!(matches!(result, Err(TrustError::InvalidKey { .. })));
}

#[test]
fn test_missing_inputs_reported_in_order() {
    let install = TestInstall::new();
    let class = ArtifactClass::InstallManifest;

    // Nothing signed yet, and the key is moved away too
    std::fs::remove_file(install.config.public_key_path(Algorithm::Ed25519)).unwrap();
    assert!(matches!(
        verify(&install, class),
        Err(TrustError::MissingSignature { .. })
    ));

    std::fs::remove_file(&install.config.manifest_path).unwrap();
    assert!(matches!(
        verify(&install, class),
        Err(TrustError::MissingArtifact { .. })
    ));
}

#[test]
fn test_loose_public_key_mode_is_warning() {
    let install = TestInstall::new();
    std::fs::set_permissions(
        install.config.public_key_path(Algorithm::Ed25519),
        std::fs::Permissions::from_mode(0o666),
    )
    .unwrap();

    let trusted = FileArtifactVerifier::new()
        .verify(
            &install.artifact(ArtifactClass::DatabaseSchema),
            install.signature_path(ArtifactClass::DatabaseSchema),
            &install.public_key_path(ArtifactClass::DatabaseSchema),
        )
        .unwrap();

    assert_eq!(trusted.warnings().len(), 1);
    assert!(matches!(
        trusted.warnings()[0],
        TrustError::PermissionViolation {
            expected: 0o644,
            actual: 0o666,
            ..
        }
    ));
}
