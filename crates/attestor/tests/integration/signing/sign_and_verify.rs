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

//! Sign and verify round trips for every artifact class.

use crate::fixtures::TestInstall;
use attestor::crypto::{canonicalize_json_bytes, compute_content_hash, Algorithm};
use attestor::manifest::InstallManifest;
use attestor::security::{ArtifactClass, ArtifactVerifier, FileArtifactVerifier};
use serde_json::json;

#[test]
fn test_manifest_round_trip() {
    let install = TestInstall::new();
    install.sign(ArtifactClass::InstallManifest).unwrap();

    let trusted = FileArtifactVerifier::new()
        .verify_document::<InstallManifest>(
            &install.artifact(ArtifactClass::InstallManifest),
            install.signature_path(ArtifactClass::InstallManifest),
            &install.public_key_path(ArtifactClass::InstallManifest),
        )
        .unwrap();

    assert_eq!(trusted.content(), &install.manifest());
    assert_eq!(
        trusted.signer_fingerprint(),
        install.keypair(Algorithm::Ed25519).fingerprint()
    );
    assert!(trusted.warnings().is_empty());

    let raw = std::fs::read(&install.config.manifest_path).unwrap();
    assert_eq!(
        trusted.content_hash(),
        compute_content_hash(&canonicalize_json_bytes(&raw).unwrap())
    );
}

#[test]
fn test_schema_round_trip_uses_raw_bytes() {
    let install = TestInstall::new();

    let trusted = FileArtifactVerifier::new()
        .verify(
            &install.artifact(ArtifactClass::DatabaseSchema),
            install.signature_path(ArtifactClass::DatabaseSchema),
            &install.public_key_path(ArtifactClass::DatabaseSchema),
        )
        .unwrap();

    let raw = std::fs::read(&install.config.schema_path).unwrap();
    assert_eq!(trusted.content(), &raw);
    assert_eq!(trusted.content_hash(), compute_content_hash(&raw));
}

#[test]
fn test_model_manifest_rsa_round_trip() {
    let install = TestInstall::new();
    let path = &install.config.model_manifest_path;
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        path,
        serde_json::to_vec_pretty(&json!({
            "models": [{"name": "anomaly", "sha256": "ab".repeat(32)}],
            "version": 3
        }))
        .unwrap(),
    )
    .unwrap();
    install.sign(ArtifactClass::ModelManifest).unwrap();

    // Stored as hex text, one hex pair per signature byte
    let stored = std::fs::read_to_string(install.signature_path(ArtifactClass::ModelManifest))
        .unwrap();
    assert_eq!(stored.trim().len(), 2 * 256);
    assert!(stored.trim().bytes().all(|b| b.is_ascii_hexdigit()));

    let trusted = FileArtifactVerifier::new()
        .verify(
            &install.artifact(ArtifactClass::ModelManifest),
            install.signature_path(ArtifactClass::ModelManifest),
            &install.public_key_path(ArtifactClass::ModelManifest),
        )
        .unwrap();
    assert_eq!(
        trusted.signer_fingerprint(),
        install.keypair(Algorithm::RsaPssSha256).fingerprint()
    );
}

#[test]
fn test_reordered_manifest_still_verifies() {
    let install = TestInstall::new();
    install.sign(ArtifactClass::InstallManifest).unwrap();

    // Same document, different key order and layout
    let raw = std::fs::read(&install.config.manifest_path).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let mut entries: Vec<_> = value.as_object().unwrap().iter().collect();
    entries.reverse();
    let reordered = format!(
        "{{{}}}",
        entries
            .iter()
            .map(|(k, v)| format!("{:?}: {}", k, v))
            .collect::<Vec<_>>()
            .join(",\n")
    );
    std::fs::write(&install.config.manifest_path, reordered).unwrap();

    FileArtifactVerifier::new()
        .verify(
            &install.artifact(ArtifactClass::InstallManifest),
            install.signature_path(ArtifactClass::InstallManifest),
            &install.public_key_path(ArtifactClass::InstallManifest),
        )
        .unwrap();
}
