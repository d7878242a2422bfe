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

//! Hash-only integrity of deployed units.

use crate::fixtures::{TestInstall, UNIT_NAME};
use attestor::crypto::compute_content_hash;
use attestor::manifest::ManifestEntry;
use attestor::security::{ContentIntegrityIndex, ViolationKind};
use attestor::TrustError;

fn hashed_entry(install: &TestInstall, name: &str, content: &str) -> ManifestEntry {
    let path = install.root.join("systemd").join(name);
    std::fs::write(&path, content).unwrap();
    let mut entry = ManifestEntry::new(name, "core", &path);
    entry.sha256_hash = Some(
        ContentIntegrityIndex::new()
            .capture(name, &path)
            .unwrap(),
    );
    entry
}

#[test]
fn test_single_drifted_entry_reported() {
    let install = TestInstall::new();
    let entries = vec![
        hashed_entry(&install, "svc-a.service", "X"),
        hashed_entry(&install, "svc-b.service", "B"),
        hashed_entry(&install, "svc-c.timer", "C"),
    ];
    std::fs::write(&entries[1].install_path, "B'").unwrap();

    let violations = ContentIntegrityIndex::new().recheck(&entries);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].name, "svc-b.service");
    match &violations[0].kind {
        ViolationKind::HashMismatch { expected, actual } => {
            assert_eq!(expected, &compute_content_hash(b"B"));
            assert_eq!(actual, &compute_content_hash(b"B'"));
        }
        other => panic!("Expected HashMismatch, got {:?}", other),
    }
}

#[test]
fn test_recorded_hash_survives_manifest_signing() {
    let install = TestInstall::new();
    let mut manifest = install.read_manifest();
    ContentIntegrityIndex::new()
        .record(&mut manifest, UNIT_NAME, &install.unit_path)
        .unwrap();
    install.write_manifest(&manifest);

    let reread = install.read_manifest();
    assert_eq!(
        reread.unit(UNIT_NAME).unwrap().sha256_hash,
        Some(compute_content_hash(b"X"))
    );
    assert!(ContentIntegrityIndex::new()
        .recheck(&reread.systemd_units)
        .is_empty());
}

#[test]
fn test_unrecorded_hash_is_a_violation() {
    let install = TestInstall::new();
    let manifest = install.read_manifest();

    let violations = ContentIntegrityIndex::new().recheck(&manifest.systemd_units);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::HashAbsent);
    assert!(matches!(
        violations[0].clone().into_error(),
        TrustError::HashMismatch { .. }
    ));
}

#[test]
fn test_removed_unit_is_missing_file() {
    let install = TestInstall::new();
    let entry = hashed_entry(&install, "svc-d.service", "D");
    std::fs::remove_file(&entry.install_path).unwrap();

    let violations = ContentIntegrityIndex::new().recheck(&[entry]);
    assert_eq!(violations[0].kind, ViolationKind::MissingFile);
    assert!(matches!(
        violations[0].clone().into_error(),
        TrustError::MissingArtifact { .. }
    ));
}
