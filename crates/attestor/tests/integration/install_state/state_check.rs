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

//! Install-state checks after finalization.

use crate::fixtures::{TestInstall, UNIT_NAME};
use attestor::install_state::InstallStateChecker;
use attestor::security::ArtifactClass;
use attestor::TrustError;

#[test]
fn test_untouched_install_passes() {
    let install = TestInstall::new();
    install.finalizer().finalize().unwrap();

    let report = InstallStateChecker::new(install.config.clone()).check();
    assert!(report.passed(), "{:?}", report.findings);
    assert_eq!(report.state.unwrap().enabled_modules, vec!["core".to_string()]);
}

#[test]
fn test_drifted_unit_fails_check() {
    let install = TestInstall::new();
    install.finalizer().finalize().unwrap();
    std::fs::write(&install.unit_path, "Y").unwrap();

    let report = InstallStateChecker::new(install.config.clone()).check();
    assert!(!report.passed());
    assert!(report.critical().any(|finding| matches!(
        finding,
        TrustError::HashMismatch { name, .. } if name == UNIT_NAME
    )));
}

#[test]
fn test_edited_state_fails_check() {
    let install = TestInstall::new();
    let outcome = install.finalizer().finalize().unwrap();

    let mut state = outcome.state.clone();
    state.db.port = 1;
    std::fs::remove_file(&outcome.state_path).unwrap();
    std::fs::write(
        &outcome.state_path,
        serde_json::to_vec_pretty(&state).unwrap(),
    )
    .unwrap();

    let report = InstallStateChecker::new(install.config.clone()).check();
    assert!(report.state.is_none());
    assert!(matches!(
        report.findings.as_slice(),
        [TrustError::SignatureInvalid { .. }]
    ));
}

#[test]
fn test_missing_state_signature_fails_check() {
    let install = TestInstall::new();
    install.finalizer().finalize().unwrap();
    std::fs::remove_file(install.signature_path(ArtifactClass::InstallState)).unwrap();

    let report = InstallStateChecker::new(install.config.clone()).check();
    assert!(matches!(
        report.findings.as_slice(),
        [TrustError::MissingSignature { .. }]
    ));
}
