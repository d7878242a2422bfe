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

//! Independent verification of a finalized install.

use crate::config::TrustConfig;
use crate::crypto::Algorithm;
use crate::error::{Severity, TrustError};
use crate::install_state::state::InstallState;
use crate::manifest::InstallManifest;
use crate::security::permissions::{check_mode, DB_ENV_MODE, FINALIZED_STATE_MODE};
use crate::security::{
    Artifact, ArtifactClass, ArtifactVerifier, ContentIntegrityIndex, FileArtifactVerifier,
};

/// Findings of a single install-state check.
#[derive(Debug, Default)]
pub struct StateCheckReport {
    /// The verified state document, if its signature held.
    pub state: Option<InstallState>,
    pub findings: Vec<TrustError>,
}

impl StateCheckReport {
    /// True when no finding is critical.
    pub fn passed(&self) -> bool {
        self.critical().next().is_none()
    }

    pub fn critical(&self) -> impl Iterator<Item = &TrustError> {
        self.findings
            .iter()
            .filter(|finding| finding.severity() == Severity::Critical)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &TrustError> {
        self.findings
            .iter()
            .filter(|finding| finding.severity() == Severity::Warning)
    }
}

/// Re-verifies the install state against the signed manifest and the
/// deployed units. Never writes.
pub struct InstallStateChecker {
    config: TrustConfig,
    verifier: Box<dyn ArtifactVerifier>,
    integrity: ContentIntegrityIndex,
}

impl InstallStateChecker {
    pub fn new(config: TrustConfig) -> Self {
        Self {
            config,
            verifier: Box::new(FileArtifactVerifier::new()),
            integrity: ContentIntegrityIndex::new(),
        }
    }

    pub fn with_verifier(mut self, verifier: impl ArtifactVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    pub fn check(&self) -> StateCheckReport {
        let mut report = StateCheckReport::default();
        let public_key_path = self.config.public_key_path(Algorithm::Ed25519);

        // Nothing in an unverified state document is worth reading
        let state_artifact =
            Artifact::new(ArtifactClass::InstallState, self.config.state_path.clone());
        let mut trusted_state = match self
            .verifier
            .verify(
                &state_artifact,
                &self.config.state_signature_path,
                &public_key_path,
            )
            .and_then(|trusted| trusted.into_document::<InstallState>())
        {
            Ok(trusted) => trusted,
            Err(e) => {
                report.findings.push(e);
                return report;
            }
        };
        report.findings.extend(trusted_state.take_warnings());
        report.findings.extend(
            [
                check_mode(&self.config.state_path, FINALIZED_STATE_MODE),
                check_mode(&self.config.db_env_path, DB_ENV_MODE),
            ]
            .into_iter()
            .flatten(),
        );

        let state = trusted_state.content();
        report
            .findings
            .extend(
                state
                    .problems()
                    .into_iter()
                    .map(|reason| TrustError::CanonicalizationError {
                        path: self.config.state_path.clone(),
                        reason,
                    }),
            );

        if state.signer_fingerprint != trusted_state.signer_fingerprint() {
            report.findings.push(TrustError::HashMismatch {
                name: "signer_fingerprint".to_string(),
                expected: state.signer_fingerprint.clone(),
                actual: trusted_state.signer_fingerprint().to_string(),
            });
        }

        let manifest_artifact = Artifact::new(
            ArtifactClass::InstallManifest,
            self.config.manifest_path.clone(),
        );
        match self
            .verifier
            .verify(
                &manifest_artifact,
                &self.config.manifest_signature_path,
                &public_key_path,
            )
            .and_then(|trusted| trusted.into_document::<InstallManifest>())
        {
            Ok(mut manifest) => {
                report.findings.extend(manifest.take_warnings());
                if state.manifest_hash != manifest.content_hash() {
                    report.findings.push(TrustError::HashMismatch {
                        name: "install_manifest".to_string(),
                        expected: state.manifest_hash.clone(),
                        actual: manifest.content_hash().to_string(),
                    });
                }
                report.findings.extend(
                    self.integrity
                        .recheck(&manifest.content().systemd_units)
                        .into_iter()
                        .map(|violation| violation.into_error()),
                );
            }
            Err(e) => report.findings.push(e),
        }

        tracing::info!(
            state_path = %self.config.state_path.display(),
            findings = report.findings.len(),
            "Install state checked"
        );
        report.state = Some(trusted_state.into_content());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install_state::finalizer::tests::{finalizer, prepared_install, Install};
    use crate::security::{ArtifactSigner, FileArtifactSigner, FileKeyManager, KeyManager};
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_finalized_install_passes() {
        let install = prepared_install();
        finalizer(&install).finalize().unwrap();

        let report = InstallStateChecker::new(install.config.clone()).check();
        assert!(report.passed(), "findings: {:?}", report.findings);
        assert!(report.state.is_some());
    }

    #[test]
    fn test_missing_state_is_critical() {
        let install = prepared_install();

        let report = InstallStateChecker::new(install.config.clone()).check();
        assert!(!report.passed());
        assert!(report.state.is_none());
        assert!(matches!(
            report.findings[0],
            TrustError::MissingArtifact { .. }
        ));
    }

    #[test]
    fn test_unit_drift_reported() {
        let install = prepared_install();
        finalizer(&install).finalize().unwrap();
        std::fs::write(&install.unit_path, "Y").unwrap();

        let report = InstallStateChecker::new(install.config.clone()).check();
        let critical: Vec<_> = report.critical().collect();
        assert_eq!(critical.len(), 1);
        match critical[0] {
            TrustError::HashMismatch { name, .. } => assert_eq!(name, "svc-a.service"),
            other => panic!("Expected HashMismatch, got {:?}", other),
        }
    }

    /// Rewrites the manifest and signs it again with the install key.
    fn resign_manifest(install: &Install, edit: impl FnOnce(&mut InstallManifest)) {
        let path = &install.config.manifest_path;
        let mut manifest =
            InstallManifest::from_slice(path, &std::fs::read(path).unwrap()).unwrap();
        edit(&mut manifest);
        std::fs::write(path, manifest.to_pretty_json(path).unwrap()).unwrap();
        let keypair = FileKeyManager::from_config(&install.config)
            .load_keypair(Algorithm::Ed25519)
            .unwrap();
        FileArtifactSigner::new()
            .sign(
                &Artifact::new(ArtifactClass::InstallManifest, path.clone()),
                &keypair,
                &install.config.manifest_signature_path,
            )
            .unwrap();
    }

    #[test]
    fn test_resigned_manifest_no_longer_matches_state() {
        let install = prepared_install();
        finalizer(&install).finalize().unwrap();

        // A validly signed manifest that is not the one the state recorded
        resign_manifest(&install, |manifest| {
            manifest.installer_version = Some("9.9.9".to_string());
        });

        let report = InstallStateChecker::new(install.config.clone()).check();
        assert!(report.critical().any(|finding| matches!(
            finding,
            TrustError::HashMismatch { name, .. } if name == "install_manifest"
        )));
    }

    #[test]
    fn test_manifest_without_units_is_critical() {
        let install = prepared_install();
        finalizer(&install).finalize().unwrap();
        resign_manifest(&install, |manifest| manifest.systemd_units.clear());

        let report = InstallStateChecker::new(install.config.clone()).check();
        assert!(!report.passed());
        assert!(report.critical().any(|finding| matches!(finding, TrustError::NoUnits)));
    }

    #[test]
    fn test_writable_state_is_warning_only() {
        let install = prepared_install();
        finalizer(&install).finalize().unwrap();
        std::fs::set_permissions(
            &install.config.state_path,
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let report = InstallStateChecker::new(install.config.clone()).check();
        assert!(report.passed());
        assert_eq!(report.warnings().count(), 1);
        assert!(install.dir.path().exists());
    }
}
