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

//! The create-once install-state finalizer.
//!
//! A finalize run walks every [`Stage`] in order. Each step method checks
//! that it follows the current stage, does its work, and only then advances.
//! Any failure aborts the run; there is no resumption. The draft state
//! document is removed if signing or freezing it fails, so a later run is
//! not refused because of a half-written state.
//!
//! ```no_run
//! use attestor::config::TrustConfig;
//! use attestor::install_state::InstallStateFinalizer;
//!
//! let outcome = InstallStateFinalizer::new(TrustConfig::default()).finalize()?;
//! println!("finalized {}", outcome.state_path.display());
//! # Ok::<(), attestor::TrustError>(())
//! ```

use crate::config::TrustConfig;
use crate::crypto::Algorithm;
use crate::error::TrustError;
use crate::install_state::prerequisites::{
    DatabaseParameters, DatabaseProbe, DbEnvFileProbe, HostIdentity, InstallerIdentity,
    ManifestModules, ModuleDiscovery,
};
use crate::install_state::stage::Stage;
use crate::install_state::state::{DbSection, InstallState, STATE_VERSION};
use crate::manifest::InstallManifest;
use crate::security::audit;
use crate::security::permissions::FINALIZED_STATE_MODE;
use crate::security::{
    Artifact, ArtifactClass, ArtifactSigner, ArtifactVerifier, ContentIntegrityIndex,
    FileArtifactSigner, FileArtifactVerifier, FileKeyManager, KeyManager, KeyPair, Trusted,
    UNIT_LIST,
};
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};

/// Mode of the state document between drafting and freezing.
const DRAFT_STATE_MODE: u32 = 0o644;

/// Result of a completed finalize run.
#[derive(Debug)]
pub struct FinalizeOutcome {
    pub state: InstallState,
    pub state_path: PathBuf,
    pub signature_path: PathBuf,
    /// Permission warnings collected along the way.
    pub warnings: Vec<TrustError>,
}

/// Drives one finalize run.
pub struct InstallStateFinalizer {
    config: TrustConfig,
    key_manager: Box<dyn KeyManager>,
    signer: Box<dyn ArtifactSigner>,
    verifier: Box<dyn ArtifactVerifier>,
    database: Box<dyn DatabaseProbe>,
    modules: Box<dyn ModuleDiscovery>,
    identity: Box<dyn InstallerIdentity>,
    integrity: ContentIntegrityIndex,
    stage: Stage,
    keypair: Option<KeyPair>,
    manifest: Option<Trusted<InstallManifest>>,
    database_params: Option<DatabaseParameters>,
    state: Option<InstallState>,
    warnings: Vec<TrustError>,
}

impl InstallStateFinalizer {
    /// Creates a finalizer backed by the files named in `config`.
    pub fn new(config: TrustConfig) -> Self {
        Self {
            key_manager: Box::new(FileKeyManager::from_config(&config)),
            signer: Box::new(FileArtifactSigner::new()),
            verifier: Box::new(FileArtifactVerifier::new()),
            database: Box::new(DbEnvFileProbe::new(config.db_env_path.clone())),
            modules: Box::new(ManifestModules),
            identity: Box::new(HostIdentity),
            integrity: ContentIntegrityIndex::new(),
            stage: Stage::Uninitialized,
            keypair: None,
            manifest: None,
            database_params: None,
            state: None,
            warnings: Vec::new(),
            config,
        }
    }

    pub fn with_key_manager(mut self, key_manager: impl KeyManager + 'static) -> Self {
        self.key_manager = Box::new(key_manager);
        self
    }

    pub fn with_signer(mut self, signer: impl ArtifactSigner + 'static) -> Self {
        self.signer = Box::new(signer);
        self
    }

    pub fn with_verifier(mut self, verifier: impl ArtifactVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    pub fn with_database_probe(mut self, probe: impl DatabaseProbe + 'static) -> Self {
        self.database = Box::new(probe);
        self
    }

    pub fn with_module_discovery(mut self, discovery: impl ModuleDiscovery + 'static) -> Self {
        self.modules = Box::new(discovery);
        self
    }

    pub fn with_installer_identity(mut self, identity: impl InstallerIdentity + 'static) -> Self {
        self.identity = Box::new(identity);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn keypair(&self) -> Option<&KeyPair> {
        self.keypair.as_ref()
    }

    pub fn warnings(&self) -> &[TrustError] {
        &self.warnings
    }

    /// Runs every stage in order.
    pub fn finalize(mut self) -> Result<FinalizeOutcome, TrustError> {
        self.ensure_keys()?;
        self.sign_manifest()?;
        self.hash_units()?;
        self.verify_prerequisites()?;
        self.draft_state()?;
        self.sign_state()?;
        self.freeze()?;

        let state = self
            .state
            .take()
            .ok_or_else(|| self.out_of_order(Stage::Immutable))?;
        Ok(FinalizeOutcome {
            state,
            state_path: self.config.state_path,
            signature_path: self.config.state_signature_path,
            warnings: self.warnings,
        })
    }

    /// `Uninitialized -> KeysReady`.
    ///
    /// Refuses before touching the filesystem if a state document is already
    /// present, signed or not.
    pub fn ensure_keys(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::KeysReady)?;
        if let Err(e) = self.refuse_if_finalized() {
            audit::log_install_state_refused(&self.config.state_path, &e.to_string());
            return Err(e);
        }

        let mut keypair = self.key_manager.ensure_keypair(Algorithm::Ed25519)?;
        self.warnings.extend(keypair.take_warnings());
        self.keypair = Some(keypair);
        self.advance(Stage::KeysReady);
        Ok(())
    }

    /// `KeysReady -> ManifestSigned`.
    pub fn sign_manifest(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::ManifestSigned)?;
        let path = &self.config.manifest_path;
        let bytes = crate::fs::read_or(path, || TrustError::MissingArtifact {
            path: path.clone(),
        })?;
        InstallManifest::from_slice(path, &bytes)?;

        let keypair = self.require_keypair(Stage::ManifestSigned)?;
        self.signer.sign(
            &self.manifest_artifact(),
            keypair,
            &self.config.manifest_signature_path,
        )?;
        self.advance(Stage::ManifestSigned);
        Ok(())
    }

    /// `ManifestSigned -> UnitsDeployedAndHashed`.
    ///
    /// Captures the hash of every systemd unit, rewrites and re-signs the
    /// manifest, then rechecks the units against the re-verified copy. A
    /// manifest without units is refused before anything is rewritten.
    pub fn hash_units(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::UnitsDeployedAndHashed)?;
        let mut manifest = self.verify_manifest()?.into_content();
        if manifest.systemd_units.is_empty() {
            audit::log_integrity_violation(UNIT_LIST, &self.config.manifest_path, "no_entries");
            return Err(TrustError::NoUnits);
        }

        let units: Vec<(String, PathBuf)> = manifest
            .systemd_units
            .iter()
            .map(|unit| (unit.name.clone(), unit.install_path.clone()))
            .collect();
        for (name, install_path) in &units {
            self.integrity.record(&mut manifest, name, install_path)?;
        }

        manifest.write(&self.config.manifest_path)?;

        let keypair = self.require_keypair(Stage::UnitsDeployedAndHashed)?;
        self.signer.sign(
            &self.manifest_artifact(),
            keypair,
            &self.config.manifest_signature_path,
        )?;

        let trusted = self.verify_manifest()?;
        if let Some(violation) = self
            .integrity
            .recheck(&trusted.content().systemd_units)
            .into_iter()
            .next()
        {
            return Err(violation.into_error());
        }

        self.manifest = Some(trusted);
        self.advance(Stage::UnitsDeployedAndHashed);
        Ok(())
    }

    /// `UnitsDeployedAndHashed -> PrereqsVerified`.
    pub fn verify_prerequisites(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::PrereqsVerified)?;

        let schema = Artifact::new(ArtifactClass::DatabaseSchema, self.config.schema_path.clone());
        let mut trusted_schema = self.verifier.verify(
            &schema,
            &self.config.schema_signature_path,
            &self.config.public_key_path(Algorithm::Ed25519),
        )?;
        self.warnings.extend(trusted_schema.take_warnings());

        let params = self.database.probe()?;

        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| self.out_of_order(Stage::PrereqsVerified))?;
        if !manifest.content().db_initialized {
            return Err(TrustError::PrerequisiteFailed {
                reason: "install manifest does not record db_initialized".to_string(),
            });
        }

        self.database_params = Some(params);
        self.advance(Stage::PrereqsVerified);
        Ok(())
    }

    /// `PrereqsVerified -> StateDrafted`.
    ///
    /// Writes the state document create-only. An existing document means
    /// another run got here first.
    pub fn draft_state(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::StateDrafted)?;
        let state = self.build_state()?;

        let problems = state.problems();
        if !problems.is_empty() {
            return Err(TrustError::PrerequisiteFailed {
                reason: problems.join("; "),
            });
        }

        let path = &self.config.state_path;
        let mut bytes =
            serde_json::to_vec_pretty(&state).map_err(|e| TrustError::CanonicalizationError {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        bytes.push(b'\n');

        crate::fs::write_create_once(path, &bytes, DRAFT_STATE_MODE).map_err(|e| match e {
            TrustError::Io { source, .. }
                if source.kind() == std::io::ErrorKind::AlreadyExists =>
            {
                TrustError::AlreadyFinalized { path: path.clone() }
            }
            other => other,
        })?;

        self.state = Some(state);
        self.advance(Stage::StateDrafted);
        Ok(())
    }

    /// `StateDrafted -> StateSigned`. The signature is evidentiary: 0444,
    /// create-only.
    pub fn sign_state(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::StateSigned)?;
        let keypair = self.require_keypair(Stage::StateSigned)?;
        let artifact = Artifact::new(ArtifactClass::InstallState, self.config.state_path.clone());

        if let Err(e) = self
            .signer
            .sign(&artifact, keypair, &self.config.state_signature_path)
        {
            self.discard_draft(false);
            return Err(e);
        }

        match self.verifier.verify(
            &artifact,
            &self.config.state_signature_path,
            keypair.public_key_path(),
        ) {
            Ok(mut trusted) => self.warnings.extend(trusted.take_warnings()),
            Err(e) => {
                self.discard_draft(true);
                return Err(e);
            }
        }

        self.advance(Stage::StateSigned);
        Ok(())
    }

    /// `StateSigned -> Immutable`.
    pub fn freeze(&mut self) -> Result<(), TrustError> {
        self.begin(Stage::Immutable)?;
        if let Err(e) = crate::fs::set_mode(&self.config.state_path, FINALIZED_STATE_MODE) {
            self.discard_draft(true);
            return Err(e);
        }

        if let (Some(state), Some(keypair)) = (&self.state, &self.keypair) {
            audit::log_install_state_finalized(
                &self.config.state_path,
                &state.manifest_hash,
                keypair.fingerprint(),
            );
        }
        self.advance(Stage::Immutable);
        Ok(())
    }

    fn begin(&self, target: Stage) -> Result<(), TrustError> {
        if self.stage.next() == Some(target) {
            Ok(())
        } else {
            Err(self.out_of_order(target))
        }
    }

    fn advance(&mut self, target: Stage) {
        audit::log_stage_transition(self.stage.as_str(), target.as_str());
        self.stage = target;
    }

    fn out_of_order(&self, attempted: Stage) -> TrustError {
        TrustError::OrderViolation {
            current: self.stage,
            attempted,
        }
    }

    fn require_keypair(&self, attempted: Stage) -> Result<&KeyPair, TrustError> {
        self.keypair
            .as_ref()
            .ok_or_else(|| self.out_of_order(attempted))
    }

    fn manifest_artifact(&self) -> Artifact {
        Artifact::new(
            ArtifactClass::InstallManifest,
            self.config.manifest_path.clone(),
        )
    }

    fn verify_manifest(&mut self) -> Result<Trusted<InstallManifest>, TrustError> {
        let mut trusted = self
            .verifier
            .verify(
                &self.manifest_artifact(),
                &self.config.manifest_signature_path,
                &self.config.public_key_path(Algorithm::Ed25519),
            )?
            .into_document::<InstallManifest>()?;
        self.warnings.extend(trusted.take_warnings());
        Ok(trusted)
    }

    fn refuse_if_finalized(&self) -> Result<(), TrustError> {
        let state_path = &self.config.state_path;
        let signature_path = &self.config.state_signature_path;

        match (state_path.exists(), signature_path.exists()) {
            (false, false) => Ok(()),
            (true, false) => Err(TrustError::MissingSignature {
                path: signature_path.clone(),
            }),
            (false, true) => Err(TrustError::MissingArtifact {
                path: state_path.clone(),
            }),
            (true, true) => {
                self.verifier.verify(
                    &Artifact::new(ArtifactClass::InstallState, state_path.clone()),
                    signature_path,
                    &self.config.public_key_path(Algorithm::Ed25519),
                )?;
                Err(TrustError::AlreadyFinalized {
                    path: state_path.clone(),
                })
            }
        }
    }

    fn build_state(&self) -> Result<InstallState, TrustError> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| self.out_of_order(Stage::StateDrafted))?;
        let params = self
            .database_params
            .as_ref()
            .ok_or_else(|| self.out_of_order(Stage::StateDrafted))?;
        let keypair = self.require_keypair(Stage::StateDrafted)?;

        Ok(InstallState {
            state_version: STATE_VERSION.to_string(),
            install_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            db: DbSection {
                enabled: true,
                mode: params.mode,
                host: params.host.clone(),
                port: params.port,
                name: params.name.clone(),
                schema_applied: manifest.content().db_initialized,
                schema_signature_verified: true,
            },
            enabled_modules: self.modules.enabled_modules(manifest.content()),
            manifest_hash: manifest.content_hash().to_string(),
            installer_identity_hash: self.identity.identity_hash()?,
            signer_fingerprint: keypair.fingerprint().to_string(),
        })
    }

    /// Removes the state document written by this run, and its signature
    /// when this run wrote that too.
    fn discard_draft(&self, signed: bool) {
        let mut paths: Vec<&Path> = vec![self.config.state_path.as_path()];
        if signed {
            paths.push(self.config.state_signature_path.as_path());
        }
        for path in paths {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove partial install state"
                );
            }
        }
    }
}
