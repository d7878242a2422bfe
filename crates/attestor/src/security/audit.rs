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

//! Security audit logging.
//!
//! This module provides structured audit logging for every attestation step:
//! - Key operations (generate, reuse, load failure)
//! - Artifact signing
//! - Signature verification
//! - Content integrity capture and violations
//! - Install-state lifecycle transitions
//!
//! Events carry an `event_type` field in dot notation and are emitted through
//! `tracing` at a level matching their severity.

use std::path::Path;

/// Event types for attestation operations.
pub mod events {
    /// Key pair generated event type.
    pub const KEY_GENERATED: &str = "key.generated";
    /// Existing key pair reused event type.
    pub const KEY_REUSED: &str = "key.reused";
    /// Key load failure event type.
    pub const KEY_LOAD_FAILED: &str = "key.load_failed";

    /// Artifact signed event type.
    pub const ARTIFACT_SIGNED: &str = "artifact.signed";
    /// Artifact sign failure event type.
    pub const ARTIFACT_SIGN_FAILURE: &str = "artifact.sign.failure";

    /// Verification success event type.
    pub const VERIFICATION_SUCCESS: &str = "verification.success";
    /// Verification failure event type.
    pub const VERIFICATION_FAILURE: &str = "verification.failure";

    /// Content hash captured event type.
    pub const INTEGRITY_CAPTURED: &str = "integrity.captured";
    /// Content hash violation event type.
    pub const INTEGRITY_VIOLATION: &str = "integrity.violation";

    /// File permission violation event type.
    pub const PERMISSION_VIOLATION: &str = "permission.violation";

    /// Install-state stage transition event type.
    pub const INSTALL_STATE_TRANSITION: &str = "install_state.transition";
    /// Install-state finalized event type.
    pub const INSTALL_STATE_FINALIZED: &str = "install_state.finalized";
    /// Install-state finalize refused event type.
    pub const INSTALL_STATE_REFUSED: &str = "install_state.refused";
}

/// Log a key pair generation event.
pub fn log_key_generated(algorithm: &str, key_fingerprint: &str, private_key_path: &Path) {
    tracing::info!(
        event_type = events::KEY_GENERATED,
        algorithm = %algorithm,
        key_fingerprint = %key_fingerprint,
        private_key_path = %private_key_path.display(),
        "Signing key pair generated"
    );
}

/// Log reuse of an existing key pair.
pub fn log_key_reused(algorithm: &str, key_fingerprint: &str) {
    tracing::info!(
        event_type = events::KEY_REUSED,
        algorithm = %algorithm,
        key_fingerprint = %key_fingerprint,
        "Existing signing key pair reused"
    );
}

/// Log a failure to load an existing key.
pub fn log_key_load_failed(path: &Path, error: &str) {
    tracing::error!(
        event_type = events::KEY_LOAD_FAILED,
        key_path = %path.display(),
        error = %error,
        "Failed to load signing key"
    );
}

/// Log an artifact signing event.
pub fn log_artifact_signed(
    artifact_path: &Path,
    content_hash: &str,
    key_fingerprint: &str,
    signature_path: &Path,
) {
    tracing::info!(
        event_type = events::ARTIFACT_SIGNED,
        artifact_path = %artifact_path.display(),
        content_hash = %content_hash,
        key_fingerprint = %key_fingerprint,
        signature_path = %signature_path.display(),
        "Artifact signed"
    );
}

/// Log an artifact signing failure.
pub fn log_artifact_sign_failed(artifact_path: &Path, error: &str) {
    tracing::error!(
        event_type = events::ARTIFACT_SIGN_FAILURE,
        artifact_path = %artifact_path.display(),
        error = %error,
        "Artifact signing failed"
    );
}

/// Log a verification success event.
pub fn log_verification_success(
    artifact_path: &Path,
    content_hash: &str,
    signer_fingerprint: &str,
) {
    tracing::info!(
        event_type = events::VERIFICATION_SUCCESS,
        artifact_path = %artifact_path.display(),
        content_hash = %content_hash,
        signer_fingerprint = %signer_fingerprint,
        "Artifact signature verified successfully"
    );
}

/// Log a verification failure event.
pub fn log_verification_failure(artifact_path: &Path, failure_reason: &str, error: &str) {
    tracing::warn!(
        event_type = events::VERIFICATION_FAILURE,
        artifact_path = %artifact_path.display(),
        failure_reason = %failure_reason,
        error = %error,
        "Artifact verification failed"
    );
}

/// Log a captured content hash.
pub fn log_integrity_captured(name: &str, install_path: &Path, content_hash: &str) {
    tracing::info!(
        event_type = events::INTEGRITY_CAPTURED,
        entry_name = %name,
        install_path = %install_path.display(),
        content_hash = %content_hash,
        "Content hash captured"
    );
}

/// Log a content integrity violation.
pub fn log_integrity_violation(name: &str, install_path: &Path, reason: &str) {
    tracing::error!(
        event_type = events::INTEGRITY_VIOLATION,
        entry_name = %name,
        install_path = %install_path.display(),
        reason = %reason,
        "Content integrity violation"
    );
}

/// Log a file permission violation.
pub fn log_permission_violation(path: &Path, expected: u32, actual: u32) {
    tracing::warn!(
        event_type = events::PERMISSION_VIOLATION,
        path = %path.display(),
        expected_mode = %format!("{:04o}", expected),
        actual_mode = %format!("{:04o}", actual),
        "File permissions do not match invariant"
    );
}

/// Log an install-state stage transition.
pub fn log_stage_transition(from: &str, to: &str) {
    tracing::info!(
        event_type = events::INSTALL_STATE_TRANSITION,
        from_stage = %from,
        to_stage = %to,
        "Install state transition"
    );
}

/// Log a successfully finalized install state.
pub fn log_install_state_finalized(
    state_path: &Path,
    manifest_hash: &str,
    signer_fingerprint: &str,
) {
    tracing::info!(
        event_type = events::INSTALL_STATE_FINALIZED,
        state_path = %state_path.display(),
        manifest_hash = %manifest_hash,
        signer_fingerprint = %signer_fingerprint,
        "Install state finalized and made immutable"
    );
}

/// Log a refused finalize attempt.
pub fn log_install_state_refused(state_path: &Path, reason: &str) {
    tracing::error!(
        event_type = events::INSTALL_STATE_REFUSED,
        state_path = %state_path.display(),
        reason = %reason,
        "Install state finalization refused"
    );
}
