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

//! Error taxonomy for the attestation chain.
//!
//! Every variant except [`TrustError::PermissionViolation`] is critical: the
//! operation that produced it must abort immediately, with no retry and no
//! fallback to unverified content. Permission violations are warnings that
//! are reported alongside an otherwise successful result.

use crate::install_state::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// How an error must be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort immediately. The artifact must not be trusted.
    Critical,
    /// Report, but do not block.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// Errors raised while managing keys, signing, verifying or finalizing.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("Artifact not found: {path}")]
    MissingArtifact { path: PathBuf },

    #[error("Signature not found: {path}")]
    MissingSignature { path: PathBuf },

    #[error("Key not found: {path}")]
    MissingKey { path: PathBuf },

    #[error("Invalid key {path}: {reason}")]
    InvalidKey { path: PathBuf, reason: String },

    #[error("Failed to canonicalize {path}: {reason}")]
    CanonicalizationError { path: PathBuf, reason: String },

    #[error("Malformed signature {path}: {reason}")]
    MalformedSignature { path: PathBuf, reason: String },

    #[error("Signature verification failed for {path}")]
    SignatureInvalid { path: PathBuf },

    #[error("Hash mismatch for {name}: expected {expected}, got {actual}")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Out-of-order transition: cannot enter {attempted} from {current}")]
    OrderViolation { current: Stage, attempted: Stage },

    #[error("Permission violation on {path}: expected {expected:04o}, found {actual:04o}")]
    PermissionViolation {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },

    #[error("Install state already finalized: {path}")]
    AlreadyFinalized { path: PathBuf },

    #[error("Prerequisite not met: {reason}")]
    PrerequisiteFailed { reason: String },

    #[error("Manifest lists no systemd units")]
    NoUnits,

    #[error("Key generation failed: {reason}")]
    KeyGeneration { reason: String },

    #[error("Signing failed for {path}: {reason}")]
    SigningFailed { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrustError {
    /// Creates an I/O error bound to the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrustError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns how this error must be handled.
    pub fn severity(&self) -> Severity {
        match self {
            TrustError::PermissionViolation { .. } => Severity::Warning,
            _ => Severity::Critical,
        }
    }

    /// True for failures caused by the environment rather than by the
    /// artifacts themselves (missing keys, unreadable files, unmet
    /// prerequisites).
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            TrustError::Io { .. }
                | TrustError::MissingKey { .. }
                | TrustError::PrerequisiteFailed { .. }
                | TrustError::KeyGeneration { .. }
        )
    }

    /// Stable machine-readable name, used as the `failure_reason` of audit events.
    pub fn kind(&self) -> &'static str {
        match self {
            TrustError::MissingArtifact { .. } => "missing_artifact",
            TrustError::MissingSignature { .. } => "missing_signature",
            TrustError::MissingKey { .. } => "missing_key",
            TrustError::InvalidKey { .. } => "invalid_key",
            TrustError::CanonicalizationError { .. } => "canonicalization_error",
            TrustError::MalformedSignature { .. } => "malformed_signature",
            TrustError::SignatureInvalid { .. } => "signature_invalid",
            TrustError::HashMismatch { .. } => "hash_mismatch",
            TrustError::OrderViolation { .. } => "order_violation",
            TrustError::PermissionViolation { .. } => "permission_violation",
            TrustError::AlreadyFinalized { .. } => "already_finalized",
            TrustError::PrerequisiteFailed { .. } => "prerequisite_failed",
            TrustError::NoUnits => "no_units",
            TrustError::KeyGeneration { .. } => "key_generation",
            TrustError::SigningFailed { .. } => "signing_failed",
            TrustError::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_permission_violation_is_warning() {
        let warning = TrustError::PermissionViolation {
            path: PathBuf::from("/tmp/key"),
            expected: 0o600,
            actual: 0o644,
        };
        assert_eq!(warning.severity(), Severity::Warning);

        let critical = TrustError::SignatureInvalid {
            path: PathBuf::from("/tmp/manifest.json"),
        };
        assert_eq!(critical.severity(), Severity::Critical);
    }

    #[test]
    fn test_permission_violation_formats_octal() {
        let err = TrustError::PermissionViolation {
            path: PathBuf::from("/tmp/state.json"),
            expected: 0o444,
            actual: 0o644,
        };
        assert!(err.to_string().contains("expected 0444, found 0644"));
    }

    #[test]
    fn test_empty_unit_list_is_critical_trust_failure() {
        assert_eq!(TrustError::NoUnits.severity(), Severity::Critical);
        assert!(!TrustError::NoUnits.is_environmental());
        assert_eq!(TrustError::NoUnits.kind(), "no_units");
    }

    #[test]
    fn test_environmental_classification() {
        assert!(TrustError::MissingKey {
            path: PathBuf::from("/k")
        }
        .is_environmental());
        assert!(!TrustError::MissingSignature {
            path: PathBuf::from("/s")
        }
        .is_environmental());
    }
}
