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

//! Content hash tracking for artifacts that are not signed individually.
//!
//! Installed systemd units carry no signature of their own. Their SHA256 is
//! recorded in the manifest right after deployment, and the manifest is then
//! signed; a later recheck recomputes every hash and compares it with the
//! recorded one. Only the entries passed in are checked; directories are
//! never enumerated.

use crate::crypto::compute_content_hash;
use crate::error::TrustError;
use crate::manifest::{InstallManifest, ManifestEntry};
use crate::security::audit;
use std::fmt;
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;

/// Name reported for violations that concern the unit list as a whole.
pub const UNIT_LIST: &str = "systemd_units";

/// What went wrong with a single manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Nothing exists at the install path.
    MissingFile,
    /// The file exists but could not be read.
    Unreadable { reason: String },
    /// The manifest entry has no recorded hash.
    HashAbsent,
    /// The recorded hash differs from the file content.
    HashMismatch { expected: String, actual: String },
    /// The list to check was empty.
    NoEntries,
}

impl ViolationKind {
    fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MissingFile => "missing_file",
            ViolationKind::Unreadable { .. } => "unreadable",
            ViolationKind::HashAbsent => "hash_absent",
            ViolationKind::HashMismatch { .. } => "hash_mismatch",
            ViolationKind::NoEntries => "no_entries",
        }
    }
}

/// An integrity violation for a named entry. Always critical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub name: String,
    pub install_path: PathBuf,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn into_error(self) -> TrustError {
        match self.kind {
            ViolationKind::MissingFile => TrustError::MissingArtifact {
                path: self.install_path,
            },
            ViolationKind::Unreadable { reason } => {
                TrustError::io(self.install_path, std::io::Error::other(reason))
            }
            ViolationKind::HashAbsent => TrustError::HashMismatch {
                name: self.name,
                expected: "<not recorded>".to_string(),
                actual: "<not computed>".to_string(),
            },
            ViolationKind::HashMismatch { expected, actual } => TrustError::HashMismatch {
                name: self.name,
                expected,
                actual,
            },
            ViolationKind::NoEntries => TrustError::NoUnits,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::MissingFile => write!(
                f,
                "{}: not found at {}",
                self.name,
                self.install_path.display()
            ),
            ViolationKind::Unreadable { reason } => write!(
                f,
                "{}: cannot read {}: {}",
                self.name,
                self.install_path.display(),
                reason
            ),
            ViolationKind::HashAbsent => write!(f, "{}: no sha256_hash recorded", self.name),
            ViolationKind::HashMismatch { expected, actual } => write!(
                f,
                "{}: hash mismatch (expected {}, got {})",
                self.name, expected, actual
            ),
            ViolationKind::NoEntries => write!(f, "{}: no entries to check", self.name),
        }
    }
}

/// Records and rechecks content hashes of deployed artifacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentIntegrityIndex;

impl ContentIntegrityIndex {
    pub fn new() -> Self {
        Self
    }

    /// Computes the SHA256 of the file at `install_path`.
    ///
    /// Called immediately after the artifact is deployed.
    pub fn capture(&self, name: &str, install_path: &Path) -> Result<String, TrustError> {
        let bytes = crate::fs::read_or(install_path, || TrustError::MissingArtifact {
            path: install_path.to_path_buf(),
        })?;
        let hash = compute_content_hash(&bytes);
        audit::log_integrity_captured(name, install_path, &hash);
        Ok(hash)
    }

    /// Captures the hash of the named unit and stores it in the manifest.
    ///
    /// The manifest must be re-signed afterwards.
    pub fn record(
        &self,
        manifest: &mut InstallManifest,
        name: &str,
        install_path: &Path,
    ) -> Result<String, TrustError> {
        let entry = manifest
            .unit_mut(name)
            .ok_or_else(|| TrustError::MissingArtifact {
                path: install_path.to_path_buf(),
            })?;
        let hash = self.capture(name, install_path)?;
        entry.install_path = install_path.to_path_buf();
        entry.sha256_hash = Some(hash.clone());
        Ok(hash)
    }

    /// Recomputes and compares the hash of every entry.
    ///
    /// Returns one violation per failing entry; an empty result means every
    /// entry matched. An empty `entries` slice yields a single
    /// [`ViolationKind::NoEntries`] violation, never a pass.
    pub fn recheck(&self, entries: &[ManifestEntry]) -> Vec<Violation> {
        let violations: Vec<Violation> = if entries.is_empty() {
            vec![Violation {
                name: UNIT_LIST.to_string(),
                install_path: PathBuf::new(),
                kind: ViolationKind::NoEntries,
            }]
        } else {
            entries
                .iter()
                .filter_map(|entry| self.recheck_entry(entry))
                .collect()
        };
        violations
            .into_iter()
            .inspect(|violation| {
                audit::log_integrity_violation(
                    &violation.name,
                    &violation.install_path,
                    violation.kind.as_str(),
                )
            })
            .collect()
    }

    fn recheck_entry(&self, entry: &ManifestEntry) -> Option<Violation> {
        let violation = |kind| Violation {
            name: entry.name.clone(),
            install_path: entry.install_path.clone(),
            kind,
        };

        let bytes = match std::fs::read(&entry.install_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Some(violation(ViolationKind::MissingFile))
            }
            Err(e) => {
                return Some(violation(ViolationKind::Unreadable {
                    reason: e.to_string(),
                }))
            }
        };

        let expected = match entry.sha256_hash.as_deref() {
            Some(hash) if !hash.is_empty() => hash.to_ascii_lowercase(),
            _ => return Some(violation(ViolationKind::HashAbsent)),
        };

        let actual = compute_content_hash(&bytes);
        if bool::from(expected.as_bytes().ct_eq(actual.as_bytes())) {
            None
        } else {
            Some(violation(ViolationKind::HashMismatch { expected, actual }))
        }
    }
}
