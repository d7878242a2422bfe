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

//! The install manifest.
//!
//! The manifest records every deployed module and systemd unit. It is signed
//! as a whole, so the per-unit content hashes it carries are attested
//! indirectly through the manifest signature.

use crate::error::TrustError;
use crate::security::permissions::MANIFEST_MODE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A deployed artifact whose integrity is checked by content hash only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub name: String,
    pub module: String,
    pub install_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// SHA256 hex of the installed file; `null` until the unit is installed.
    #[serde(default)]
    pub sha256_hash: Option<String>,
}

impl ManifestEntry {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        install_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            install_path: install_path.into(),
            source_path: None,
            sha256_hash: None,
        }
    }
}

/// A deployed module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<u32>,
}

/// The install manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_version: Option<String>,
    /// Set once the database schema has been applied.
    #[serde(default)]
    pub db_initialized: bool,
    #[serde(default)]
    pub enabled_modules: Vec<String>,
    pub modules: BTreeMap<String, ModuleRecord>,
    pub systemd_units: Vec<ManifestEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_paths: BTreeMap<String, PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<String, u16>,
}

impl InstallManifest {
    pub fn new() -> Self {
        Self {
            install_timestamp: None,
            installer_version: None,
            db_initialized: false,
            enabled_modules: Vec::new(),
            modules: BTreeMap::new(),
            systemd_units: Vec::new(),
            binaries: Vec::new(),
            config_paths: BTreeMap::new(),
            ports: BTreeMap::new(),
        }
    }

    /// Parses an unverified manifest.
    ///
    /// Only the producer of the manifest should call this; consumers obtain
    /// the manifest through verification.
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self, TrustError> {
        serde_json::from_slice(bytes).map_err(|e| TrustError::CanonicalizationError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Pretty JSON for the on-disk file. The signature covers the canonical
    /// form, not this layout.
    pub fn to_pretty_json(&self, path: &Path) -> Result<Vec<u8>, TrustError> {
        let mut bytes =
            serde_json::to_vec_pretty(self).map_err(|e| TrustError::CanonicalizationError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Atomically rewrites the manifest file. Any existing signature no
    /// longer matches until the manifest is re-signed.
    pub fn write(&self, path: &Path) -> Result<(), TrustError> {
        let bytes = self.to_pretty_json(path)?;
        crate::fs::write_atomic(path, &bytes, MANIFEST_MODE)
    }

    pub fn unit(&self, name: &str) -> Option<&ManifestEntry> {
        self.systemd_units.iter().find(|entry| entry.name == name)
    }

    pub fn unit_mut(&mut self, name: &str) -> Option<&mut ManifestEntry> {
        self.systemd_units
            .iter_mut()
            .find(|entry| entry.name == name)
    }
}

impl Default for InstallManifest {
    fn default() -> Self {
        Self::new()
    }
}
