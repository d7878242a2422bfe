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

use crate::config::defaults::DEFAULT_RSA_KEY_BITS;
use crate::crypto::Algorithm;
use crate::security::ArtifactClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// System account that owns the private keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOwner {
    pub uid: u32,
    pub gid: u32,
}

/// Locations and parameters for every attested artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Directory holding `<stem>.key` / `<stem>.pub` pairs.
    pub key_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest_signature_path: PathBuf,
    pub state_path: PathBuf,
    pub state_signature_path: PathBuf,
    pub schema_path: PathBuf,
    pub schema_signature_path: PathBuf,
    /// `KEY=VALUE` database connection file.
    pub db_env_path: PathBuf,
    pub model_manifest_path: PathBuf,
    pub model_manifest_signature_path: PathBuf,
    pub rsa_key_bits: usize,
    /// When set, private keys are chowned to this account after generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_owner: Option<KeyOwner>,
}

impl TrustConfig {
    /// Builds a configuration with every path placed under `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            key_dir: root.join("keys"),
            manifest_path: root.join("install_manifest.json"),
            manifest_signature_path: root.join("install_manifest.json.sig"),
            state_path: root.join("install_state.json"),
            state_signature_path: root.join("install_state.json.sig"),
            schema_path: root.join("db").join("schema.sql"),
            schema_signature_path: root.join("db").join("schema.sql.sig"),
            db_env_path: root.join("db").join("db.env"),
            model_manifest_path: root.join("models").join("models_manifest.json"),
            model_manifest_signature_path: root.join("models").join("models_manifest.json.sig"),
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            key_owner: None,
        }
    }

    pub fn with_rsa_key_bits(mut self, bits: usize) -> Self {
        self.rsa_key_bits = bits;
        self
    }

    pub fn with_key_owner(mut self, owner: KeyOwner) -> Self {
        self.key_owner = Some(owner);
        self
    }

    pub fn private_key_path(&self, algorithm: Algorithm) -> PathBuf {
        self.key_dir
            .join(format!("{}.key", algorithm.key_file_stem()))
    }

    pub fn public_key_path(&self, algorithm: Algorithm) -> PathBuf {
        self.key_dir
            .join(format!("{}.pub", algorithm.key_file_stem()))
    }

    /// Configured artifact path for a class.
    pub fn artifact_path(&self, class: ArtifactClass) -> &Path {
        match class {
            ArtifactClass::InstallManifest => &self.manifest_path,
            ArtifactClass::InstallState => &self.state_path,
            ArtifactClass::DatabaseSchema => &self.schema_path,
            ArtifactClass::ModelManifest => &self.model_manifest_path,
        }
    }

    /// Configured detached signature path for a class.
    pub fn signature_path(&self, class: ArtifactClass) -> &Path {
        match class {
            ArtifactClass::InstallManifest => &self.manifest_signature_path,
            ArtifactClass::InstallState => &self.state_signature_path,
            ArtifactClass::DatabaseSchema => &self.schema_signature_path,
            ArtifactClass::ModelManifest => &self.model_manifest_signature_path,
        }
    }
}
