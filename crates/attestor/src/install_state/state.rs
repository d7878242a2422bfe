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

//! The install-state document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version written into every new install state.
pub const STATE_VERSION: &str = "1.0";

/// Database deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbMode {
    Standalone,
    Ha,
}

impl fmt::Display for DbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbMode::Standalone => f.write_str("standalone"),
            DbMode::Ha => f.write_str("ha"),
        }
    }
}

impl FromStr for DbMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(DbMode::Standalone),
            "ha" => Ok(DbMode::Ha),
            other => Err(format!(
                "invalid database mode '{}' (expected standalone or ha)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbSection {
    pub enabled: bool,
    pub mode: DbMode,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub schema_applied: bool,
    pub schema_signature_verified: bool,
}

/// Signed record of a completed installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallState {
    pub state_version: String,
    /// RFC 3339, UTC.
    pub install_timestamp: String,
    pub db: DbSection,
    pub enabled_modules: Vec<String>,
    /// SHA256 of the canonical install manifest.
    pub manifest_hash: String,
    pub installer_identity_hash: String,
    pub signer_fingerprint: String,
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

impl InstallState {
    /// Lists every way this document falls short of a finalized install.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.state_version != STATE_VERSION {
            problems.push(format!(
                "unsupported state_version '{}'",
                self.state_version
            ));
        }
        if chrono::DateTime::parse_from_rfc3339(&self.install_timestamp).is_err() {
            problems.push("install_timestamp is not RFC 3339".to_string());
        }
        if !self.db.enabled {
            problems.push("db.enabled must be true".to_string());
        }
        if !self.db.schema_applied {
            problems.push("db.schema_applied must be true".to_string());
        }
        if !self.db.schema_signature_verified {
            problems.push("db.schema_signature_verified must be true".to_string());
        }
        if self.db.host.trim().is_empty() {
            problems.push("db.host is empty".to_string());
        }
        if self.db.port == 0 {
            problems.push("db.port is zero".to_string());
        }
        if self.db.name.trim().is_empty() {
            problems.push("db.name is empty".to_string());
        }
        for (field, value) in [
            ("manifest_hash", &self.manifest_hash),
            ("installer_identity_hash", &self.installer_identity_hash),
            ("signer_fingerprint", &self.signer_fingerprint),
        ] {
            if !is_sha256_hex(value) {
                problems.push(format!("{} is not a SHA256 hex digest", field));
            }
        }

        problems
    }
}
