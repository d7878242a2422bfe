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

//! Collaborators consulted before an install state is drafted.

use crate::crypto::compute_content_hash;
use crate::error::TrustError;
use crate::install_state::state::DbMode;
use crate::manifest::InstallManifest;
use crate::security::permissions::{check_mode, DB_ENV_MODE};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

const REQUIRED_DB_KEYS: [&str; 6] = [
    "DB_HOST", "DB_PORT", "DB_NAME", "DB_USER", "DB_PASS", "DB_MODE",
];

/// Complete database connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseParameters {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    password: String,
    pub mode: DbMode,
}

impl DatabaseParameters {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        mode: DbMode,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            name: name.into(),
            user: user.into(),
            password: password.into(),
            mode,
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for DatabaseParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Supplies database connection parameters. Partial configuration is an error.
pub trait DatabaseProbe: Send + Sync {
    fn probe(&self) -> Result<DatabaseParameters, TrustError>;
}

/// Reads a `KEY=VALUE` env file.
pub struct DbEnvFileProbe {
    path: PathBuf,
}

impl DbEnvFileProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<DatabaseParameters, TrustError> {
        let failed = |reason: String| TrustError::PrerequisiteFailed { reason };

        let mut values = HashMap::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                failed(format!(
                    "{}:{}: expected KEY=VALUE",
                    self.path.display(),
                    index + 1
                ))
            })?;
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            values.insert(key.trim().to_string(), value.to_string());
        }

        let missing: Vec<&str> = REQUIRED_DB_KEYS
            .into_iter()
            .filter(|key| values.get(*key).map_or(true, |v| v.is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(failed(format!(
                "{} is missing {}",
                self.path.display(),
                missing.join(", ")
            )));
        }

        let port = values["DB_PORT"]
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| failed(format!("invalid DB_PORT '{}'", values["DB_PORT"])))?;
        let mode = values["DB_MODE"].parse::<DbMode>().map_err(failed)?;

        Ok(DatabaseParameters::new(
            &values["DB_HOST"],
            port,
            &values["DB_NAME"],
            &values["DB_USER"],
            &values["DB_PASS"],
            mode,
        ))
    }
}

impl DatabaseProbe for DbEnvFileProbe {
    fn probe(&self) -> Result<DatabaseParameters, TrustError> {
        let bytes = crate::fs::read_or(&self.path, || TrustError::PrerequisiteFailed {
            reason: format!("database env file not found: {}", self.path.display()),
        })?;
        let content = String::from_utf8(bytes).map_err(|_| TrustError::PrerequisiteFailed {
            reason: format!("{} is not valid UTF-8", self.path.display()),
        })?;

        // Credentials file; the warning is logged by check_mode.
        check_mode(&self.path, DB_ENV_MODE);
        self.parse(&content)
    }
}

/// Decides which modules are recorded as enabled.
pub trait ModuleDiscovery: Send + Sync {
    fn enabled_modules(&self, manifest: &InstallManifest) -> Vec<String>;
}

/// Takes the enabled modules from the verified manifest.
///
/// Falls back to every installed module when the manifest lists none.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestModules;

impl ModuleDiscovery for ManifestModules {
    fn enabled_modules(&self, manifest: &InstallManifest) -> Vec<String> {
        if manifest.enabled_modules.is_empty() {
            manifest.modules.keys().cloned().collect()
        } else {
            manifest.enabled_modules.clone()
        }
    }
}

/// Identifies the account and host performing the installation.
pub trait InstallerIdentity: Send + Sync {
    /// SHA256 hex identifying the installer.
    fn identity_hash(&self) -> Result<String, TrustError>;
}

/// SHA256 of `uid|gid|hostname|arch`.
pub fn identity_hash(uid: u32, gid: u32, hostname: &str, arch: &str) -> String {
    compute_content_hash(format!("{}|{}|{}|{}", uid, gid, hostname, arch).as_bytes())
}

/// Identity of the current process on this host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostIdentity;

impl InstallerIdentity for HostIdentity {
    fn identity_hash(&self) -> Result<String, TrustError> {
        // SAFETY: getuid and getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        let hostname = hostname::get().map_err(|e| TrustError::PrerequisiteFailed {
            reason: format!("cannot determine hostname: {}", e),
        })?;

        Ok(identity_hash(
            uid,
            gid,
            &hostname.to_string_lossy(),
            std::env::consts::ARCH,
        ))
    }
}
