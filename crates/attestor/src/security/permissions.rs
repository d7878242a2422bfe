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

//! File permission invariants.
//!
//! A violated invariant is reported as a [`TrustError::PermissionViolation`]
//! warning and logged. It never blocks an otherwise valid operation.

use crate::error::TrustError;
use crate::fs;
use crate::security::audit;
use std::path::Path;

/// Private keys are readable by their owner only.
pub const PRIVATE_KEY_MODE: u32 = 0o600;
pub const PUBLIC_KEY_MODE: u32 = 0o644;
pub const MANIFEST_MODE: u32 = 0o644;
/// Final mode of the install-state document.
pub const FINALIZED_STATE_MODE: u32 = 0o444;
pub const EVIDENTIARY_SIGNATURE_MODE: u32 = 0o444;
pub const REPLACEABLE_SIGNATURE_MODE: u32 = 0o644;
/// The database env file holds credentials.
pub const DB_ENV_MODE: u32 = 0o600;

/// Compares the permission bits of `path` against `expected`.
///
/// Returns the warning when they differ. Files that cannot be inspected are
/// not reported here; whoever reads them reports the failure.
pub fn check_mode(path: &Path, expected: u32) -> Option<TrustError> {
    let actual = match fs::mode_of(path) {
        Ok(mode) => mode,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot inspect file mode");
            return None;
        }
    };

    if actual == expected {
        return None;
    }

    audit::log_permission_violation(path, expected, actual);
    Some(TrustError::PermissionViolation {
        path: path.to_path_buf(),
        expected,
        actual,
    })
}
