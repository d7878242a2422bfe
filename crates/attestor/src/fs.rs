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

//! Atomic file writes.
//!
//! Every artifact, key and signature is written to a temporary file in the
//! destination directory, synced, renamed into place and only then exposed.
//! Readers never observe a partially written file.

use crate::error::TrustError;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::NamedTempFile;

fn stage(path: &Path, bytes: &[u8], mode: u32) -> Result<NamedTempFile, TrustError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| TrustError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| TrustError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| TrustError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| TrustError::io(path, e))?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))
        .map_err(|e| TrustError::io(path, e))?;
    Ok(tmp)
}

/// Atomically replaces `path` with `bytes`, leaving it at `mode`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], mode: u32) -> Result<(), TrustError> {
    let tmp = stage(path, bytes, mode)?;
    tmp.persist(path).map_err(|e| TrustError::io(path, e.error))?;
    set_mode(path, mode)
}

/// Atomically creates `path`; fails with `AlreadyExists` if it is present.
///
/// Two racing writers cannot both succeed.
pub(crate) fn write_create_once(path: &Path, bytes: &[u8], mode: u32) -> Result<(), TrustError> {
    let tmp = stage(path, bytes, mode)?;
    tmp.persist_noclobber(path)
        .map_err(|e| TrustError::io(path, e.error))?;
    set_mode(path, mode)
}

pub(crate) fn set_mode(path: &Path, mode: u32) -> Result<(), TrustError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| TrustError::io(path, e))
}

/// Reads a file, mapping "not found" to the caller-supplied error.
pub(crate) fn read_or(
    path: &Path,
    missing: impl FnOnce() -> TrustError,
) -> Result<Vec<u8>, TrustError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(missing()),
        Err(e) => Err(TrustError::io(path, e)),
    }
}

pub(crate) fn mode_of(path: &Path) -> std::io::Result<u32> {
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}
