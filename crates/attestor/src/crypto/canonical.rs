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

//! Deterministic JSON canonicalization (RFC 8785).
//!
//! Signer and verifier both hash the output of [`canonicalize`], so the same
//! logical document always produces the same bytes regardless of key order
//! or whitespace in the file it was read from.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Failed to serialize canonical form: {0}")]
    Serialization(String),
}

/// Serializes `value` with sorted keys and no insignificant whitespace.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    serde_jcs::to_vec(value).map_err(|e| CanonicalError::Serialization(e.to_string()))
}

/// Parses raw JSON and returns its canonical bytes.
pub fn canonicalize_json_bytes(raw: &[u8]) -> Result<Vec<u8>, CanonicalError> {
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| CanonicalError::InvalidJson(e.to_string()))?;
    canonicalize(&value)
}
