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

//! Fail-closed artifact verification.
//!
//! Verification runs a fixed sequence of steps and stops at the first
//! failure:
//!
//! 1. The artifact file exists
//! 2. The signature file exists
//! 3. The public key file exists
//! 4. The public key loads and is of the artifact class's algorithm
//! 5. The artifact is read and, if structured, canonicalized
//! 6. The signature is read, decoded and length-checked
//! 7. The signature is verified over the canonical bytes
//!
//! Only then is a [`Trusted`] value handed out. It carries the bytes that were
//! verified, so the caller never re-reads the file after the check. These are
//! hard failures - there is no warning-only mode and no default trust.

use crate::crypto::{verify_bytes, PublicKey, SignatureEncoding};
use crate::error::TrustError;
use crate::fs;
use crate::security::artifact::{load_artifact, Artifact};
use crate::security::audit;
use crate::security::key_manager::load_public_key;
use crate::security::permissions::{check_mode, PUBLIC_KEY_MODE};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Verified artifact content.
///
/// Can only be constructed by a successful verification.
#[derive(Debug)]
pub struct Trusted<T> {
    content: T,
    canonical_bytes: Vec<u8>,
    content_hash: String,
    signer_fingerprint: String,
    artifact_path: PathBuf,
    warnings: Vec<TrustError>,
}

impl<T> Trusted<T> {
    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn into_content(self) -> T {
        self.content
    }

    /// The exact bytes the signature was checked against.
    pub fn canonical_bytes(&self) -> &[u8] {
        &self.canonical_bytes
    }

    /// SHA256 hex of [`Trusted::canonical_bytes`].
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn signer_fingerprint(&self) -> &str {
        &self.signer_fingerprint
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Permission violations observed while verifying. Never blocking.
    pub fn warnings(&self) -> &[TrustError] {
        &self.warnings
    }

    /// Moves the permission warnings out, leaving none behind.
    pub fn take_warnings(&mut self) -> Vec<TrustError> {
        std::mem::take(&mut self.warnings)
    }
}

impl Trusted<Vec<u8>> {
    /// Parses the verified JSON into a typed document.
    ///
    /// # Errors
    ///
    /// `CanonicalizationError` if the verified content does not match `T`.
    pub fn into_document<T: DeserializeOwned>(self) -> Result<Trusted<T>, TrustError> {
        let content = serde_json::from_slice::<T>(&self.content).map_err(|e| {
            let err = TrustError::CanonicalizationError {
                path: self.artifact_path.clone(),
                reason: e.to_string(),
            };
            audit::log_verification_failure(&self.artifact_path, err.kind(), &err.to_string());
            err
        })?;

        Ok(Trusted {
            content,
            canonical_bytes: self.canonical_bytes,
            content_hash: self.content_hash,
            signer_fingerprint: self.signer_fingerprint,
            artifact_path: self.artifact_path,
            warnings: self.warnings,
        })
    }
}

/// Trait for artifact verifiers.
pub trait ArtifactVerifier: Send + Sync {
    /// Verifies `artifact` against a detached signature and public key.
    ///
    /// # Returns
    ///
    /// The verified raw artifact bytes wrapped in [`Trusted`].
    fn verify(
        &self,
        artifact: &Artifact,
        signature_path: &Path,
        public_key_path: &Path,
    ) -> Result<Trusted<Vec<u8>>, TrustError>;

    /// Verifies a structured artifact and parses it into `T`.
    fn verify_document<T: DeserializeOwned>(
        &self,
        artifact: &Artifact,
        signature_path: &Path,
        public_key_path: &Path,
    ) -> Result<Trusted<T>, TrustError>
    where
        Self: Sized,
    {
        self.verify(artifact, signature_path, public_key_path)?
            .into_document()
    }
}

fn read_signature(public_key: &PublicKey, path: &Path) -> Result<Vec<u8>, TrustError> {
    let malformed = |reason: String| TrustError::MalformedSignature {
        path: path.to_path_buf(),
        reason,
    };

    let stored = fs::read_or(path, || TrustError::MissingSignature {
        path: path.to_path_buf(),
    })?;

    let bytes = match public_key.algorithm().signature_encoding() {
        SignatureEncoding::Raw => stored,
        SignatureEncoding::Hex => {
            let text = std::str::from_utf8(&stored)
                .map_err(|_| malformed("hex signature is not UTF-8".to_string()))?;
            hex::decode(text.trim()).map_err(|e| malformed(format!("invalid hex: {}", e)))?
        }
    };

    let expected = public_key.signature_len();
    if bytes.len() != expected {
        return Err(malformed(format!(
            "expected {} bytes, got {}",
            expected,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Verifies detached signatures stored as files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileArtifactVerifier;

impl FileArtifactVerifier {
    pub fn new() -> Self {
        Self
    }

    fn verify_inner(
        &self,
        artifact: &Artifact,
        signature_path: &Path,
        public_key_path: &Path,
    ) -> Result<Trusted<Vec<u8>>, TrustError> {
        let class = artifact.class();

        // 1-3. Every input must exist before anything is read
        if !artifact.path().is_file() {
            return Err(TrustError::MissingArtifact {
                path: artifact.path().to_path_buf(),
            });
        }
        if !signature_path.is_file() {
            return Err(TrustError::MissingSignature {
                path: signature_path.to_path_buf(),
            });
        }
        if !public_key_path.is_file() {
            return Err(TrustError::MissingKey {
                path: public_key_path.to_path_buf(),
            });
        }

        // 4. Load and type-check the public key
        let public_key = load_public_key(class.algorithm(), public_key_path)?;

        // 5. Read the artifact once and canonicalize it
        let loaded = load_artifact(artifact)?;

        // 6. Read and decode the signature
        let signature = read_signature(&public_key, signature_path)?;

        // 7. Verify
        verify_bytes(&public_key, &loaded.canonical, &signature).map_err(|_| {
            TrustError::SignatureInvalid {
                path: artifact.path().to_path_buf(),
            }
        })?;

        let signer_fingerprint =
            public_key
                .fingerprint()
                .map_err(|e| TrustError::InvalidKey {
                    path: public_key_path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        let warnings = [
            check_mode(public_key_path, PUBLIC_KEY_MODE),
            check_mode(signature_path, class.signature_class().mode()),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(Trusted {
            content: loaded.raw,
            canonical_bytes: loaded.canonical,
            content_hash: loaded.content_hash,
            signer_fingerprint,
            artifact_path: artifact.path().to_path_buf(),
            warnings,
        })
    }
}

impl ArtifactVerifier for FileArtifactVerifier {
    fn verify(
        &self,
        artifact: &Artifact,
        signature_path: &Path,
        public_key_path: &Path,
    ) -> Result<Trusted<Vec<u8>>, TrustError> {
        match self.verify_inner(artifact, signature_path, public_key_path) {
            Ok(trusted) => {
                audit::log_verification_success(
                    trusted.artifact_path(),
                    trusted.content_hash(),
                    trusted.signer_fingerprint(),
                );
                Ok(trusted)
            }
            Err(e) => {
                audit::log_verification_failure(artifact.path(), e.kind(), &e.to_string());
                Err(e)
            }
        }
    }
}
