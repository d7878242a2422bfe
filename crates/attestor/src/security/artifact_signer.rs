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

//! Detached artifact signing.

use crate::crypto::{sign_bytes, Algorithm, SignatureEncoding};
use crate::error::TrustError;
use crate::fs;
use crate::security::artifact::{load_artifact, Artifact, SignatureClass};
use crate::security::audit;
use crate::security::key_manager::KeyPair;
use std::path::{Path, PathBuf};

/// A detached signature that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub algorithm: Algorithm,
    /// Decoded signature bytes.
    pub bytes: Vec<u8>,
    pub path: PathBuf,
    /// SHA256 hex of the bytes that were signed.
    pub content_hash: String,
    pub signer_fingerprint: String,
}

/// Trait for producing detached signatures.
pub trait ArtifactSigner: Send + Sync {
    /// Signs `artifact` with `keypair` and writes the signature to `signature_path`.
    ///
    /// The artifact itself is never modified.
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if the key pair's algorithm does not match the artifact class
    /// - `MissingArtifact` / `CanonicalizationError` if the artifact cannot be read
    /// - `SigningFailed` if the primitive fails or the signature would replace
    ///   the artifact
    /// - `Io` if the signature cannot be written; for evidentiary signatures
    ///   this includes an already existing signature file
    fn sign(
        &self,
        artifact: &Artifact,
        keypair: &KeyPair,
        signature_path: &Path,
    ) -> Result<Signature, TrustError>;
}

/// Encodes signature bytes for storage.
pub(crate) fn encode_signature(algorithm: Algorithm, bytes: &[u8]) -> Vec<u8> {
    match algorithm.signature_encoding() {
        SignatureEncoding::Raw => bytes.to_vec(),
        SignatureEncoding::Hex => hex::encode(bytes).into_bytes(),
    }
}

/// Writes detached signature files next to their artifacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileArtifactSigner;

impl FileArtifactSigner {
    pub fn new() -> Self {
        Self
    }

    fn sign_inner(
        &self,
        artifact: &Artifact,
        keypair: &KeyPair,
        signature_path: &Path,
    ) -> Result<Signature, TrustError> {
        let class = artifact.class();

        // 1. The key pair must belong to the artifact class
        if keypair.algorithm() != class.algorithm() {
            return Err(TrustError::InvalidKey {
                path: keypair.private_key_path().to_path_buf(),
                reason: format!(
                    "{} artifacts are signed with {}, not {}",
                    class,
                    class.algorithm(),
                    keypair.algorithm()
                ),
            });
        }
        if signature_path == artifact.path() {
            return Err(TrustError::SigningFailed {
                path: artifact.path().to_path_buf(),
                reason: "signature path would overwrite the artifact".to_string(),
            });
        }

        // 2. Canonical bytes for structured artifacts, raw bytes otherwise
        let loaded = load_artifact(artifact)?;

        // 3. Sign with the scheme of the key
        let bytes = sign_bytes(keypair.private_key(), &loaded.canonical).map_err(|e| {
            TrustError::SigningFailed {
                path: artifact.path().to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        // 4. Persist atomically with the mode of the signature class
        let encoded = encode_signature(keypair.algorithm(), &bytes);
        let signature_class = class.signature_class();
        match signature_class {
            SignatureClass::Evidentiary => {
                fs::write_create_once(signature_path, &encoded, signature_class.mode())?
            }
            SignatureClass::Replaceable => {
                fs::write_atomic(signature_path, &encoded, signature_class.mode())?
            }
        }

        audit::log_artifact_signed(
            artifact.path(),
            &loaded.content_hash,
            keypair.fingerprint(),
            signature_path,
        );

        Ok(Signature {
            algorithm: keypair.algorithm(),
            bytes,
            path: signature_path.to_path_buf(),
            content_hash: loaded.content_hash,
            signer_fingerprint: keypair.fingerprint().to_string(),
        })
    }
}

impl ArtifactSigner for FileArtifactSigner {
    fn sign(
        &self,
        artifact: &Artifact,
        keypair: &KeyPair,
        signature_path: &Path,
    ) -> Result<Signature, TrustError> {
        self.sign_inner(artifact, keypair, signature_path)
            .inspect_err(|e| audit::log_artifact_sign_failed(artifact.path(), &e.to_string()))
    }
}
