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

//! Key pair management.
//!
//! Key pairs are created lazily, at most once per algorithm, and reused on
//! every subsequent run. An existing key that cannot be read or holds the
//! wrong key type is a hard error; it is never silently regenerated.

use crate::config::{KeyOwner, TrustConfig};
use crate::crypto::{
    decode_private_key_pem, decode_public_key_pem, encode_private_key_pem, encode_public_key_pem,
    generate_private_key, Algorithm, PrivateKey, PublicKey,
};
use crate::error::TrustError;
use crate::fs;
use crate::security::audit;
use crate::security::permissions::{check_mode, PRIVATE_KEY_MODE, PUBLIC_KEY_MODE};
use std::fmt;
use std::path::{Path, PathBuf};

/// A loaded key pair together with where it lives on disk.
pub struct KeyPair {
    algorithm: Algorithm,
    private_key: PrivateKey,
    public_key: PublicKey,
    fingerprint: String,
    private_key_path: PathBuf,
    public_key_path: PathBuf,
    warnings: Vec<TrustError>,
}

impl KeyPair {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// SHA256 hex fingerprint of the raw public key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    /// Permission violations found on the key files when they were reused.
    pub fn warnings(&self) -> &[TrustError] {
        &self.warnings
    }

    /// Moves the permission warnings out, leaving none behind.
    pub fn take_warnings(&mut self) -> Vec<TrustError> {
        std::mem::take(&mut self.warnings)
    }

    pub(crate) fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("fingerprint", &self.fingerprint)
            .field("private_key", &"<redacted>")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .finish()
    }
}

/// Trait for key pair storage backends.
pub trait KeyManager: Send + Sync {
    /// Loads the key pair for `algorithm`, generating it if neither file exists.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - Which key pair to ensure
    ///
    /// # Returns
    ///
    /// The key pair. Calling this again returns the same key pair without
    /// touching the files.
    fn ensure_keypair(&self, algorithm: Algorithm) -> Result<KeyPair, TrustError>;

    /// Loads an existing key pair without ever generating one.
    fn load_keypair(&self, algorithm: Algorithm) -> Result<KeyPair, TrustError>;

    fn private_key_path(&self, algorithm: Algorithm) -> PathBuf;

    fn public_key_path(&self, algorithm: Algorithm) -> PathBuf;
}

fn read_pem(path: &Path) -> Result<String, TrustError> {
    let bytes = fs::read_or(path, || TrustError::MissingKey {
        path: path.to_path_buf(),
    })?;
    String::from_utf8(bytes).map_err(|_| TrustError::InvalidKey {
        path: path.to_path_buf(),
        reason: "key file is not valid UTF-8 PEM".to_string(),
    })
}

/// Loads a public key file, requiring it to hold a key of `algorithm`.
pub fn load_public_key(algorithm: Algorithm, path: &Path) -> Result<PublicKey, TrustError> {
    let pem = read_pem(path)?;
    decode_public_key_pem(algorithm, &pem).map_err(|e| TrustError::InvalidKey {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn load_private_key(algorithm: Algorithm, path: &Path) -> Result<PrivateKey, TrustError> {
    let pem = read_pem(path)?;
    decode_private_key_pem(algorithm, &pem).map_err(|e| TrustError::InvalidKey {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Key pairs stored as PEM files in a single directory.
///
/// Each algorithm owns `<stem>.key` (PKCS8, 0600) and `<stem>.pub`
/// (SubjectPublicKeyInfo, 0644).
pub struct FileKeyManager {
    config: TrustConfig,
}

impl FileKeyManager {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        let mut config = TrustConfig::default();
        config.key_dir = key_dir.into();
        Self { config }
    }

    pub fn from_config(config: &TrustConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn with_rsa_key_bits(mut self, bits: usize) -> Self {
        self.config.rsa_key_bits = bits;
        self
    }

    pub fn with_key_owner(mut self, owner: KeyOwner) -> Self {
        self.config.key_owner = Some(owner);
        self
    }

    fn generate(&self, algorithm: Algorithm) -> Result<KeyPair, TrustError> {
        let private_key_path = self.private_key_path(algorithm);
        let public_key_path = self.public_key_path(algorithm);

        let key_generation = |e: crate::crypto::SigningError| TrustError::KeyGeneration {
            reason: e.to_string(),
        };
        let private_key =
            generate_private_key(algorithm, self.config.rsa_key_bits).map_err(key_generation)?;
        let public_key = private_key.public_key();
        let private_pem = encode_private_key_pem(&private_key).map_err(key_generation)?;
        let public_pem = encode_public_key_pem(&public_key).map_err(key_generation)?;
        let fingerprint = public_key.fingerprint().map_err(key_generation)?;

        fs::write_atomic(&private_key_path, private_pem.as_bytes(), PRIVATE_KEY_MODE)?;
        if let Some(owner) = self.config.key_owner {
            std::os::unix::fs::chown(&private_key_path, Some(owner.uid), Some(owner.gid))
                .map_err(|e| TrustError::io(&private_key_path, e))?;
        }
        fs::write_atomic(&public_key_path, public_pem.as_bytes(), PUBLIC_KEY_MODE)?;

        audit::log_key_generated(algorithm.as_str(), &fingerprint, &private_key_path);

        Ok(KeyPair {
            algorithm,
            private_key,
            public_key,
            fingerprint,
            private_key_path,
            public_key_path,
            warnings: Vec::new(),
        })
    }

    fn load(&self, algorithm: Algorithm) -> Result<KeyPair, TrustError> {
        let private_key_path = self.private_key_path(algorithm);
        let public_key_path = self.public_key_path(algorithm);

        let private_key = load_private_key(algorithm, &private_key_path)?;
        let public_key = load_public_key(algorithm, &public_key_path)?;

        if private_key.public_key() != public_key {
            return Err(TrustError::InvalidKey {
                path: public_key_path,
                reason: "public key does not match the private key".to_string(),
            });
        }

        let fingerprint = public_key
            .fingerprint()
            .map_err(|e| TrustError::InvalidKey {
                path: public_key_path.clone(),
                reason: e.to_string(),
            })?;

        Ok(KeyPair {
            algorithm,
            private_key,
            public_key,
            fingerprint,
            private_key_path,
            public_key_path,
            warnings: Vec::new(),
        })
    }
}

impl KeyManager for FileKeyManager {
    fn ensure_keypair(&self, algorithm: Algorithm) -> Result<KeyPair, TrustError> {
        let private_key_path = self.private_key_path(algorithm);
        let public_key_path = self.public_key_path(algorithm);

        match (private_key_path.exists(), public_key_path.exists()) {
            (true, true) => {
                let mut keypair = self.load_keypair(algorithm)?;
                keypair.warnings.extend(
                    [
                        check_mode(&private_key_path, PRIVATE_KEY_MODE),
                        check_mode(&public_key_path, PUBLIC_KEY_MODE),
                    ]
                    .into_iter()
                    .flatten(),
                );
                audit::log_key_reused(algorithm.as_str(), keypair.fingerprint());
                Ok(keypair)
            }
            (false, false) => self.generate(algorithm).inspect_err(|e| {
                audit::log_key_load_failed(&private_key_path, &e.to_string());
            }),
            (true, false) | (false, true) => {
                let missing = if private_key_path.exists() {
                    public_key_path
                } else {
                    private_key_path
                };
                let err = TrustError::InvalidKey {
                    path: missing,
                    reason: "incomplete key pair; refusing to regenerate over a half-present pair"
                        .to_string(),
                };
                audit::log_key_load_failed(&self.config.key_dir, &err.to_string());
                Err(err)
            }
        }
    }

    fn load_keypair(&self, algorithm: Algorithm) -> Result<KeyPair, TrustError> {
        self.load(algorithm).inspect_err(|e| {
            audit::log_key_load_failed(&self.private_key_path(algorithm), &e.to_string());
        })
    }

    fn private_key_path(&self, algorithm: Algorithm) -> PathBuf {
        self.config.private_key_path(algorithm)
    }

    fn public_key_path(&self, algorithm: Algorithm) -> PathBuf {
        self.config.public_key_path(algorithm)
    }
}
