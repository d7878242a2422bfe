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

//! Signing primitives.
//!
//! Two schemes are supported and they are not interchangeable:
//! - Ed25519 signs the message bytes directly (the algorithm hashes internally).
//! - RSA-PSS signs an explicit SHA256 digest of the message, padded with
//!   MGF1-SHA256 and the maximum salt length allowed by the modulus.

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rsa::pkcs8::EncodePublicKey as _;
use rsa::signature::{RandomizedSigner as _, SignatureEncoding as _};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an Ed25519 signature in bytes.
pub const ED25519_SIGNATURE_LEN: usize = 64;

const SHA256_LEN: usize = 32;

/// Errors that can occur in the signing primitives.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Key algorithm mismatch: expected {expected}, got {actual}")]
    AlgorithmMismatch {
        expected: Algorithm,
        actual: Algorithm,
    },

    #[error("Invalid signature: expected {expected} bytes, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    #[error("Failed to generate key: {0}")]
    KeyGenerationFailed(String),

    #[error("Failed to encode key: {0}")]
    KeyEncodingFailed(String),

    #[error("Failed to decode key: {0}")]
    KeyDecodingFailed(String),

    #[error("Failed to create signature: {0}")]
    SignatureFailed(String),

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Ed25519 over the canonical bytes.
    Ed25519,
    /// RSA-PSS with MGF1-SHA256 and maximum salt, over a SHA256 digest.
    RsaPssSha256,
}

/// How a signature is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    /// The raw signature bytes.
    Raw,
    /// Lowercase hex text.
    Hex,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "ed25519",
            Algorithm::RsaPssSha256 => "rsa-pss-sha256",
        }
    }

    /// File stem used for this algorithm's key pair inside the key directory.
    pub fn key_file_stem(&self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "manifest_signing",
            Algorithm::RsaPssSha256 => "model_signing",
        }
    }

    pub fn signature_encoding(&self) -> SignatureEncoding {
        match self {
            Algorithm::Ed25519 => SignatureEncoding::Raw,
            Algorithm::RsaPssSha256 => SignatureEncoding::Hex,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Algorithm::Ed25519),
            "rsa" | "rsa-pss" | "rsa-pss-sha256" => Ok(Algorithm::RsaPssSha256),
            other => Err(format!(
                "unknown algorithm '{}' (expected ed25519 or rsa-pss-sha256)",
                other
            )),
        }
    }
}

/// A private signing key.
pub enum PrivateKey {
    Ed25519(SigningKey),
    Rsa(Box<RsaPrivateKey>),
}

impl PrivateKey {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PrivateKey::Ed25519(_) => Algorithm::Ed25519,
            PrivateKey::Rsa(_) => Algorithm::RsaPssSha256,
        }
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            PrivateKey::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, <redacted>)", self.algorithm())
    }
}

/// A public verification key.
#[derive(Clone, PartialEq)]
pub enum PublicKey {
    Ed25519(VerifyingKey),
    Rsa(RsaPublicKey),
}

impl PublicKey {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PublicKey::Ed25519(_) => Algorithm::Ed25519,
            PublicKey::Rsa(_) => Algorithm::RsaPssSha256,
        }
    }

    /// The raw bytes the fingerprint is computed over.
    ///
    /// The 32-byte point for Ed25519, the SubjectPublicKeyInfo DER for RSA.
    pub fn raw_bytes(&self) -> Result<Vec<u8>, SigningError> {
        match self {
            PublicKey::Ed25519(key) => Ok(key.to_bytes().to_vec()),
            PublicKey::Rsa(key) => key
                .to_public_key_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| SigningError::KeyEncodingFailed(e.to_string())),
        }
    }

    /// Length of every valid signature made by the matching private key.
    pub fn signature_len(&self) -> usize {
        match self {
            PublicKey::Ed25519(_) => ED25519_SIGNATURE_LEN,
            PublicKey::Rsa(key) => key.size(),
        }
    }

    /// SHA256 hex fingerprint of [`PublicKey::raw_bytes`].
    pub fn fingerprint(&self) -> Result<String, SigningError> {
        Ok(compute_key_fingerprint(&self.raw_bytes()?))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fingerprint = self
            .fingerprint()
            .unwrap_or_else(|_| "<unencodable>".to_string());
        write!(f, "PublicKey({}, {})", self.algorithm(), fingerprint)
    }
}

/// Generates a new private key.
///
/// # Arguments
///
/// * `algorithm` - The algorithm to generate a key for
/// * `rsa_key_bits` - Modulus size, only used for RSA
pub fn generate_private_key(
    algorithm: Algorithm,
    rsa_key_bits: usize,
) -> Result<PrivateKey, SigningError> {
    let mut csprng = rand::thread_rng();
    match algorithm {
        Algorithm::Ed25519 => Ok(PrivateKey::Ed25519(SigningKey::generate(&mut csprng))),
        Algorithm::RsaPssSha256 => RsaPrivateKey::new(&mut csprng, rsa_key_bits)
            .map(|key| PrivateKey::Rsa(Box::new(key)))
            .map_err(|e| SigningError::KeyGenerationFailed(e.to_string())),
    }
}

/// Computes the SHA256 hex fingerprint of raw public key bytes.
///
/// # Returns
///
/// A 64-character lowercase hex string.
pub fn compute_key_fingerprint(public_key: &[u8]) -> String {
    compute_content_hash(public_key)
}

/// Computes the SHA256 hex digest of arbitrary content.
pub fn compute_content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Largest PSS salt the key's modulus admits with a SHA256 digest.
///
/// Matches the `MAX_LENGTH` salt of common PSS implementations:
/// `ceil((modBits - 1) / 8) - hLen - 2`.
pub fn rsa_pss_max_salt_len(key: &RsaPublicKey) -> usize {
    let em_bits = key.n().bits().saturating_sub(1);
    let em_len = em_bits.div_ceil(8);
    em_len.saturating_sub(SHA256_LEN + 2)
}

/// Signs `message` with the scheme belonging to the key.
///
/// For RSA the message is first reduced to its SHA256 digest, which is then
/// signed with PSS.
pub fn sign_bytes(private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, SigningError> {
    match private_key {
        PrivateKey::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
        PrivateKey::Rsa(key) => {
            let digest = Sha256::digest(message);
            let salt_len = rsa_pss_max_salt_len(&key.to_public_key());
            let signing_key =
                rsa::pss::BlindedSigningKey::<Sha256>::new_with_salt_len((**key).clone(), salt_len);
            let signature = signing_key
                .try_sign_with_rng(&mut rand::thread_rng(), &digest)
                .map_err(|e| SigningError::SignatureFailed(e.to_string()))?;
            Ok(signature.to_vec())
        }
    }
}

/// Verifies `signature` over `message` with the scheme belonging to the key.
///
/// # Errors
///
/// `InvalidSignatureLength` for a wrongly sized signature, otherwise
/// `VerificationFailed`. No error is ever reinterpreted as success.
pub fn verify_bytes(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SigningError> {
    match public_key {
        PublicKey::Ed25519(key) => {
            let sig_bytes: [u8; ED25519_SIGNATURE_LEN] =
                signature
                    .try_into()
                    .map_err(|_| SigningError::InvalidSignatureLength {
                        expected: ED25519_SIGNATURE_LEN,
                        actual: signature.len(),
                    })?;
            let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
            key.verify(message, &sig)
                .map_err(|_| SigningError::VerificationFailed)
        }
        PublicKey::Rsa(key) => {
            if signature.len() != key.size() {
                return Err(SigningError::InvalidSignatureLength {
                    expected: key.size(),
                    actual: signature.len(),
                });
            }
            let digest = Sha256::digest(message);
            let salt_len = rsa_pss_max_salt_len(key);
            let verifying_key =
                rsa::pss::VerifyingKey::<Sha256>::new_with_salt_len(key.clone(), salt_len);
            let sig = rsa::pss::Signature::try_from(signature)
                .map_err(|_| SigningError::VerificationFailed)?;
            verifying_key
                .verify(&digest, &sig)
                .map_err(|_| SigningError::VerificationFailed)
        }
    }
}
