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

//! PEM encoding for key files.
//!
//! Private keys are unencrypted PKCS8 (`PRIVATE KEY`), public keys are
//! SubjectPublicKeyInfo (`PUBLIC KEY`). Decoding is type-checked: a PEM
//! holding a key of another algorithm is rejected rather than reinterpreted.

use super::signing::{Algorithm, PrivateKey, PublicKey, SigningError};
use ed25519_dalek::pkcs8::{
    DecodePrivateKey as _, DecodePublicKey as _, EncodePrivateKey as _, EncodePublicKey as _,
};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// PEM tag for PKCS8 private keys.
pub const PRIVATE_KEY_PEM_TAG: &str = "PRIVATE KEY";

/// PEM tag for SubjectPublicKeyInfo public keys.
pub const PUBLIC_KEY_PEM_TAG: &str = "PUBLIC KEY";

fn parse_tagged(pem_str: &str, expected_tag: &str) -> Result<Vec<u8>, SigningError> {
    let parsed =
        pem::parse(pem_str).map_err(|e| SigningError::KeyDecodingFailed(e.to_string()))?;
    if parsed.tag() != expected_tag {
        return Err(SigningError::KeyDecodingFailed(format!(
            "expected PEM tag '{}', got '{}'",
            expected_tag,
            parsed.tag()
        )));
    }
    Ok(parsed.into_contents())
}

/// Encodes a private key as an unencrypted PKCS8 PEM string.
pub fn encode_private_key_pem(key: &PrivateKey) -> Result<String, SigningError> {
    let der = match key {
        PrivateKey::Ed25519(key) => key.to_pkcs8_der(),
        PrivateKey::Rsa(key) => key.to_pkcs8_der(),
    }
    .map_err(|e| SigningError::KeyEncodingFailed(e.to_string()))?;

    let pem = pem::Pem::new(PRIVATE_KEY_PEM_TAG, der.as_bytes().to_vec());
    Ok(pem::encode(&pem))
}

/// Decodes a PKCS8 PEM private key, requiring it to be of `algorithm`.
pub fn decode_private_key_pem(
    algorithm: Algorithm,
    pem_str: &str,
) -> Result<PrivateKey, SigningError> {
    let der = parse_tagged(pem_str, PRIVATE_KEY_PEM_TAG)?;
    let decoded = match algorithm {
        Algorithm::Ed25519 => SigningKey::from_pkcs8_der(&der)
            .map(PrivateKey::Ed25519)
            .map_err(|e| e.to_string()),
        Algorithm::RsaPssSha256 => RsaPrivateKey::from_pkcs8_der(&der)
            .map(|key| PrivateKey::Rsa(Box::new(key)))
            .map_err(|e| e.to_string()),
    };
    decoded.map_err(|reason| {
        SigningError::KeyDecodingFailed(format!(
            "not a valid {} private key: {}",
            algorithm, reason
        ))
    })
}

/// Encodes a public key as a SubjectPublicKeyInfo PEM string.
pub fn encode_public_key_pem(key: &PublicKey) -> Result<String, SigningError> {
    let der = match key {
        PublicKey::Ed25519(key) => key.to_public_key_der(),
        PublicKey::Rsa(key) => key.to_public_key_der(),
    }
    .map_err(|e| SigningError::KeyEncodingFailed(e.to_string()))?;

    let pem = pem::Pem::new(PUBLIC_KEY_PEM_TAG, der.as_bytes().to_vec());
    Ok(pem::encode(&pem))
}

/// Decodes a SubjectPublicKeyInfo PEM public key, requiring it to be of `algorithm`.
pub fn decode_public_key_pem(
    algorithm: Algorithm,
    pem_str: &str,
) -> Result<PublicKey, SigningError> {
    let der = parse_tagged(pem_str, PUBLIC_KEY_PEM_TAG)?;
    let decoded = match algorithm {
        Algorithm::Ed25519 => VerifyingKey::from_public_key_der(&der)
            .map(PublicKey::Ed25519)
            .map_err(|e| e.to_string()),
        Algorithm::RsaPssSha256 => RsaPublicKey::from_public_key_der(&der)
            .map(PublicKey::Rsa)
            .map_err(|e| e.to_string()),
    };
    decoded.map_err(|reason| {
        SigningError::KeyDecodingFailed(format!("not a valid {} public key: {}", algorithm, reason))
    })
}
