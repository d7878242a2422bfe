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

//! Cryptographic primitives for artifact attestation.
//!
//! This module provides:
//! - Ed25519 and RSA-PSS-SHA256 key generation, signing and verification
//! - PEM (PKCS8 / SubjectPublicKeyInfo) key encoding
//! - SHA256 content hashes and key fingerprints
//! - Deterministic JSON canonicalization

mod canonical;
mod keys;
mod signing;

pub use canonical::{canonicalize, canonicalize_json_bytes, CanonicalError};
pub use keys::{
    decode_private_key_pem, decode_public_key_pem, encode_private_key_pem, encode_public_key_pem,
    PRIVATE_KEY_PEM_TAG, PUBLIC_KEY_PEM_TAG,
};
pub use signing::{
    compute_content_hash, compute_key_fingerprint, generate_private_key, rsa_pss_max_salt_len,
    sign_bytes, verify_bytes, Algorithm, PrivateKey, PublicKey, SignatureEncoding, SigningError,
    ED25519_SIGNATURE_LEN,
};
