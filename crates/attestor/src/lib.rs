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

//! # Attestor
//!
//! Attestor establishes and verifies a cryptographic chain of trust over
//! installation artifacts: a signed manifest of deployed units, per-unit
//! content hashes, a signed database schema, and a final immutable
//! install-state document.
//!
//! Nothing read from an attested artifact is acted upon before its
//! authenticity and integrity are proven. Verification is fail-closed: any
//! missing file, malformed key, malformed signature or digest mismatch is a
//! hard error, and the only way to obtain artifact content is through a
//! [`security::Trusted`] value produced by a successful verification.
//!
//! ## Components
//!
//! - [`security::FileKeyManager`] generates, persists and reuses key pairs.
//! - [`crypto::canonicalize`] produces deterministic bytes for JSON artifacts.
//! - [`security::FileArtifactSigner`] writes detached signatures.
//! - [`security::FileArtifactVerifier`] runs the ordered verification protocol.
//! - [`security::ContentIntegrityIndex`] records and rechecks unit hashes.
//! - [`install_state::InstallStateFinalizer`] produces the signed, frozen
//!   install-state document exactly once per deployment.
//!
//! ## Example
//!
//! ```rust,no_run
//! use attestor::config::TrustConfig;
//! use attestor::security::{
//!     Artifact, ArtifactClass, ArtifactSigner, ArtifactVerifier, FileArtifactSigner,
//!     FileArtifactVerifier, FileKeyManager, KeyManager,
//! };
//! use attestor::crypto::Algorithm;
//!
//! # fn main() -> Result<(), attestor::TrustError> {
//! let config = TrustConfig::rooted_at("/tmp/attestor-demo");
//! let keys = FileKeyManager::from_config(&config);
//! let keypair = keys.ensure_keypair(Algorithm::Ed25519)?;
//!
//! let manifest = Artifact::new(ArtifactClass::InstallManifest, &config.manifest_path);
//! FileArtifactSigner::new().sign(&manifest, &keypair, &config.manifest_signature_path)?;
//!
//! let trusted = FileArtifactVerifier::new().verify(
//!     &manifest,
//!     &config.manifest_signature_path,
//!     &keys.public_key_path(Algorithm::Ed25519),
//! )?;
//! println!("manifest hash {}", trusted.content_hash());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod install_state;
pub mod manifest;
pub mod security;

mod fs;

pub use error::{Severity, TrustError};
