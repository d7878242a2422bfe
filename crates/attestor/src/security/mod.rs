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

//! Key management, signing and verification of installation artifacts.

mod artifact;
mod artifact_signer;
pub mod audit;
mod integrity;
mod key_manager;
pub mod permissions;
mod verification;

pub use artifact::{Artifact, ArtifactClass, ArtifactKind, SignatureClass};
pub use artifact_signer::{ArtifactSigner, FileArtifactSigner, Signature};
pub use integrity::{ContentIntegrityIndex, Violation, ViolationKind, UNIT_LIST};
pub use key_manager::{load_public_key, FileKeyManager, KeyManager, KeyPair};
pub use verification::{ArtifactVerifier, FileArtifactVerifier, Trusted};
