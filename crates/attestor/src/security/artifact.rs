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

//! Artifact classes and how their bytes are prepared for signing.

use crate::crypto::{canonicalize_json_bytes, compute_content_hash, Algorithm};
use crate::error::TrustError;
use crate::fs;
use crate::security::permissions::{EVIDENTIARY_SIGNATURE_MODE, REPLACEABLE_SIGNATURE_MODE};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whether an artifact is signed over its canonical JSON form or its raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Structured,
    Raw,
}

/// Lifecycle of a signature file, which decides its permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureClass {
    /// Written once and never replaced (0444).
    Evidentiary,
    /// May be re-issued when the artifact is legitimately updated (0644).
    Replaceable,
}

impl SignatureClass {
    pub fn mode(&self) -> u32 {
        match self {
            SignatureClass::Evidentiary => EVIDENTIARY_SIGNATURE_MODE,
            SignatureClass::Replaceable => REPLACEABLE_SIGNATURE_MODE,
        }
    }
}

/// The attested artifact classes and their fixed signing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactClass {
    InstallManifest,
    InstallState,
    DatabaseSchema,
    ModelManifest,
}

impl ArtifactClass {
    pub const ALL: [ArtifactClass; 4] = [
        ArtifactClass::InstallManifest,
        ArtifactClass::InstallState,
        ArtifactClass::DatabaseSchema,
        ArtifactClass::ModelManifest,
    ];

    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactClass::DatabaseSchema => ArtifactKind::Raw,
            _ => ArtifactKind::Structured,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            ArtifactClass::ModelManifest => Algorithm::RsaPssSha256,
            _ => Algorithm::Ed25519,
        }
    }

    pub fn signature_class(&self) -> SignatureClass {
        match self {
            ArtifactClass::InstallState => SignatureClass::Evidentiary,
            _ => SignatureClass::Replaceable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactClass::InstallManifest => "manifest",
            ArtifactClass::InstallState => "state",
            ArtifactClass::DatabaseSchema => "schema",
            ArtifactClass::ModelManifest => "model-manifest",
        }
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown artifact class '{}' (expected manifest, state, schema or model-manifest)",
                    s
                )
            })
    }
}

/// An artifact file of a known class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    class: ArtifactClass,
    path: PathBuf,
}

impl Artifact {
    pub fn new(class: ArtifactClass, path: impl Into<PathBuf>) -> Self {
        Self {
            class,
            path: path.into(),
        }
    }

    pub fn class(&self) -> ArtifactClass {
        self.class
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Bytes read from an artifact in one pass.
pub(crate) struct LoadedArtifact {
    pub raw: Vec<u8>,
    /// Canonical JSON for structured artifacts, the raw bytes otherwise.
    pub canonical: Vec<u8>,
    pub content_hash: String,
}

/// Reads an artifact and prepares the bytes that are signed.
pub(crate) fn load_artifact(artifact: &Artifact) -> Result<LoadedArtifact, TrustError> {
    let raw = fs::read_or(artifact.path(), || TrustError::MissingArtifact {
        path: artifact.path().to_path_buf(),
    })?;

    let canonical = match artifact.class().kind() {
        ArtifactKind::Structured => {
            canonicalize_json_bytes(&raw).map_err(|e| TrustError::CanonicalizationError {
                path: artifact.path().to_path_buf(),
                reason: e.to_string(),
            })?
        }
        ArtifactKind::Raw => raw.clone(),
    };
    let content_hash = compute_content_hash(&canonical);

    Ok(LoadedArtifact {
        raw,
        canonical,
        content_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_class_table() {
        assert_eq!(
            ArtifactClass::InstallState.signature_class(),
            SignatureClass::Evidentiary
        );
        assert_eq!(SignatureClass::Evidentiary.mode(), 0o444);
        assert_eq!(
            ArtifactClass::InstallManifest.signature_class().mode(),
            0o644
        );
        assert_eq!(ArtifactClass::DatabaseSchema.kind(), ArtifactKind::Raw);
        assert_eq!(
            ArtifactClass::ModelManifest.algorithm(),
            Algorithm::RsaPssSha256
        );
    }

    #[test]
    fn test_class_parsing() {
        for class in ArtifactClass::ALL {
            assert_eq!(class.as_str().parse::<ArtifactClass>().unwrap(), class);
        }
        assert!("unit".parse::<ArtifactClass>().is_err());
    }

    #[test]
    fn test_structured_artifact_is_canonicalized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "{ \"b\": 1,\n  \"a\": 2 }").unwrap();

        let loaded = load_artifact(&Artifact::new(ArtifactClass::InstallManifest, &path)).unwrap();
        assert_eq!(loaded.canonical, br#"{"a":2,"b":1}"#);
        assert_eq!(loaded.content_hash, compute_content_hash(br#"{"a":2,"b":1}"#));
    }

    #[test]
    fn test_raw_artifact_is_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.sql");
        std::fs::write(&path, "CREATE TABLE t (id int);\n").unwrap();

        let loaded = load_artifact(&Artifact::new(ArtifactClass::DatabaseSchema, &path)).unwrap();
        assert_eq!(loaded.canonical, loaded.raw);
    }

    #[test]
    fn test_missing_artifact() {
        let result = load_artifact(&Artifact::new(
            ArtifactClass::InstallManifest,
            "/nonexistent/manifest.json",
        ));
        assert!(matches!(result, Err(TrustError::MissingArtifact { .. })));
    }
}
