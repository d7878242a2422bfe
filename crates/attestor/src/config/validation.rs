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

use crate::config::defaults::{MAX_RSA_KEY_BITS, MIN_RSA_KEY_BITS};
use crate::config::{TrustConfig, ValidationError};
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn require_absolute(field: &'static str, path: &Path, errors: &mut Vec<ValidationError>) {
    if !path.is_absolute() {
        errors.push(ValidationError::RelativePath {
            field,
            path: path.to_path_buf(),
        });
    }
}

fn require_distinct(
    field: &'static str,
    artifact: &Path,
    signature: &Path,
    errors: &mut Vec<ValidationError>,
) {
    if artifact == signature {
        errors.push(ValidationError::SignatureCollision {
            field,
            path: artifact.to_path_buf(),
        });
    }
}

impl Validate for TrustConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        require_absolute("key_dir", &self.key_dir, &mut errors);
        require_absolute("manifest_path", &self.manifest_path, &mut errors);
        require_absolute(
            "manifest_signature_path",
            &self.manifest_signature_path,
            &mut errors,
        );
        require_absolute("state_path", &self.state_path, &mut errors);
        require_absolute("state_signature_path", &self.state_signature_path, &mut errors);
        require_absolute("schema_path", &self.schema_path, &mut errors);
        require_absolute(
            "schema_signature_path",
            &self.schema_signature_path,
            &mut errors,
        );
        require_absolute("db_env_path", &self.db_env_path, &mut errors);
        require_absolute("model_manifest_path", &self.model_manifest_path, &mut errors);
        require_absolute(
            "model_manifest_signature_path",
            &self.model_manifest_signature_path,
            &mut errors,
        );

        // A detached signature must never overwrite what it signs.
        require_distinct(
            "manifest",
            &self.manifest_path,
            &self.manifest_signature_path,
            &mut errors,
        );
        require_distinct(
            "state",
            &self.state_path,
            &self.state_signature_path,
            &mut errors,
        );
        require_distinct(
            "schema",
            &self.schema_path,
            &self.schema_signature_path,
            &mut errors,
        );
        require_distinct(
            "model_manifest",
            &self.model_manifest_path,
            &self.model_manifest_signature_path,
            &mut errors,
        );

        if !(MIN_RSA_KEY_BITS..=MAX_RSA_KEY_BITS).contains(&self.rsa_key_bits) {
            errors.push(ValidationError::InvalidRsaKeyBits {
                bits: self.rsa_key_bits,
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple { errors }),
        }
    }
}
