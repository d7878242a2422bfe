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

use crate::config::types::TrustConfig;

/// Root directory all default paths live under.
pub const DEFAULT_ROOT: &str = "/var/lib/attestor";

/// Modulus size for generated RSA-PSS keys.
pub const DEFAULT_RSA_KEY_BITS: usize = 4096;

/// Smallest RSA modulus accepted by configuration validation.
pub const MIN_RSA_KEY_BITS: usize = 2048;

pub(crate) const MAX_RSA_KEY_BITS: usize = 16384;

impl Default for TrustConfig {
    fn default() -> Self {
        Self::rooted_at(DEFAULT_ROOT)
    }
}
