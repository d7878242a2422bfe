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

//! Configuration for the attestation chain.
//!
//! All file locations live in an explicit [`TrustConfig`] value that is
//! passed into every component; nothing reads a global path constant.

mod defaults;
mod error;
mod loader;
mod types;
mod validation;

pub use defaults::{DEFAULT_ROOT, DEFAULT_RSA_KEY_BITS, MIN_RSA_KEY_BITS};
pub use error::{ConfigError, ValidationError};
pub use loader::ConfigLoader;
pub use types::{KeyOwner, TrustConfig};
pub use validation::Validate;
