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

//! Install-state lifecycle: create once, verify forever.
//!
//! [`InstallStateFinalizer`] walks a fixed sequence of stages that ends with a
//! signed install-state document frozen at mode 0444. [`InstallStateChecker`]
//! is the independent verification half, run any number of times afterwards.

mod checker;
mod finalizer;
mod prerequisites;
mod stage;
mod state;

pub use checker::{InstallStateChecker, StateCheckReport};
pub use finalizer::{FinalizeOutcome, InstallStateFinalizer};
pub use prerequisites::{
    identity_hash, DatabaseParameters, DatabaseProbe, DbEnvFileProbe, HostIdentity,
    InstallerIdentity, ManifestModules, ModuleDiscovery,
};
pub use stage::Stage;
pub use state::{DbMode, DbSection, InstallState, STATE_VERSION};
