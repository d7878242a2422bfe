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

use std::fmt;

/// Stages of a finalize run, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Uninitialized,
    KeysReady,
    ManifestSigned,
    UnitsDeployedAndHashed,
    PrereqsVerified,
    StateDrafted,
    StateSigned,
    Immutable,
}

impl Stage {
    /// The only stage that may follow this one.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Uninitialized => Some(Stage::KeysReady),
            Stage::KeysReady => Some(Stage::ManifestSigned),
            Stage::ManifestSigned => Some(Stage::UnitsDeployedAndHashed),
            Stage::UnitsDeployedAndHashed => Some(Stage::PrereqsVerified),
            Stage::PrereqsVerified => Some(Stage::StateDrafted),
            Stage::StateDrafted => Some(Stage::StateSigned),
            Stage::StateSigned => Some(Stage::Immutable),
            Stage::Immutable => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Uninitialized => "uninitialized",
            Stage::KeysReady => "keys_ready",
            Stage::ManifestSigned => "manifest_signed",
            Stage::UnitsDeployedAndHashed => "units_deployed_and_hashed",
            Stage::PrereqsVerified => "prereqs_verified",
            Stage::StateDrafted => "state_drafted",
            Stage::StateSigned => "state_signed",
            Stage::Immutable => "immutable",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
