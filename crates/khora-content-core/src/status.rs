// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

/// Loading progress of an object as seen by consumers.
///
/// An object moves forward through `None → Queued → Loading` and ends in
/// either `Completed` or `Error`. It only goes back to `None` once it has been
/// fully released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectLoadingStatus {
    /// Never requested, or fully released.
    #[default]
    None,
    /// Requested, waiting for the next drain.
    Queued,
    /// The parent file is being loaded.
    Loading,
    /// The object is loaded and its value is available.
    Completed,
    /// The object could not be loaded.
    Error,
}

impl ObjectLoadingStatus {
    /// Returns `true` for `Completed` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Short lowercase name, used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Queued => "queued",
            Self::Loading => "loading",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}
