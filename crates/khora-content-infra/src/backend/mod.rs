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

//! Implementations of [`khora_content_core::ContentBackend`].

mod fs;
mod memory;

pub use fs::FsContentBackend;
pub use memory::{BackendEvent, CompletionMode, MemoryContentBackend, MemoryFile};

use crate::content_file::ContentFileError;
use thiserror::Error;

/// Why a backend request ended in [`khora_content_core::LoadingStatus::Failed`].
///
/// Backends only report a failed status to the manager; this error is what
/// they log.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The archive or a dependency of the request did not load.
    #[error("prerequisite failed: {0}")]
    PrerequisiteFailed(String),
    /// The content file could not be read.
    #[error(transparent)]
    ContentFile(#[from] ContentFileError),
    /// An object payload could not be decoded.
    #[error("failed to decode object {local_identifier}: {source}")]
    Decode {
        /// The object that failed.
        local_identifier: i64,
        /// The decoder's error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The content file does not contain the requested scene.
    #[error("scene '{0}' is not in the content file")]
    SceneNotFound(String),
}
