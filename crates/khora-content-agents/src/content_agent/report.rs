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

use khora_content_core::{ArchiveId, FileId, ObjectId, SceneId};

/// A snapshot of the manager's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentStatus {
    /// Number of drains performed so far.
    pub frame_count: u64,
    /// Active objects.
    pub active_objects: usize,
    /// Active files.
    pub active_files: usize,
    /// Mounted archives.
    pub active_archives: usize,
    /// Active dependency sets.
    pub active_dependency_sets: usize,
    /// Scene instances.
    pub active_scenes: usize,
    /// Objects whose file is still loading.
    pub loading_objects: usize,
    /// Load requests waiting for a drain.
    pub pending_loads: usize,
    /// Release requests waiting for a drain.
    pub pending_releases: usize,
    /// Scene releases waiting for the next drain.
    pub deferred_releases: usize,
    /// One-line summary.
    pub message: String,
}

/// What was still resident when a manager was cleaned up.
///
/// Every listed entry was force-unloaded through the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakReport {
    /// Objects that were never released.
    pub objects: Vec<ObjectId>,
    /// Files still loaded.
    pub files: Vec<FileId>,
    /// Archives still mounted.
    pub archives: Vec<ArchiveId>,
    /// Dependency sets still acquired.
    pub dependency_sets: Vec<usize>,
    /// Scenes never unloaded.
    pub scenes: Vec<SceneId>,
    /// Load requests dropped without being applied.
    pub discarded_loads: usize,
}

impl LeakReport {
    /// Whether nothing leaked. Discarded loads do not count as leaks.
    pub fn is_clean(&self) -> bool {
        self.objects.is_empty()
            && self.files.is_empty()
            && self.archives.is_empty()
            && self.dependency_sets.is_empty()
            && self.scenes.is_empty()
    }

    /// Total number of leaked entries.
    pub fn leaked_count(&self) -> usize {
        self.objects.len()
            + self.files.len()
            + self.archives.len()
            + self.dependency_sets.len()
            + self.scenes.len()
    }
}
