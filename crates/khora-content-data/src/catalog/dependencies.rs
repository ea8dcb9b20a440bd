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

//! Content-addressed storage of dependency sets.
//!
//! Files with identical, identically ordered dependency lists share one slot.
//! Slots are keyed by a 64-bit hash of the list; when two different lists
//! collide the first one registered wins and the second silently aliases it.
//! Lists are not compared element by element on a hash match.

use ahash::AHashMap;
use khora_content_core::FileId;

/// Hashes an ordered dependency list down to 64 bits.
///
/// The length is hashed first so that a list is never confused with one of
/// its prefixes.
pub fn hash_dependency_list(files: &[FileId]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(files.len() as u64).to_le_bytes());
    for file in files {
        hasher.update(file.as_uuid().as_bytes());
    }

    let digest = hasher.finalize();
    let mut truncated = [0u8; 8];
    truncated.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(truncated)
}

#[derive(Debug, Default)]
pub(crate) struct DependencySets {
    sets: Vec<Vec<FileId>>,
    by_hash: AHashMap<u64, usize>,
}

impl DependencySets {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            sets: Vec::with_capacity(capacity),
            by_hash: AHashMap::with_capacity(capacity),
        }
    }

    /// Registers a list and returns its slot, plus `true` if an existing slot
    /// was reused.
    pub(crate) fn insert(&mut self, files: &[FileId]) -> (usize, bool) {
        let hash = hash_dependency_list(files);
        if let Some(&index) = self.by_hash.get(&hash) {
            return (index, true);
        }

        let index = self.sets.len();
        self.sets.push(files.to_vec());
        self.by_hash.insert(hash, index);
        (index, false)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&[FileId]> {
        self.sets.get(index).map(Vec::as_slice)
    }

    pub(crate) fn len(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn into_sets(self) -> Vec<Vec<FileId>> {
        self.sets
    }
}
