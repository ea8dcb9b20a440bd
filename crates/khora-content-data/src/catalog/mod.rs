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

//! The runtime content catalog.
//!
//! The [`Catalog`] is the primary source of truth for where content lives. It
//! is filled from one or more serialized [`RawCatalogData`] tables and then
//! only queried. Every lookup is an O(1) average-time hash map access that
//! answers "found" or "not found"; a miss is never an error at this level.

pub mod dependencies;
mod strings;

use ahash::AHashMap;
use dependencies::DependencySets;
use khora_content_core::catalog::{CatalogFormatError, RawCatalogData, StringIndex};
use khora_content_core::{ArchiveId, CatalogCapacity, FileId, ObjectId, SceneId};
use strings::{ManagedStrings, StringId};
use thiserror::Error;

/// An error raised while filling a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog storage has been released by [`Catalog::dispose`].
    #[error("catalog storage has been disposed")]
    Disposed,
    /// An entry references a string that does not exist.
    #[error("{kind} entry references string {index}, but the table only has {len} strings")]
    StringIndexOutOfRange {
        /// Kind of entry holding the reference.
        kind: &'static str,
        /// The out-of-range index.
        index: u32,
        /// Size of the string table.
        len: usize,
    },
    /// A file references a dependency set that does not exist.
    #[error("file {file_id} references dependency set {index}, but the catalog only has {len}")]
    DependencyIndexOutOfRange {
        /// The file holding the reference.
        file_id: FileId,
        /// The out-of-range index.
        index: u32,
        /// Number of dependency sets in the raw table.
        len: usize,
    },
    /// An entry uses the reserved invalid id.
    #[error("{kind} entry uses the invalid id")]
    InvalidId {
        /// Kind of entry.
        kind: &'static str,
    },
    /// The blob could not be decoded.
    #[error(transparent)]
    Format(#[from] CatalogFormatError),
}

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLocation {
    /// The file containing the object.
    pub file_id: FileId,
    /// Identifier of the object inside its file.
    pub local_identifier: i64,
}

/// A fully resolved file location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFile<'a> {
    /// Transformed path of the file inside its archive.
    pub path: &'a str,
    /// The file's dependency set.
    pub dependencies: &'a [FileId],
    /// The containing archive.
    pub archive_id: ArchiveId,
    /// Index of the dependency set.
    pub dependency_index: usize,
}

/// What a call to [`Catalog::load_catalog_data`] added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogLoadSummary {
    /// Archives added.
    pub archives: usize,
    /// Files added.
    pub files: usize,
    /// Objects added.
    pub objects: usize,
    /// Scenes added.
    pub scenes: usize,
    /// Dependency sets that got a new slot.
    pub dependency_sets_added: usize,
    /// Dependency sets that matched an existing slot.
    pub dependency_sets_reused: usize,
    /// Entries skipped because their id was already known.
    pub duplicates_skipped: usize,
}

#[derive(Debug)]
struct ArchiveEntry {
    path: StringId,
}

#[derive(Debug)]
struct FileEntry {
    archive_id: ArchiveId,
    dependency_index: usize,
    path: StringId,
}

#[derive(Debug)]
struct SceneEntry {
    file_id: FileId,
    scene_name: StringId,
}

/// The read-only lookup structure mapping content ids to locations.
#[derive(Debug)]
pub struct Catalog {
    created: bool,
    archives: AHashMap<ArchiveId, ArchiveEntry>,
    files: AHashMap<FileId, FileEntry>,
    objects: AHashMap<ObjectId, ObjectLocation>,
    scenes: AHashMap<SceneId, SceneEntry>,
    dependencies: DependencySets,
    strings: ManagedStrings,
}

impl Catalog {
    /// Creates an empty catalog with default capacity hints.
    pub fn new() -> Self {
        Self::with_capacity(CatalogCapacity::default())
    }

    /// Creates an empty catalog whose tables are sized by `capacity`.
    pub fn with_capacity(capacity: CatalogCapacity) -> Self {
        Self {
            created: true,
            archives: AHashMap::with_capacity(capacity.archives),
            files: AHashMap::with_capacity(capacity.files),
            objects: AHashMap::with_capacity(capacity.objects),
            scenes: AHashMap::with_capacity(capacity.scenes),
            dependencies: DependencySets::with_capacity(capacity.dependencies),
            strings: ManagedStrings::with_capacity(capacity.archives + capacity.files),
        }
    }

    /// Returns `false` once [`Catalog::dispose`] has been called.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Decodes a catalog blob and appends its content.
    ///
    /// See [`Catalog::load_catalog_data`].
    pub fn load_catalog_bytes<A, F>(
        &mut self,
        bytes: &[u8],
        archive_path: A,
        file_name: F,
    ) -> Result<CatalogLoadSummary, CatalogError>
    where
        A: Fn(&str) -> String,
        F: Fn(&str) -> String,
    {
        let raw = RawCatalogData::from_bytes(bytes)?;
        self.load_catalog_data(&raw, archive_path, file_name)
    }

    /// Appends the content of a raw catalog table.
    ///
    /// `archive_path` turns a stored archive name into the path handed to the
    /// backend's mount call, and `file_name` does the same for file names
    /// inside an archive. Both run once per entry, here, so lookups never
    /// allocate.
    ///
    /// The raw table is validated as a whole before anything is added; on
    /// error the catalog is left untouched. Entries whose id is already known
    /// are skipped (the first catalog to define an id wins). Dependency sets
    /// are deduplicated against every set already present: a list identical
    /// to one an earlier catalog stored shares that existing slot, and only
    /// new lists get indices past the existing ones. Indices from this table
    /// are remapped accordingly, so they never alias a different list.
    pub fn load_catalog_data<A, F>(
        &mut self,
        raw: &RawCatalogData,
        archive_path: A,
        file_name: F,
    ) -> Result<CatalogLoadSummary, CatalogError>
    where
        A: Fn(&str) -> String,
        F: Fn(&str) -> String,
    {
        if !self.created {
            return Err(CatalogError::Disposed);
        }
        validate(raw)?;

        let mut summary = CatalogLoadSummary::default();

        let remap: Vec<usize> = raw
            .dependencies
            .iter()
            .map(|files| {
                let (index, reused) = self.dependencies.insert(files);
                if reused {
                    summary.dependency_sets_reused += 1;
                } else {
                    summary.dependency_sets_added += 1;
                }
                index
            })
            .collect();

        for archive in &raw.archives {
            if self.archives.contains_key(&archive.archive_id) {
                log::warn!("Catalog already contains archive {}, skipping", archive.archive_id);
                summary.duplicates_skipped += 1;
                continue;
            }
            let path = self.strings.push(archive_path(raw_string(raw, archive.path)));
            self.archives.insert(archive.archive_id, ArchiveEntry { path });
            summary.archives += 1;
        }

        for file in &raw.files {
            if self.files.contains_key(&file.file_id) {
                log::warn!("Catalog already contains file {}, skipping", file.file_id);
                summary.duplicates_skipped += 1;
                continue;
            }
            let path = self.strings.push(file_name(raw_string(raw, file.path)));
            self.files.insert(
                file.file_id,
                FileEntry {
                    archive_id: file.archive_id,
                    dependency_index: remap[file.dependency_index as usize],
                    path,
                },
            );
            summary.files += 1;
        }

        for object in &raw.objects {
            if self.objects.contains_key(&object.object_id) {
                log::warn!("Catalog already contains object {}, skipping", object.object_id);
                summary.duplicates_skipped += 1;
                continue;
            }
            self.objects.insert(
                object.object_id,
                ObjectLocation {
                    file_id: object.file_id,
                    local_identifier: object.local_identifier,
                },
            );
            summary.objects += 1;
        }

        for scene in &raw.scenes {
            if self.scenes.contains_key(&scene.scene_id) {
                log::warn!("Catalog already contains scene {}, skipping", scene.scene_id);
                summary.duplicates_skipped += 1;
                continue;
            }
            let scene_name = self.strings.push(raw_string(raw, scene.scene_name).to_string());
            self.scenes.insert(
                scene.scene_id,
                SceneEntry {
                    file_id: scene.file_id,
                    scene_name,
                },
            );
            summary.scenes += 1;
        }

        log::info!(
            "Catalog data loaded: {} archives, {} files, {} objects, {} scenes, {} new dependency sets ({} reused)",
            summary.archives,
            summary.files,
            summary.objects,
            summary.scenes,
            summary.dependency_sets_added,
            summary.dependency_sets_reused,
        );

        Ok(summary)
    }

    /// Looks up the file and local identifier of an object.
    pub fn try_get_object_location(&self, object_id: ObjectId) -> Option<ObjectLocation> {
        self.objects.get(&object_id).copied()
    }

    /// Looks up the path, dependency set and archive of a file.
    pub fn try_get_file_location(&self, file_id: FileId) -> Option<ResolvedFile<'_>> {
        let entry = self.files.get(&file_id)?;
        // Indices were validated and remapped at load time.
        let dependencies = self.dependencies.get(entry.dependency_index)?;
        Some(ResolvedFile {
            path: self.strings.get(entry.path),
            dependencies,
            archive_id: entry.archive_id,
            dependency_index: entry.dependency_index,
        })
    }

    /// Looks up the transformed mount path of an archive.
    pub fn try_get_archive_location(&self, archive_id: ArchiveId) -> Option<&str> {
        self.archives
            .get(&archive_id)
            .map(|entry| self.strings.get(entry.path))
    }

    /// Looks up the file and name of a scene.
    pub fn try_get_scene_location(&self, scene_id: SceneId) -> Option<(FileId, &str)> {
        self.scenes
            .get(&scene_id)
            .map(|entry| (entry.file_id, self.strings.get(entry.scene_name)))
    }

    /// Returns the file ids of a dependency set.
    pub fn dependency_set(&self, index: usize) -> Option<&[FileId]> {
        self.dependencies.get(index)
    }

    /// Number of distinct dependency sets.
    pub fn dependency_set_count(&self) -> usize {
        self.dependencies.len()
    }

    /// All archive ids, sorted.
    pub fn archive_ids(&self) -> Vec<ArchiveId> {
        sorted_keys(&self.archives)
    }

    /// All file ids, sorted.
    pub fn file_ids(&self) -> Vec<FileId> {
        sorted_keys(&self.files)
    }

    /// All object ids, sorted.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        sorted_keys(&self.objects)
    }

    /// All scene ids, sorted.
    pub fn scene_ids(&self) -> Vec<SceneId> {
        sorted_keys(&self.scenes)
    }

    /// Number of archives.
    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }

    /// Number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of scenes.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Number of strings held by the string table.
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Releases every table. Safe to call more than once.
    pub fn dispose(&mut self) {
        if !self.created {
            return;
        }
        self.archives = AHashMap::new();
        self.files = AHashMap::new();
        self.objects = AHashMap::new();
        self.scenes = AHashMap::new();
        self.dependencies = DependencySets::default();
        self.strings = ManagedStrings::default();
        self.created = false;
        log::debug!("Catalog disposed");
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_keys<K: Copy + Ord, V>(map: &AHashMap<K, V>) -> Vec<K> {
    let mut keys: Vec<K> = map.keys().copied().collect();
    keys.sort_unstable();
    keys
}

// Only called after `validate`.
fn raw_string(raw: &RawCatalogData, index: StringIndex) -> &str {
    raw.string(index).unwrap_or_default()
}

fn validate(raw: &RawCatalogData) -> Result<(), CatalogError> {
    let check_string = |kind: &'static str, index: StringIndex| {
        if raw.string(index).is_none() {
            return Err(CatalogError::StringIndexOutOfRange {
                kind,
                index: index.0,
                len: raw.strings.len(),
            });
        }
        Ok(())
    };

    for archive in &raw.archives {
        if !archive.archive_id.is_valid() {
            return Err(CatalogError::InvalidId { kind: "archive" });
        }
        check_string("archive", archive.path)?;
    }

    for file in &raw.files {
        if !file.file_id.is_valid() {
            return Err(CatalogError::InvalidId { kind: "file" });
        }
        check_string("file", file.path)?;
        if file.dependency_index as usize >= raw.dependencies.len() {
            return Err(CatalogError::DependencyIndexOutOfRange {
                file_id: file.file_id,
                index: file.dependency_index,
                len: raw.dependencies.len(),
            });
        }
    }

    for object in &raw.objects {
        if !object.object_id.is_valid() {
            return Err(CatalogError::InvalidId { kind: "object" });
        }
    }

    for scene in &raw.scenes {
        if !scene.scene_id.is_valid() {
            return Err(CatalogError::InvalidId { kind: "scene" });
        }
        check_string("scene", scene.scene_name)?;
    }

    Ok(())
}
