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

//! Tables of the resources currently resident.
//!
//! Every record keeps the id of its parent so a release can walk back down
//! the ownership chain: object, file, then archive and dependency set.

mod table;

pub use table::{RefCountedTable, Release};

use ahash::AHashMap;
use khora_content_core::{ArchiveHandle, ArchiveId, FileHandle, FileId, ObjectId, SceneHandle, SceneId};

/// A mounted archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveArchive {
    /// The archive.
    pub archive_id: ArchiveId,
    /// Mount handle returned by the backend.
    pub handle: ArchiveHandle,
}

/// A loaded or loading content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFile {
    /// The file.
    pub file_id: FileId,
    /// The archive it was loaded from.
    pub archive_id: ArchiveId,
    /// The dependency set acquired for it.
    pub dependency_index: usize,
    /// File handle returned by the backend.
    pub handle: FileHandle,
}

/// A requested object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveObject {
    /// The object.
    pub object_id: ObjectId,
    /// The file holding it.
    pub file_id: FileId,
    /// Identifier inside the file.
    pub local_identifier: i64,
}

/// A loaded dependency set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveDependencySet {
    /// One handle per declared file, in declaration order. Entries for the
    /// shared global table are [`FileHandle::PLACEHOLDER`].
    pub handles: Vec<FileHandle>,
}

/// A scene instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveScene {
    /// The scene.
    pub scene_id: SceneId,
    /// The file holding it.
    pub file_id: FileId,
    /// The archive mounted for it.
    pub archive_id: ArchiveId,
    /// The dependency set acquired for it.
    pub dependency_index: usize,
    /// Scene handle returned by the backend.
    pub handle: SceneHandle,
}

/// Every active table of a content manager.
#[derive(Debug, Default)]
pub struct ActiveTables {
    /// Mounted archives.
    pub archives: RefCountedTable<ArchiveId, ActiveArchive>,
    /// Loaded files.
    pub files: RefCountedTable<FileId, ActiveFile>,
    /// Requested objects.
    pub objects: RefCountedTable<ObjectId, ActiveObject>,
    /// Loaded dependency sets, keyed by catalog index.
    pub dependency_sets: RefCountedTable<usize, ActiveDependencySet>,
    /// Scene instances. Not reference counted.
    pub scenes: AHashMap<SceneHandle, ActiveScene>,
}

impl ActiveTables {
    /// Whether nothing at all is resident.
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
            && self.files.is_empty()
            && self.objects.is_empty()
            && self.dependency_sets.is_empty()
            && self.scenes.is_empty()
    }
}
