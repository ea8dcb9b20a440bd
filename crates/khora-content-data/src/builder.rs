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

//! Incremental construction of [`RawCatalogData`] tables.

use crate::catalog::dependencies::DependencySets;
use ahash::AHashMap;
use khora_content_core::catalog::{
    RawArchiveLocation, RawCatalogData, RawFileLocation, RawObjectLocation, RawSceneLocation,
    StringIndex,
};
use khora_content_core::{ArchiveId, FileId, ObjectId, SceneId};

/// Builds a raw catalog table entry by entry.
///
/// Strings are interned and identical dependency lists share one slot, so the
/// output is as compact as the runtime catalog that will load it.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    archives: Vec<RawArchiveLocation>,
    files: Vec<RawFileLocation>,
    objects: Vec<RawObjectLocation>,
    scenes: Vec<RawSceneLocation>,
    dependencies: DependencySets,
    strings: Vec<String>,
    interned: AHashMap<String, StringIndex>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, value: &str) -> StringIndex {
        if let Some(&index) = self.interned.get(value) {
            return index;
        }
        let index = StringIndex(self.strings.len() as u32);
        self.strings.push(value.to_string());
        self.interned.insert(value.to_string(), index);
        index
    }

    /// Adds an archive stored under `path`.
    pub fn add_archive(&mut self, archive_id: ArchiveId, path: &str) -> &mut Self {
        let path = self.intern(path);
        self.archives.push(RawArchiveLocation { archive_id, path });
        self
    }

    /// Adds a file of `archive_id` that depends on `dependencies`, in order.
    pub fn add_file(
        &mut self,
        file_id: FileId,
        archive_id: ArchiveId,
        path: &str,
        dependencies: &[FileId],
    ) -> &mut Self {
        let path = self.intern(path);
        let (dependency_index, _) = self.dependencies.insert(dependencies);
        self.files.push(RawFileLocation {
            file_id,
            archive_id,
            dependency_index: dependency_index as u32,
            path,
        });
        self
    }

    /// Adds an object stored in `file_id` under `local_identifier`.
    pub fn add_object(
        &mut self,
        object_id: ObjectId,
        file_id: FileId,
        local_identifier: i64,
    ) -> &mut Self {
        self.objects.push(RawObjectLocation {
            object_id,
            file_id,
            local_identifier,
        });
        self
    }

    /// Adds a scene named `scene_name` stored in `file_id`.
    pub fn add_scene(&mut self, scene_id: SceneId, file_id: FileId, scene_name: &str) -> &mut Self {
        let scene_name = self.intern(scene_name);
        self.scenes.push(RawSceneLocation {
            scene_id,
            file_id,
            scene_name,
        });
        self
    }

    /// Number of distinct dependency sets so far.
    pub fn dependency_set_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Consumes the builder and returns the raw table.
    pub fn build(self) -> RawCatalogData {
        RawCatalogData {
            archives: self.archives,
            files: self.files,
            objects: self.objects,
            scenes: self.scenes,
            dependencies: self.dependencies.into_sets(),
            strings: self.strings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_dependency_lists_share_a_slot() {
        let ar = ArchiveId::new_v5("ar");
        let f1 = FileId::new_v5("f1");
        let f2 = FileId::new_v5("f2");

        let mut builder = CatalogBuilder::new();
        builder
            .add_archive(ar, "ar")
            .add_file(f1, ar, "f1", &[])
            .add_file(f2, ar, "f2", &[])
            .add_file(FileId::new_v5("a"), ar, "a", &[f1, f2])
            .add_file(FileId::new_v5("b"), ar, "b", &[f1, f2]);

        assert_eq!(builder.dependency_set_count(), 2);
        let raw = builder.build();
        assert_eq!(raw.files[2].dependency_index, raw.files[3].dependency_index);
        assert_eq!(raw.dependencies[raw.files[2].dependency_index as usize], vec![f1, f2]);
    }

    #[test]
    fn test_strings_are_interned() {
        let ar = ArchiveId::new_v5("ar");
        let file = FileId::new_v5("f");

        let mut builder = CatalogBuilder::new();
        builder
            .add_archive(ar, "shared")
            .add_file(file, ar, "shared", &[])
            .add_scene(SceneId::new_v5("s"), file, "main");

        let raw = builder.build();
        assert_eq!(raw.strings, vec!["shared".to_string(), "main".to_string()]);
        assert_eq!(raw.archives[0].path, raw.files[0].path);
        assert_eq!(raw.string(raw.scenes[0].scene_name), Some("main"));
    }
}
