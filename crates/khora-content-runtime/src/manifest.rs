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

//! Human-written catalog manifests.
//!
//! A manifest lists archives, files, objects and scenes in RON. Every id is
//! either UUID text or a name, names being hashed into a stable id. Entries
//! refer to each other by the same text.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use khora_content_core::catalog::RawCatalogData;
use khora_content_core::{ArchiveId, FileId, ObjectId, SceneId};
use khora_content_data::CatalogBuilder;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogManifest {
    pub archives: Vec<ArchiveEntry>,
    pub files: Vec<FileEntry>,
    pub objects: Vec<ObjectEntry>,
    pub scenes: Vec<SceneEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveEntry {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub archive: String,
    pub path: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntry {
    pub id: String,
    pub file: String,
    pub local_identifier: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    pub file: String,
    pub name: String,
}

/// Resolves manifest id text: UUID text is taken as is, anything else is
/// hashed by `hashed`.
pub fn resolve_id<T: FromStr>(text: &str, hashed: fn(&str) -> T) -> T {
    text.parse().unwrap_or_else(|_| hashed(text))
}

impl CatalogManifest {
    pub fn from_ron(source: &str) -> Result<Self> {
        ron::de::from_str(source).context("Failed to parse catalog manifest")
    }

    /// Builds the raw catalog tables.
    ///
    /// Files must name a declared archive, objects and scenes a declared
    /// file. Dependencies may name any file, the nil UUID standing for the
    /// global table.
    pub fn to_raw(&self) -> Result<RawCatalogData> {
        let archives: Vec<ArchiveId> = self
            .archives
            .iter()
            .map(|entry| resolve_id(&entry.id, ArchiveId::new_v5))
            .collect();
        let files: Vec<FileId> = self
            .files
            .iter()
            .map(|entry| resolve_id(&entry.id, FileId::new_v5))
            .collect();

        let mut builder = CatalogBuilder::new();
        for (entry, archive_id) in self.archives.iter().zip(&archives) {
            builder.add_archive(*archive_id, &entry.path);
        }

        for (entry, file_id) in self.files.iter().zip(&files) {
            let archive_id = resolve_id(&entry.archive, ArchiveId::new_v5);
            if !archives.contains(&archive_id) {
                bail!(
                    "File '{}' refers to undeclared archive '{}'",
                    entry.id,
                    entry.archive
                );
            }
            let dependencies: Vec<FileId> = entry
                .dependencies
                .iter()
                .map(|text| resolve_id(text, FileId::new_v5))
                .collect();
            builder.add_file(*file_id, archive_id, &entry.path, &dependencies);
        }

        for entry in &self.objects {
            let file_id = resolve_id(&entry.file, FileId::new_v5);
            if !files.contains(&file_id) {
                bail!("Object '{}' refers to undeclared file '{}'", entry.id, entry.file);
            }
            builder.add_object(
                resolve_id(&entry.id, ObjectId::new_v5),
                file_id,
                entry.local_identifier,
            );
        }

        for entry in &self.scenes {
            let file_id = resolve_id(&entry.file, FileId::new_v5);
            if !files.contains(&file_id) {
                bail!("Scene '{}' refers to undeclared file '{}'", entry.id, entry.file);
            }
            builder.add_scene(resolve_id(&entry.id, SceneId::new_v5), file_id, &entry.name);
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"(
        archives: [(id: "Ar1", path: "ar1")],
        files: [
            (id: "F1", archive: "Ar1", path: "shared.khc"),
            (id: "Fa", archive: "Ar1", path: "fa.khc", dependencies: ["F1"]),
        ],
        objects: [(id: "Obj1", file: "Fa", local_identifier: 1)],
        scenes: [(id: "Main", file: "Fa", name: "main")],
    )"#;

    #[test]
    fn test_resolve_id_accepts_uuid_text_and_names() -> Result<()> {
        let uuid = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let resolved = resolve_id(uuid, ObjectId::new_v5);
        assert_eq!(resolved, uuid.parse::<ObjectId>()?);
        assert_eq!(resolved.to_string(), uuid.replace('-', ""));
        assert_ne!(resolved, ObjectId::new_v5(uuid), "UUID text should not be hashed");

        assert_eq!(resolve_id("Obj1", ObjectId::new_v5), ObjectId::new_v5("Obj1"));
        assert!(!resolve_id("00000000-0000-0000-0000-000000000000", FileId::new_v5).is_valid());
        Ok(())
    }

    #[test]
    fn test_manifest_builds_catalog_tables() -> Result<()> {
        let raw = CatalogManifest::from_ron(MANIFEST)?.to_raw()?;

        assert_eq!(raw.archives.len(), 1);
        assert_eq!(raw.files.len(), 2);
        assert_eq!(raw.objects.len(), 1);
        assert_eq!(raw.scenes.len(), 1);
        assert_eq!(raw.objects[0].object_id, ObjectId::new_v5("Obj1"));
        assert_eq!(raw.objects[0].file_id, FileId::new_v5("Fa"));
        assert!(
            raw.dependencies.contains(&vec![FileId::new_v5("F1")]),
            "Fa's dependency list should be stored"
        );
        Ok(())
    }

    #[test]
    fn test_undeclared_references_are_rejected() -> Result<()> {
        let manifest = CatalogManifest::from_ron(
            r#"(files: [(id: "Fa", archive: "Missing", path: "fa.khc")])"#,
        )?;
        let err = manifest.to_raw().expect_err("Undeclared archive should be rejected");
        assert!(err.to_string().contains("Missing"));

        let manifest = CatalogManifest::from_ron(
            r#"(objects: [(id: "Obj", file: "Nowhere", local_identifier: 1)])"#,
        )?;
        assert!(manifest.to_raw().is_err());
        Ok(())
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        assert!(CatalogManifest::from_ron("(archives: [(id: 3)])").is_err());
    }
}
