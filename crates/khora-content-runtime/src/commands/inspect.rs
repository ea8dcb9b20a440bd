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

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use khora_content_data::Catalog;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CatalogReport {
    archives: Vec<ArchiveReport>,
    files: Vec<FileReport>,
    objects: Vec<ObjectReport>,
    scenes: Vec<SceneReport>,
    dependency_sets: usize,
    strings: usize,
}

#[derive(Debug, Serialize)]
struct ArchiveReport {
    id: String,
    path: String,
}

#[derive(Debug, Serialize)]
struct FileReport {
    id: String,
    archive: String,
    path: String,
    dependency_index: usize,
    dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ObjectReport {
    id: String,
    file: String,
    local_identifier: i64,
}

#[derive(Debug, Serialize)]
struct SceneReport {
    id: String,
    file: String,
    name: String,
}

impl CatalogReport {
    fn from_catalog(catalog: &Catalog) -> Self {
        let archives = catalog
            .archive_ids()
            .into_iter()
            .filter_map(|id| {
                catalog.try_get_archive_location(id).map(|path| ArchiveReport {
                    id: id.to_string(),
                    path: path.to_string(),
                })
            })
            .collect();
        let files = catalog
            .file_ids()
            .into_iter()
            .filter_map(|id| {
                catalog.try_get_file_location(id).map(|file| FileReport {
                    id: id.to_string(),
                    archive: file.archive_id.to_string(),
                    path: file.path.to_string(),
                    dependency_index: file.dependency_index,
                    dependencies: file.dependencies.iter().map(ToString::to_string).collect(),
                })
            })
            .collect();
        let objects = catalog
            .object_ids()
            .into_iter()
            .filter_map(|id| {
                catalog.try_get_object_location(id).map(|object| ObjectReport {
                    id: id.to_string(),
                    file: object.file_id.to_string(),
                    local_identifier: object.local_identifier,
                })
            })
            .collect();
        let scenes = catalog
            .scene_ids()
            .into_iter()
            .filter_map(|id| {
                catalog.try_get_scene_location(id).map(|(file_id, name)| SceneReport {
                    id: id.to_string(),
                    file: file_id.to_string(),
                    name: name.to_string(),
                })
            })
            .collect();

        Self {
            archives,
            files,
            objects,
            scenes,
            dependency_sets: catalog.dependency_set_count(),
            strings: catalog.string_count(),
        }
    }

    fn print(&self) {
        println!("Archives ({}):", self.archives.len());
        for archive in &self.archives {
            println!("  {}  {}", archive.id, archive.path);
        }
        println!("Files ({}):", self.files.len());
        for file in &self.files {
            println!(
                "  {}  {}  archive {}  dependency set {} ({} files)",
                file.id,
                file.path,
                file.archive,
                file.dependency_index,
                file.dependencies.len()
            );
        }
        println!("Objects ({}):", self.objects.len());
        for object in &self.objects {
            println!("  {}  file {}  #{}", object.id, object.file, object.local_identifier);
        }
        println!("Scenes ({}):", self.scenes.len());
        for scene in &self.scenes {
            println!("  {}  '{}'  file {}", scene.id, scene.name, scene.file);
        }
        println!("Dependency sets: {}", self.dependency_sets);
        println!("Strings: {}", self.strings);
    }
}

/// Loads a catalog blob and prints its content, untransformed.
pub fn run(catalog_path: &Path, json: bool) -> Result<()> {
    let bytes = fs::read(catalog_path)
        .with_context(|| format!("Failed to read catalog {}", catalog_path.display()))?;

    let mut catalog = Catalog::new();
    catalog
        .load_catalog_bytes(&bytes, |name| name.to_string(), |name| name.to_string())
        .with_context(|| format!("Invalid catalog {}", catalog_path.display()))?;

    let report = CatalogReport::from_catalog(&catalog);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}
