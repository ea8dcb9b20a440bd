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

//! Runtime configuration of the content system.
//!
//! Every field has a default, so a configuration file only needs to list the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Initial table sizes for a catalog. These are hints, tables still grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogCapacity {
    /// Expected number of archives.
    pub archives: usize,
    /// Expected number of content files.
    pub files: usize,
    /// Expected number of objects.
    pub objects: usize,
    /// Expected number of scenes.
    pub scenes: usize,
    /// Expected number of dependency sets.
    pub dependencies: usize,
}

impl Default for CatalogCapacity {
    fn default() -> Self {
        Self {
            archives: 16,
            files: 64,
            objects: 1024,
            scenes: 16,
            dependencies: 64,
        }
    }
}

/// Top-level configuration of a content manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Table size hints for the catalog.
    pub capacity: CatalogCapacity,
    /// Timeout used by callers that do not pass their own, in milliseconds.
    /// Zero waits forever.
    pub wait_timeout_ms: u64,
    /// Directory every archive path is resolved against.
    pub archive_root: PathBuf,
    /// Extension appended to archive names, without the dot.
    pub archive_extension: Option<String>,
    /// Number of I/O worker threads used by threaded backends.
    pub worker_threads: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            capacity: CatalogCapacity::default(),
            wait_timeout_ms: 5_000,
            archive_root: PathBuf::from("content"),
            archive_extension: None,
            worker_threads: 2,
        }
    }
}

impl ContentConfig {
    /// Default archive path transform: `<archive_root>/<name>[.<extension>]`.
    ///
    /// The extension is appended, so a dotted name keeps all of its parts.
    pub fn archive_path(&self, name: &str) -> String {
        let path = match &self.archive_extension {
            Some(extension) => self.archive_root.join(format!("{name}.{extension}")),
            None => self.archive_root.join(name),
        };
        path.to_string_lossy().into_owned()
    }

    /// Default file name transform. File names are relative to their
    /// archive mount, so they are only normalized to forward slashes.
    pub fn file_name(&self, name: &str) -> String {
        name.replace('\\', "/")
    }
}
