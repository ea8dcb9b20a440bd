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

use khora_content_core::{ArchiveId, FileId, SceneId};
use khora_content_data::CatalogError;
use std::fmt;
use thiserror::Error;

/// The kind of resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// An object.
    Object,
    /// A content file.
    File,
    /// An archive.
    Archive,
    /// A dependency set.
    DependencySet,
    /// A scene instance.
    Scene,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Object => "object",
            ResourceKind::File => "file",
            ResourceKind::Archive => "archive",
            ResourceKind::DependencySet => "dependency set",
            ResourceKind::Scene => "scene",
        };
        f.write_str(name)
    }
}

/// An error raised by the content manager.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A file id is missing from the catalog.
    #[error("file {0} is not in the catalog")]
    UnknownFile(FileId),
    /// An archive id is missing from the catalog.
    #[error("archive {0} is not in the catalog")]
    UnknownArchive(ArchiveId),
    /// A scene id is missing from the catalog.
    #[error("scene {0} is not in the catalog")]
    UnknownScene(SceneId),
    /// The reserved invalid id was used where a real id is required.
    #[error("invalid {0} id")]
    InvalidId(ResourceKind),
    /// A release targeted something that is not resident.
    #[error("{kind} {id} is not active")]
    NotActive {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Printable id of the resource.
        id: String,
    },
    /// A file points at a dependency set the catalog does not have.
    #[error("dependency set {index} is out of range, the catalog has {len}")]
    DependencyIndexOutOfRange {
        /// The requested set.
        index: usize,
        /// Number of sets in the catalog.
        len: usize,
    },
    /// Loading a dependency set required loading that same set again.
    #[error("dependency set {0} is part of a dependency cycle")]
    DependencyCycle(usize),
    /// The active tables disagree with each other.
    #[error("active tables are inconsistent: {0}")]
    InconsistentState(String),
    /// The catalog rejected new data.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ContentError {
    /// Whether the error means the catalog or the active tables can no longer
    /// be trusted. Caller misuse such as a double release is not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ContentError::NotActive { .. })
    }

    pub(crate) fn not_active(kind: ResourceKind, id: impl fmt::Display) -> Self {
        ContentError::NotActive {
            kind,
            id: id.to_string(),
        }
    }

    /// A release issued by the manager itself hitting an inactive entry
    /// means the tables drifted apart.
    pub(crate) fn into_cascade(self) -> Self {
        match self {
            ContentError::NotActive { kind, id } => ContentError::InconsistentState(format!(
                "{kind} {id} was released by a cascade but is not active"
            )),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_misuse_is_not_fatal() {
        assert!(!ContentError::not_active(ResourceKind::Object, 3).is_fatal());
        assert!(ContentError::DependencyCycle(0).is_fatal());
        assert!(ContentError::UnknownFile(FileId::new_v5("f")).is_fatal());
    }

    #[test]
    fn test_cascade_turns_misuse_into_inconsistency() {
        let err = ContentError::not_active(ResourceKind::Archive, "a").into_cascade();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "active tables are inconsistent: archive a was released by a cascade but is not active"
        );
    }
}
