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

//! # Khora Content Core
//!
//! Foundational crate of the content runtime. It contains the identifiers,
//! the serialized catalog format, and the interface contracts every other
//! content crate builds on, but it has no knowledge of how content is
//! actually loaded or tracked.

#![warn(missing_docs)]

pub mod backend;
pub mod catalog;
pub mod config;
pub mod id;
pub mod status;
pub mod value;

pub use backend::{
    ArchiveHandle, ContentBackend, FileHandle, FileLoadRequest, LoadingStatus, SceneHandle,
    SceneLoadMode, SceneLoadParams, SceneLoadRequest,
};
pub use config::{CatalogCapacity, ContentConfig};
pub use id::{ArchiveId, FileId, ObjectId, SceneId};
pub use status::ObjectLoadingStatus;
pub use value::ObjectValue;
