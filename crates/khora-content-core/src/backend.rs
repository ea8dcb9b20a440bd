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

//! # Content Backend Abstractions
//!
//! The contract between the content manager and whatever actually performs
//! archive and file I/O. The manager decides *what* must be resident; a
//! backend decides *how* it gets there. Every request returns immediately
//! with an opaque handle whose progress is polled through the status calls.

use crate::id::{ArchiveId, FileId, SceneId};
use crate::value::ObjectValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque handle to a mounted (or mounting) archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveHandle(pub u64);

/// Opaque handle to a loaded (or loading) content file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(pub u64);

impl FileHandle {
    /// Stands in for the shared global table inside a dependency list.
    /// Backends treat it as always completed.
    pub const PLACEHOLDER: Self = Self(0);

    /// Returns `true` for [`FileHandle::PLACEHOLDER`].
    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }
}

/// Opaque handle to one loaded instance of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneHandle(pub u64);

/// Progress of an asynchronous backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadingStatus {
    /// Still running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl LoadingStatus {
    /// Returns `true` once the request finished, successfully or not.
    pub fn is_done(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Everything a backend needs to start loading one content file.
#[derive(Debug, Clone, Copy)]
pub struct FileLoadRequest<'a> {
    /// The file being loaded.
    pub file_id: FileId,
    /// Path of the file, relative to its archive mount.
    pub path: &'a str,
    /// Files that must finish loading first. May contain placeholders.
    pub dependencies: &'a [FileHandle],
    /// Mount of the containing archive; the file load is ordered after it.
    pub mount: ArchiveHandle,
}

/// How a scene joins the already loaded scenes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneLoadMode {
    /// Replace every loaded scene.
    #[default]
    Single,
    /// Add to the loaded scenes.
    Additive,
}

/// Caller-provided options for a scene load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneLoadParams {
    /// How the scene joins the loaded scenes.
    pub mode: SceneLoadMode,
    /// Whether the scene becomes active as soon as it is loaded.
    pub activate_on_load: bool,
}

impl Default for SceneLoadParams {
    fn default() -> Self {
        Self {
            mode: SceneLoadMode::Single,
            activate_on_load: true,
        }
    }
}

/// Everything a backend needs to start loading a scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneLoadRequest<'a> {
    /// The scene being loaded.
    pub scene_id: SceneId,
    /// Path of the scene file, relative to its archive mount.
    pub path: &'a str,
    /// Name of the scene inside the file.
    pub scene_name: &'a str,
    /// Files that must finish loading first. May contain placeholders.
    pub dependencies: &'a [FileHandle],
    /// Mount of the containing archive.
    pub mount: ArchiveHandle,
    /// Caller options.
    pub params: SceneLoadParams,
}

/// Interface contract for any archive/file I/O provider.
///
/// None of the request methods may block: they start the work and return a
/// handle. Failures are reported through the status methods, never by
/// panicking. Unloading a handle whose load is still running must be
/// accepted; the result is discarded once it arrives.
pub trait ContentBackend: Send {
    /// Starts mounting the archive found at `path`.
    fn mount_archive(&mut self, archive_id: ArchiveId, path: &str) -> ArchiveHandle;

    /// Progress of a mount request.
    fn archive_status(&self, handle: ArchiveHandle) -> LoadingStatus;

    /// Unmounts an archive.
    fn unmount_archive(&mut self, handle: ArchiveHandle);

    /// Starts loading a content file.
    fn load_file(&mut self, request: FileLoadRequest<'_>) -> FileHandle;

    /// Progress of a file load.
    fn file_status(&self, handle: FileHandle) -> LoadingStatus;

    /// Returns an object of a completed file.
    fn file_object(&self, handle: FileHandle, local_identifier: i64) -> Option<ObjectValue>;

    /// Blocks until the file load finished or `timeout` elapsed (`None` waits
    /// forever). Returns `true` if the load finished.
    fn wait_for_file(&self, handle: FileHandle, timeout: Option<Duration>) -> bool;

    /// Unloads a content file.
    fn unload_file(&mut self, handle: FileHandle);

    /// Starts loading a scene.
    fn load_scene(&mut self, request: SceneLoadRequest<'_>) -> SceneHandle;

    /// Progress of a scene load.
    fn scene_status(&self, handle: SceneHandle) -> LoadingStatus;

    /// Unloads a scene instance.
    fn unload_scene(&mut self, handle: SceneHandle);
}
