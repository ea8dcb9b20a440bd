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

//! An in-memory content backend.
//!
//! Archives and files are registered up front under the paths the catalog
//! will resolve to. Clones share the same state, so a test can keep one clone
//! to drive completion and inspect what the manager asked for.

use ahash::{AHashMap, AHashSet};
use khora_content_core::{
    ArchiveHandle, ArchiveId, ContentBackend, FileHandle, FileId, FileLoadRequest, LoadingStatus,
    ObjectValue, SceneHandle, SceneId, SceneLoadRequest,
};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// When requests issued to a [`MemoryContentBackend`] finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionMode {
    /// Every request finishes before the call that issued it returns.
    #[default]
    Immediate,
    /// Requests stay in progress until [`MemoryContentBackend::complete_pending`].
    Manual,
}

/// Content of one in-memory file.
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    objects: AHashMap<i64, ObjectValue>,
    scenes: Vec<String>,
}

impl MemoryFile {
    /// Creates an empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object.
    pub fn with_object<T: Any + Send + Sync>(mut self, local_identifier: i64, value: T) -> Self {
        self.objects.insert(local_identifier, ObjectValue::new(value));
        self
    }

    /// Adds a scene.
    pub fn with_scene(mut self, name: impl Into<String>) -> Self {
        self.scenes.push(name.into());
        self
    }
}

/// A request observed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// An archive mount was requested.
    Mount(ArchiveId),
    /// An archive was unmounted.
    Unmount(ArchiveId),
    /// A file load was requested.
    LoadFile(FileId),
    /// A file was unloaded.
    UnloadFile(FileId),
    /// A scene load was requested.
    LoadScene(SceneId),
    /// A scene was unloaded.
    UnloadScene(SceneId),
}

#[derive(Debug)]
struct MountState {
    archive_id: ArchiveId,
    path: String,
    status: LoadingStatus,
}

#[derive(Debug)]
struct FileState {
    file_id: FileId,
    path: String,
    mount: ArchiveHandle,
    dependencies: Vec<FileHandle>,
    status: LoadingStatus,
}

#[derive(Debug)]
struct SceneState {
    scene_id: SceneId,
    path: String,
    scene_name: String,
    mount: ArchiveHandle,
    dependencies: Vec<FileHandle>,
    status: LoadingStatus,
}

#[derive(Debug, Default)]
struct State {
    mode: CompletionMode,
    archives: AHashSet<String>,
    files: AHashMap<String, MemoryFile>,
    failing: AHashSet<String>,
    next_handle: u64,
    mounts: AHashMap<ArchiveHandle, MountState>,
    loads: AHashMap<FileHandle, FileState>,
    scenes: AHashMap<SceneHandle, SceneState>,
    events: Vec<BackendEvent>,
}

impl State {
    fn next_handle(&mut self) -> u64 {
        // Zero is reserved for the placeholder file handle.
        self.next_handle += 1;
        self.next_handle
    }

    fn mount_result(&self, path: &str) -> LoadingStatus {
        if self.archives.contains(path) && !self.failing.contains(path) {
            LoadingStatus::Completed
        } else {
            LoadingStatus::Failed
        }
    }

    fn prerequisites_result(&self, mount: ArchiveHandle, dependencies: &[FileHandle]) -> LoadingStatus {
        let mount_ok = self
            .mounts
            .get(&mount)
            .is_some_and(|m| m.status == LoadingStatus::Completed);
        let dependencies_ok = dependencies.iter().all(|handle| {
            handle.is_placeholder()
                || self
                    .loads
                    .get(handle)
                    .is_some_and(|file| file.status == LoadingStatus::Completed)
        });
        if mount_ok && dependencies_ok {
            LoadingStatus::Completed
        } else {
            LoadingStatus::Failed
        }
    }

    fn file_result(&self, path: &str, mount: ArchiveHandle, dependencies: &[FileHandle]) -> LoadingStatus {
        if self.prerequisites_result(mount, dependencies) == LoadingStatus::Failed
            || self.failing.contains(path)
            || !self.files.contains_key(path)
        {
            return LoadingStatus::Failed;
        }
        LoadingStatus::Completed
    }

    fn scene_result(&self, scene: &SceneState) -> LoadingStatus {
        if self.prerequisites_result(scene.mount, &scene.dependencies) == LoadingStatus::Failed {
            return LoadingStatus::Failed;
        }
        match self.files.get(&scene.path) {
            Some(file) if file.scenes.contains(&scene.scene_name) => LoadingStatus::Completed,
            _ => LoadingStatus::Failed,
        }
    }

    /// Finishes every pending request, oldest first, so a file always
    /// resolves after the mount and dependencies issued before it.
    fn complete_pending(&mut self) -> usize {
        let mut completed = 0;

        let mut mounts: Vec<ArchiveHandle> = self
            .mounts
            .iter()
            .filter(|(_, m)| m.status == LoadingStatus::InProgress)
            .map(|(handle, _)| *handle)
            .collect();
        mounts.sort_unstable_by_key(|handle| handle.0);
        for handle in mounts {
            let status = self.mount_result(&self.mounts[&handle].path);
            if let Some(mount) = self.mounts.get_mut(&handle) {
                mount.status = status;
                completed += 1;
            }
        }

        let mut loads: Vec<FileHandle> = self
            .loads
            .iter()
            .filter(|(_, f)| f.status == LoadingStatus::InProgress)
            .map(|(handle, _)| *handle)
            .collect();
        loads.sort_unstable_by_key(|handle| handle.0);
        for handle in loads {
            let file = &self.loads[&handle];
            let status = self.file_result(&file.path, file.mount, &file.dependencies);
            if let Some(file) = self.loads.get_mut(&handle) {
                file.status = status;
                completed += 1;
            }
        }

        let mut scenes: Vec<SceneHandle> = self
            .scenes
            .iter()
            .filter(|(_, s)| s.status == LoadingStatus::InProgress)
            .map(|(handle, _)| *handle)
            .collect();
        scenes.sort_unstable_by_key(|handle| handle.0);
        for handle in scenes {
            let status = self.scene_result(&self.scenes[&handle]);
            if let Some(scene) = self.scenes.get_mut(&handle) {
                scene.status = status;
                completed += 1;
            }
        }

        completed
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

/// A [`ContentBackend`] serving archives and files from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentBackend {
    shared: Arc<Shared>,
}

impl MemoryContentBackend {
    /// Creates an empty backend that completes requests immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend with the given completion mode.
    pub fn with_mode(mode: CompletionMode) -> Self {
        let backend = Self::default();
        backend.shared.state.lock().mode = mode;
        backend
    }

    /// Makes an archive mountable at `path`.
    pub fn add_archive(&self, path: impl Into<String>) -> &Self {
        self.shared.state.lock().archives.insert(path.into());
        self
    }

    /// Makes a file loadable at `path`.
    pub fn add_file(&self, path: impl Into<String>, file: MemoryFile) -> &Self {
        self.shared.state.lock().files.insert(path.into(), file);
        self
    }

    /// Makes every future request for `path` fail, archive or file.
    pub fn fail_path(&self, path: impl Into<String>) -> &Self {
        self.shared.state.lock().failing.insert(path.into());
        self
    }

    /// Finishes every pending request and wakes waiting threads. Returns the
    /// number of requests finished.
    pub fn complete_pending(&self) -> usize {
        let completed = self.shared.state.lock().complete_pending();
        self.shared.changed.notify_all();
        completed
    }

    /// Every request seen so far, in order.
    pub fn events(&self) -> Vec<BackendEvent> {
        self.shared.state.lock().events.clone()
    }

    /// Returns the journal and clears it.
    pub fn take_events(&self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.shared.state.lock().events)
    }

    /// Archives currently mounted or mounting, sorted.
    pub fn mounted_archives(&self) -> Vec<ArchiveId> {
        let mut ids: Vec<ArchiveId> = self
            .shared
            .state
            .lock()
            .mounts
            .values()
            .map(|m| m.archive_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Files currently loaded or loading, sorted.
    pub fn loaded_files(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self
            .shared
            .state
            .lock()
            .loads
            .values()
            .map(|f| f.file_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of scene instances currently loaded or loading.
    pub fn loaded_scene_count(&self) -> usize {
        self.shared.state.lock().scenes.len()
    }

    /// Whether nothing is mounted or loaded.
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.mounts.is_empty() && state.loads.is_empty() && state.scenes.is_empty()
    }
}

impl ContentBackend for MemoryContentBackend {
    fn mount_archive(&mut self, archive_id: ArchiveId, path: &str) -> ArchiveHandle {
        let mut state = self.shared.state.lock();
        let handle = ArchiveHandle(state.next_handle());
        let status = match state.mode {
            CompletionMode::Immediate => state.mount_result(path),
            CompletionMode::Manual => LoadingStatus::InProgress,
        };
        state.mounts.insert(
            handle,
            MountState {
                archive_id,
                path: path.to_string(),
                status,
            },
        );
        state.events.push(BackendEvent::Mount(archive_id));
        handle
    }

    fn archive_status(&self, handle: ArchiveHandle) -> LoadingStatus {
        self.shared
            .state
            .lock()
            .mounts
            .get(&handle)
            .map_or(LoadingStatus::Failed, |m| m.status)
    }

    fn unmount_archive(&mut self, handle: ArchiveHandle) {
        let mut state = self.shared.state.lock();
        if let Some(mount) = state.mounts.remove(&handle) {
            state.events.push(BackendEvent::Unmount(mount.archive_id));
        }
    }

    fn load_file(&mut self, request: FileLoadRequest<'_>) -> FileHandle {
        let mut state = self.shared.state.lock();
        let handle = FileHandle(state.next_handle());
        let status = match state.mode {
            CompletionMode::Immediate => {
                state.file_result(request.path, request.mount, request.dependencies)
            }
            CompletionMode::Manual => LoadingStatus::InProgress,
        };
        state.loads.insert(
            handle,
            FileState {
                file_id: request.file_id,
                path: request.path.to_string(),
                mount: request.mount,
                dependencies: request.dependencies.to_vec(),
                status,
            },
        );
        state.events.push(BackendEvent::LoadFile(request.file_id));
        handle
    }

    fn file_status(&self, handle: FileHandle) -> LoadingStatus {
        if handle.is_placeholder() {
            return LoadingStatus::Completed;
        }
        self.shared
            .state
            .lock()
            .loads
            .get(&handle)
            .map_or(LoadingStatus::Failed, |f| f.status)
    }

    fn file_object(&self, handle: FileHandle, local_identifier: i64) -> Option<ObjectValue> {
        let state = self.shared.state.lock();
        let file = state.loads.get(&handle)?;
        if file.status != LoadingStatus::Completed {
            return None;
        }
        state.files.get(&file.path)?.objects.get(&local_identifier).cloned()
    }

    fn wait_for_file(&self, handle: FileHandle, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.shared.state.lock();
        loop {
            let in_progress = state
                .loads
                .get(&handle)
                .is_some_and(|f| f.status == LoadingStatus::InProgress);
            if !in_progress {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                        return false;
                    }
                }
                None => self.shared.changed.wait(&mut state),
            }
        }
    }

    fn unload_file(&mut self, handle: FileHandle) {
        let mut state = self.shared.state.lock();
        if let Some(file) = state.loads.remove(&handle) {
            state.events.push(BackendEvent::UnloadFile(file.file_id));
        }
        drop(state);
        self.shared.changed.notify_all();
    }

    fn load_scene(&mut self, request: SceneLoadRequest<'_>) -> SceneHandle {
        let mut state = self.shared.state.lock();
        let handle = SceneHandle(state.next_handle());
        let mut scene = SceneState {
            scene_id: request.scene_id,
            path: request.path.to_string(),
            scene_name: request.scene_name.to_string(),
            mount: request.mount,
            dependencies: request.dependencies.to_vec(),
            status: LoadingStatus::InProgress,
        };
        if state.mode == CompletionMode::Immediate {
            scene.status = state.scene_result(&scene);
        }
        state.scenes.insert(handle, scene);
        state.events.push(BackendEvent::LoadScene(request.scene_id));
        handle
    }

    fn scene_status(&self, handle: SceneHandle) -> LoadingStatus {
        self.shared
            .state
            .lock()
            .scenes
            .get(&handle)
            .map_or(LoadingStatus::Failed, |s| s.status)
    }

    fn unload_scene(&mut self, handle: SceneHandle) {
        let mut state = self.shared.state.lock();
        if let Some(scene) = state.scenes.remove(&handle) {
            state.events.push(BackendEvent::UnloadScene(scene.scene_id));
        }
    }
}
