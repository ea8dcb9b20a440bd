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

//! A filesystem content backend.
//!
//! Archives are directories and files are content files inside them. All
//! I/O and decoding happens on a pool of worker threads fed through a
//! channel; the calling thread only records the request and returns a handle.
//!
//! Jobs are picked up in submission order and a job only ever waits for
//! requests submitted before it (its mount and its dependencies), so the
//! pool cannot deadlock whatever its size.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use crossbeam_channel::{Receiver, Sender};
use khora_content_core::{
    ArchiveHandle, ArchiveId, ContentBackend, ContentConfig, FileHandle, FileId, FileLoadRequest,
    LoadingStatus, ObjectValue, SceneHandle, SceneId, SceneLoadRequest,
};
use parking_lot::{Condvar, Mutex};

use super::BackendError;
use crate::content_file::ContentFileData;
use crate::decoder::ObjectDecoderRegistry;

enum Job {
    Mount {
        handle: ArchiveHandle,
        root: PathBuf,
    },
    File {
        handle: FileHandle,
        path: String,
        mount: ArchiveHandle,
        dependencies: Vec<FileHandle>,
    },
    Scene {
        handle: SceneHandle,
        path: String,
        scene_name: String,
        mount: ArchiveHandle,
        dependencies: Vec<FileHandle>,
    },
}

struct FsMount {
    archive_id: ArchiveId,
    root: PathBuf,
    status: LoadingStatus,
}

struct FsFile {
    file_id: FileId,
    status: LoadingStatus,
    objects: AHashMap<i64, ObjectValue>,
}

struct FsScene {
    scene_id: SceneId,
    status: LoadingStatus,
}

#[derive(Default)]
struct FsState {
    next_handle: u64,
    mounts: AHashMap<ArchiveHandle, FsMount>,
    files: AHashMap<FileHandle, FsFile>,
    scenes: AHashMap<SceneHandle, FsScene>,
}

enum Prerequisites {
    Pending,
    Ready(PathBuf),
    Failed(String),
}

impl FsState {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn prerequisites(&self, mount: ArchiveHandle, dependencies: &[FileHandle]) -> Prerequisites {
        let root = match self.mounts.get(&mount) {
            None => return Prerequisites::Failed(format!("archive {mount:?} was unmounted")),
            Some(m) if m.status == LoadingStatus::InProgress => return Prerequisites::Pending,
            Some(m) if m.status == LoadingStatus::Failed => {
                return Prerequisites::Failed(format!("archive {} failed to mount", m.archive_id))
            }
            Some(m) => m.root.clone(),
        };

        for handle in dependencies.iter().filter(|h| !h.is_placeholder()) {
            match self.files.get(handle) {
                None => {
                    return Prerequisites::Failed(format!("dependency {handle:?} was unloaded"))
                }
                Some(file) if file.status == LoadingStatus::InProgress => {
                    return Prerequisites::Pending
                }
                Some(file) if file.status == LoadingStatus::Failed => {
                    return Prerequisites::Failed(format!(
                        "dependency {} failed to load",
                        file.file_id
                    ))
                }
                Some(_) => {}
            }
        }

        Prerequisites::Ready(root)
    }
}

struct FsShared {
    state: Mutex<FsState>,
    changed: Condvar,
    decoders: ObjectDecoderRegistry,
}

impl FsShared {
    fn wait_for_prerequisites(
        &self,
        mount: ArchiveHandle,
        dependencies: &[FileHandle],
    ) -> Result<PathBuf, BackendError> {
        let mut state = self.state.lock();
        loop {
            match state.prerequisites(mount, dependencies) {
                Prerequisites::Pending => self.changed.wait(&mut state),
                Prerequisites::Ready(root) => return Ok(root),
                Prerequisites::Failed(reason) => {
                    return Err(BackendError::PrerequisiteFailed(reason))
                }
            }
        }
    }

    fn read_objects(&self, path: &Path) -> Result<AHashMap<i64, ObjectValue>, BackendError> {
        let data = ContentFileData::read_from(path)?;
        let mut objects = AHashMap::with_capacity(data.objects.len());
        for object in data.objects {
            let local_identifier = object.local_identifier;
            let value = self
                .decoders
                .decode(object)
                .map_err(|source| BackendError::Decode {
                    local_identifier,
                    source,
                })?;
            objects.insert(local_identifier, value);
        }
        Ok(objects)
    }

    fn run_job(&self, job: Job) {
        match job {
            Job::Mount { handle, root } => {
                let status = if root.is_dir() {
                    LoadingStatus::Completed
                } else {
                    log::warn!("Archive directory '{}' does not exist", root.display());
                    LoadingStatus::Failed
                };
                if let Some(mount) = self.state.lock().mounts.get_mut(&handle) {
                    mount.status = status;
                }
            }
            Job::File {
                handle,
                path,
                mount,
                dependencies,
            } => {
                let result = self
                    .wait_for_prerequisites(mount, &dependencies)
                    .and_then(|root| self.read_objects(&root.join(&path)));
                let mut state = self.state.lock();
                match state.files.get_mut(&handle) {
                    Some(file) => match result {
                        Ok(objects) => {
                            log::trace!("Content file '{path}' loaded ({} objects)", objects.len());
                            file.objects = objects;
                            file.status = LoadingStatus::Completed;
                        }
                        Err(err) => {
                            log::warn!("Content file '{path}' failed to load: {err}");
                            file.status = LoadingStatus::Failed;
                        }
                    },
                    None => log::debug!("Discarding result of unloaded file '{path}'"),
                }
            }
            Job::Scene {
                handle,
                path,
                scene_name,
                mount,
                dependencies,
            } => {
                let result = self
                    .wait_for_prerequisites(mount, &dependencies)
                    .and_then(|root| Ok(ContentFileData::read_from(&root.join(&path))?))
                    .and_then(|data| {
                        if data.scenes.contains(&scene_name) {
                            Ok(())
                        } else {
                            Err(BackendError::SceneNotFound(scene_name.clone()))
                        }
                    });
                if let Some(scene) = self.state.lock().scenes.get_mut(&handle) {
                    scene.status = match result {
                        Ok(()) => LoadingStatus::Completed,
                        Err(err) => {
                            log::warn!("Scene {} failed to load: {err}", scene.scene_id);
                            LoadingStatus::Failed
                        }
                    };
                }
            }
        }
        self.changed.notify_all();
    }
}

/// A [`ContentBackend`] reading archives from directories on disk.
pub struct FsContentBackend {
    shared: Arc<FsShared>,
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl FsContentBackend {
    /// Starts a backend with `worker_threads` I/O threads (at least one).
    pub fn new(worker_threads: usize, decoders: ObjectDecoderRegistry) -> Self {
        let shared = Arc::new(FsShared {
            state: Mutex::new(FsState::default()),
            changed: Condvar::new(),
            decoders,
        });
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let workers = (0..worker_threads.max(1))
            .filter_map(|index| {
                let shared = Arc::clone(&shared);
                let receiver: Receiver<Job> = receiver.clone();
                thread::Builder::new()
                    .name(format!("khora-content-io-{index}"))
                    .spawn(move || {
                        for job in receiver.iter() {
                            shared.run_job(job);
                        }
                    })
                    .map_err(|err| log::error!("Failed to spawn content I/O worker: {err}"))
                    .ok()
            })
            .collect::<Vec<_>>();

        log::info!("Filesystem content backend started with {} workers", workers.len());

        Self {
            shared,
            jobs: Some(sender),
            workers,
        }
    }

    /// Starts a backend sized by the configuration.
    pub fn from_config(config: &ContentConfig, decoders: ObjectDecoderRegistry) -> Self {
        Self::new(config.worker_threads, decoders)
    }

    fn submit(&self, job: Job) -> bool {
        let sent = match &self.jobs {
            Some(jobs) if !self.workers.is_empty() => jobs.send(job).is_ok(),
            _ => false,
        };
        if !sent {
            log::error!("No content I/O worker is running");
        }
        sent
    }
}

impl ContentBackend for FsContentBackend {
    fn mount_archive(&mut self, archive_id: ArchiveId, path: &str) -> ArchiveHandle {
        let root = PathBuf::from(path);
        let handle = {
            let mut state = self.shared.state.lock();
            let handle = ArchiveHandle(state.next_handle());
            state.mounts.insert(
                handle,
                FsMount {
                    archive_id,
                    root: root.clone(),
                    status: LoadingStatus::InProgress,
                },
            );
            handle
        };
        if !self.submit(Job::Mount { handle, root }) {
            if let Some(mount) = self.shared.state.lock().mounts.get_mut(&handle) {
                mount.status = LoadingStatus::Failed;
            }
        }
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
        if let Some(mount) = self.shared.state.lock().mounts.remove(&handle) {
            log::trace!("Unmounted '{}'", mount.root.display());
        }
        self.shared.changed.notify_all();
    }

    fn load_file(&mut self, request: FileLoadRequest<'_>) -> FileHandle {
        let handle = {
            let mut state = self.shared.state.lock();
            let handle = FileHandle(state.next_handle());
            state.files.insert(
                handle,
                FsFile {
                    file_id: request.file_id,
                    status: LoadingStatus::InProgress,
                    objects: AHashMap::new(),
                },
            );
            handle
        };
        let job = Job::File {
            handle,
            path: request.path.to_string(),
            mount: request.mount,
            dependencies: request.dependencies.to_vec(),
        };
        if !self.submit(job) {
            if let Some(file) = self.shared.state.lock().files.get_mut(&handle) {
                file.status = LoadingStatus::Failed;
            }
        }
        handle
    }

    fn file_status(&self, handle: FileHandle) -> LoadingStatus {
        if handle.is_placeholder() {
            return LoadingStatus::Completed;
        }
        self.shared
            .state
            .lock()
            .files
            .get(&handle)
            .map_or(LoadingStatus::Failed, |f| f.status)
    }

    fn file_object(&self, handle: FileHandle, local_identifier: i64) -> Option<ObjectValue> {
        self.shared
            .state
            .lock()
            .files
            .get(&handle)
            .filter(|f| f.status == LoadingStatus::Completed)?
            .objects
            .get(&local_identifier)
            .cloned()
    }

    fn wait_for_file(&self, handle: FileHandle, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.shared.state.lock();
        loop {
            let in_progress = state
                .files
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
        if let Some(file) = self.shared.state.lock().files.remove(&handle) {
            log::trace!("Unloaded file {}", file.file_id);
        }
        self.shared.changed.notify_all();
    }

    fn load_scene(&mut self, request: SceneLoadRequest<'_>) -> SceneHandle {
        let handle = {
            let mut state = self.shared.state.lock();
            let handle = SceneHandle(state.next_handle());
            state.scenes.insert(
                handle,
                FsScene {
                    scene_id: request.scene_id,
                    status: LoadingStatus::InProgress,
                },
            );
            handle
        };
        let job = Job::Scene {
            handle,
            path: request.path.to_string(),
            scene_name: request.scene_name.to_string(),
            mount: request.mount,
            dependencies: request.dependencies.to_vec(),
        };
        if !self.submit(job) {
            if let Some(scene) = self.shared.state.lock().scenes.get_mut(&handle) {
                scene.status = LoadingStatus::Failed;
            }
        }
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
        if let Some(scene) = self.shared.state.lock().scenes.remove(&handle) {
            log::trace!("Unloaded scene {}", scene.scene_id);
        }
        self.shared.changed.notify_all();
    }
}

impl Drop for FsContentBackend {
    fn drop(&mut self) {
        // Closing the channel lets every worker drain its queue and exit.
        self.jobs.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A content I/O worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for FsContentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("FsContentBackend")
            .field("workers", &self.workers.len())
            .field("mounts", &state.mounts.len())
            .field("files", &state.files.len())
            .field("scenes", &state.scenes.len())
            .finish()
    }
}
