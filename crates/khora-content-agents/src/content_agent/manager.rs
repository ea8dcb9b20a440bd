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

//! The runtime content manager.
//!
//! Producers on any thread push object requests through a
//! [`ContentRequestSender`]. The thread that owns the manager calls
//! [`RuntimeContentManager::process_queued_commands`] once per tick; that call
//! is the only place where the catalog is consulted and reference counts move.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use crossbeam_channel::Receiver;
use khora_content_core::catalog::RawCatalogData;
use khora_content_core::{
    ArchiveId, ContentBackend, ContentConfig, ObjectId, ObjectLoadingStatus,
};
use khora_content_data::{ActiveTables, Catalog, CatalogLoadSummary};

use super::error::ContentError;
use super::queue::ContentRequestSender;
use super::report::{ContentStatus, LeakReport};
use super::status_cache::StatusCache;

/// Archive and dependency set still held by an unloaded scene. Released at
/// the start of the next drain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeferredRelease {
    pub(crate) archive_id: ArchiveId,
    pub(crate) dependency_index: usize,
}

/// Loads, reference-counts and unloads the content described by a catalog.
pub struct RuntimeContentManager<B: ContentBackend> {
    pub(crate) config: ContentConfig,
    pub(crate) catalog: Catalog,
    pub(crate) active: ActiveTables,
    pub(crate) backend: B,
    load_rx: Receiver<ObjectId>,
    release_rx: Receiver<ObjectId>,
    sender: ContentRequestSender,
    pub(crate) status: Arc<StatusCache>,
    pending_loads: VecDeque<ObjectId>,
    pending_releases: VecDeque<ObjectId>,
    /// Objects whose parent file has not finished loading.
    pub(crate) loading_objects: Vec<ObjectId>,
    pub(crate) deferred_releases: VecDeque<DeferredRelease>,
    /// Dependency sets currently being loaded, to detect cycles.
    pub(crate) resolving_sets: AHashSet<usize>,
    frame_count: u64,
    cleaned: bool,
}

impl<B: ContentBackend> RuntimeContentManager<B> {
    /// Creates a manager with an empty catalog.
    pub fn new(backend: B, config: ContentConfig) -> Self {
        let status = Arc::new(StatusCache::default());
        let (sender, receivers) = ContentRequestSender::channel(status.clone());

        log::info!("Runtime content manager created");

        Self {
            catalog: Catalog::with_capacity(config.capacity),
            config,
            active: ActiveTables::default(),
            backend,
            load_rx: receivers.loads,
            release_rx: receivers.releases,
            sender,
            status,
            pending_loads: VecDeque::new(),
            pending_releases: VecDeque::new(),
            loading_objects: Vec::new(),
            deferred_releases: VecDeque::new(),
            resolving_sets: AHashSet::new(),
            frame_count: 0,
            cleaned: false,
        }
    }

    /// Appends a raw catalog, deriving paths from the configuration.
    pub fn load_catalog_data(
        &mut self,
        raw: &RawCatalogData,
    ) -> Result<CatalogLoadSummary, ContentError> {
        let config = &self.config;
        let summary = self.catalog.load_catalog_data(
            raw,
            |name| config.archive_path(name),
            |name| config.file_name(name),
        )?;
        Ok(summary)
    }

    /// Appends a raw catalog with caller-supplied path transforms.
    pub fn load_catalog_data_with<A, F>(
        &mut self,
        raw: &RawCatalogData,
        archive_path: A,
        file_name: F,
    ) -> Result<CatalogLoadSummary, ContentError>
    where
        A: Fn(&str) -> String,
        F: Fn(&str) -> String,
    {
        Ok(self.catalog.load_catalog_data(raw, archive_path, file_name)?)
    }

    /// Decodes and appends a catalog blob, deriving paths from the
    /// configuration.
    pub fn load_catalog_bytes(&mut self, bytes: &[u8]) -> Result<CatalogLoadSummary, ContentError> {
        let config = &self.config;
        let summary = self.catalog.load_catalog_bytes(
            bytes,
            |name| config.archive_path(name),
            |name| config.file_name(name),
        )?;
        Ok(summary)
    }

    /// A sender that can be moved to other threads.
    pub fn request_sender(&self) -> ContentRequestSender {
        self.sender.clone()
    }

    /// Requests an object. See [`ContentRequestSender::load_object_async`].
    pub fn load_object_async(&self, object_id: ObjectId) {
        self.sender.load_object_async(object_id);
    }

    /// Requests several objects.
    pub fn load_objects_async(&self, object_ids: &[ObjectId]) {
        self.sender.load_objects_async(object_ids);
    }

    /// Gives back one reference to an object.
    pub fn release_object_async(&self, object_id: ObjectId) {
        self.sender.release_object_async(object_id);
    }

    /// Gives back one reference to each object.
    pub fn release_objects_async(&self, object_ids: &[ObjectId]) {
        self.sender.release_objects_async(object_ids);
    }

    /// Current status of an object.
    pub fn get_object_loading_status(&self, object_id: ObjectId) -> ObjectLoadingStatus {
        self.status.status(object_id)
    }

    /// The loaded object, if it completed and is a `T`.
    pub fn get_object_value<T: std::any::Any + Send + Sync>(
        &self,
        object_id: ObjectId,
    ) -> Option<Arc<T>> {
        self.sender.get_object_value::<T>(object_id)
    }

    /// Applies every queued request and refreshes object statuses.
    ///
    /// Deferred scene releases run first, then all queued loads, then all
    /// queued releases. A fatal error stops the drain and is returned; the
    /// requests not yet applied stay queued for the next call. Releases of
    /// objects that are not active are logged and skipped.
    pub fn process_queued_commands(&mut self) -> Result<(), ContentError> {
        self.frame_count += 1;

        self.apply_deferred_releases()?;

        self.pending_loads.extend(self.load_rx.try_iter());
        self.pending_releases.extend(self.release_rx.try_iter());

        while let Some(object_id) = self.pending_loads.pop_front() {
            self.status.take_queued(object_id);
            if let Err(err) = self.load_object_impl(object_id) {
                log::error!("Failed to load object {object_id}: {err}");
                return Err(err);
            }
        }

        while let Some(object_id) = self.pending_releases.pop_front() {
            match self.release_object_impl(object_id) {
                Ok(()) => {}
                Err(err) if !err.is_fatal() => {
                    log::warn!("Ignoring release of object {object_id}: {err}");
                }
                Err(err) => {
                    log::error!("Failed to release object {object_id}: {err}");
                    return Err(err);
                }
            }
        }

        self.update_loading_status();
        Ok(())
    }

    /// Blocks until an object reaches `Completed` or `Error`.
    ///
    /// Queued requests are applied first. A `timeout_ms` of zero waits
    /// forever. Returns `Ok(false)` on timeout and for objects that were
    /// never requested.
    pub fn wait_for_object_completion(
        &mut self,
        object_id: ObjectId,
        timeout_ms: u64,
    ) -> Result<bool, ContentError> {
        self.process_queued_commands()?;

        let status = self.status.status(object_id);
        if status == ObjectLoadingStatus::None {
            return Ok(false);
        }
        if status.is_terminal() {
            return Ok(true);
        }

        let handle = self
            .active
            .objects
            .get(&object_id)
            .and_then(|object| self.active.files.get(&object.file_id))
            .map(|file| file.handle);
        let Some(handle) = handle else {
            return Ok(false);
        };

        let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        if !self.backend.wait_for_file(handle, timeout) {
            log::debug!("Timed out after {timeout_ms} ms waiting for object {object_id}");
            return Ok(false);
        }

        self.update_loading_status();
        Ok(self.status.status(object_id).is_terminal())
    }

    /// A snapshot of the manager's tables and queues.
    pub fn report_status(&self) -> ContentStatus {
        let pending_loads = self.pending_loads.len() + self.load_rx.len();
        let pending_releases = self.pending_releases.len() + self.release_rx.len();

        ContentStatus {
            frame_count: self.frame_count,
            active_objects: self.active.objects.len(),
            active_files: self.active.files.len(),
            active_archives: self.active.archives.len(),
            active_dependency_sets: self.active.dependency_sets.len(),
            active_scenes: self.active.scenes.len(),
            loading_objects: self.loading_objects.len(),
            pending_loads,
            pending_releases,
            deferred_releases: self.deferred_releases.len(),
            message: format!(
                "objects={} files={} archives={} loading={} pending_loads={} pending_releases={}",
                self.active.objects.len(),
                self.active.files.len(),
                self.active.archives.len(),
                self.loading_objects.len(),
                pending_loads,
                pending_releases,
            ),
        }
    }

    /// Tears the manager down.
    ///
    /// Queued and deferred releases are applied, queued loads are dropped.
    /// Whatever is still resident afterwards is reported, then unloaded
    /// through the backend. The status cache is cleared and the catalog
    /// disposed. Calling it again returns an empty report.
    pub fn cleanup(&mut self) -> LeakReport {
        if self.cleaned {
            return LeakReport::default();
        }
        self.cleaned = true;

        let discarded_loads = self.pending_loads.len() + self.load_rx.try_iter().count();
        self.pending_loads.clear();

        self.pending_releases.extend(self.release_rx.try_iter());
        while let Some(object_id) = self.pending_releases.pop_front() {
            if let Err(err) = self.release_object_impl(object_id) {
                log::warn!("Release of object {object_id} during cleanup failed: {err}");
            }
        }
        if let Err(err) = self.apply_deferred_releases() {
            log::warn!("Deferred release during cleanup failed: {err}");
        }

        let mut report = LeakReport {
            objects: self.active.objects.iter().map(|(id, _, _)| *id).collect(),
            files: self.active.files.iter().map(|(id, _, _)| *id).collect(),
            archives: self.active.archives.iter().map(|(id, _, _)| *id).collect(),
            dependency_sets: self.active.dependency_sets.iter().map(|(index, _, _)| *index).collect(),
            scenes: self.active.scenes.values().map(|scene| scene.scene_id).collect(),
            discarded_loads,
        };
        report.objects.sort_unstable();
        report.files.sort_unstable();
        report.archives.sort_unstable();
        report.dependency_sets.sort_unstable();
        report.scenes.sort_unstable();

        for (handle, _) in self.active.scenes.drain() {
            self.backend.unload_scene(handle);
        }
        for (_, file, _) in self.active.files.drain() {
            self.backend.unload_file(file.handle);
        }
        for (_, archive, _) in self.active.archives.drain() {
            self.backend.unmount_archive(archive.handle);
        }
        self.active.objects.clear();
        self.active.dependency_sets.clear();

        self.loading_objects.clear();
        self.deferred_releases.clear();
        self.status.clear();
        self.catalog.dispose();

        if report.is_clean() {
            log::info!("Runtime content manager cleaned up, nothing leaked");
        } else {
            log::warn!(
                "Runtime content manager cleaned up with leaks: {} objects, {} files, {} archives, {} dependency sets, {} scenes",
                report.objects.len(),
                report.files.len(),
                report.archives.len(),
                report.dependency_sets.len(),
                report.scenes.len(),
            );
        }

        report
    }

    pub(crate) fn apply_deferred_releases(&mut self) -> Result<(), ContentError> {
        while let Some(release) = self.deferred_releases.pop_front() {
            log::trace!(
                "Applying deferred release of archive {} and dependency set {}",
                release.archive_id,
                release.dependency_index
            );
            let archive = self.release_archive(release.archive_id);
            let dependencies = self.release_dependency_set(release.dependency_index);
            archive
                .and(dependencies)
                .map_err(ContentError::into_cascade)?;
        }
        Ok(())
    }

    /// The catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The active tables, for inspection.
    pub fn active(&self) -> &ActiveTables {
        &self.active
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The configuration the manager was created with.
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Number of drains performed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl<B: ContentBackend> Drop for RuntimeContentManager<B> {
    fn drop(&mut self) {
        if !self.cleaned {
            self.cleanup();
        }
    }
}
