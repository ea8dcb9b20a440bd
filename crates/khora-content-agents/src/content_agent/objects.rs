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

//! The object state machine: `None → Queued → Loading → Completed | Error`.

use khora_content_core::{ContentBackend, LoadingStatus, ObjectId, ObjectLoadingStatus};
use khora_content_data::{ActiveObject, Release};

use super::error::{ContentError, ResourceKind};
use super::manager::RuntimeContentManager;

impl<B: ContentBackend> RuntimeContentManager<B> {
    pub(crate) fn load_object_impl(&mut self, object_id: ObjectId) -> Result<(), ContentError> {
        if let Some((_, count)) = self.active.objects.acquire(&object_id) {
            log::trace!("Object {object_id} acquired (count {count})");
            // Re-requesting an active object in `Error` queued it again.
            // Watch it so the backend decides its status.
            if self.status.resume_loading(object_id)
                && !self.loading_objects.contains(&object_id)
            {
                self.loading_objects.push(object_id);
            }
            return Ok(());
        }

        let location = match self.catalog.try_get_object_location(object_id) {
            Some(location) if object_id.is_valid() => location,
            _ => {
                log::warn!("Object {object_id} is not in the catalog");
                self.status.fail_request(object_id);
                return Ok(());
            }
        };

        if let Err(err) = self.load_file(location.file_id) {
            self.status.fail_request(object_id);
            return Err(err);
        }

        self.active.objects.insert(
            object_id,
            ActiveObject {
                object_id,
                file_id: location.file_id,
                local_identifier: location.local_identifier,
            },
        );
        self.status.set(object_id, ObjectLoadingStatus::Loading);
        self.loading_objects.push(object_id);
        log::debug!("Object {object_id} loading from file {}", location.file_id);
        Ok(())
    }

    pub(crate) fn release_object_impl(&mut self, object_id: ObjectId) -> Result<(), ContentError> {
        // Loads that failed without an active object are only counted in
        // the status cache. They are balanced first.
        if self.status.release_failed(object_id) {
            log::trace!("Released failed request for object {object_id}");
            return Ok(());
        }

        let object = match self.active.objects.release(&object_id) {
            None => return Err(ContentError::not_active(ResourceKind::Object, object_id)),
            Some(Release::Retained(count)) => {
                log::trace!("Object {object_id} released (count {count})");
                return Ok(());
            }
            Some(Release::Removed(object)) => object,
        };

        self.loading_objects.retain(|id| *id != object_id);
        self.status.release_active(object_id);
        log::debug!("Object {object_id} released");

        self.release_file(object.file_id)
            .map_err(ContentError::into_cascade)
    }

    /// Polls the backend for every object still loading.
    ///
    /// Runs at the end of each drain; call it directly to refresh statuses
    /// between drains.
    pub fn update_loading_status(&mut self) {
        let watched = std::mem::take(&mut self.loading_objects);
        let mut still_loading = Vec::with_capacity(watched.len());

        for object_id in watched {
            let Some(object) = self.active.objects.get(&object_id) else {
                continue;
            };
            let Some(file) = self.active.files.get(&object.file_id) else {
                log::error!("Object {object_id} is active but file {} is not", object.file_id);
                self.status.set(object_id, ObjectLoadingStatus::Error);
                continue;
            };

            match self.backend.file_status(file.handle) {
                LoadingStatus::InProgress => still_loading.push(object_id),
                LoadingStatus::Completed => {
                    match self.backend.file_object(file.handle, object.local_identifier) {
                        Some(value) => {
                            self.status.set_completed(object_id, value);
                            log::debug!("Object {object_id} completed");
                        }
                        None => {
                            log::warn!(
                                "File {} loaded but has no object {} for {object_id}",
                                object.file_id,
                                object.local_identifier
                            );
                            self.status.set(object_id, ObjectLoadingStatus::Error);
                        }
                    }
                }
                LoadingStatus::Failed => {
                    log::warn!("File {} failed to load, object {object_id} is in error", object.file_id);
                    self.status.set(object_id, ObjectLoadingStatus::Error);
                }
            }
        }

        self.loading_objects = still_loading;
    }
}
