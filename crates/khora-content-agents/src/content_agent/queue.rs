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

//! The producer side of the content request queues.
//!
//! Loads and releases travel on two separate channels so the drain can apply
//! every load of a batch before any release of the same batch.

use super::status_cache::StatusCache;
use crossbeam_channel::{Receiver, Sender};
use khora_content_core::{ObjectId, ObjectLoadingStatus};
use std::any::Any;
use std::sync::Arc;

pub(crate) struct RequestReceivers {
    pub(crate) loads: Receiver<ObjectId>,
    pub(crate) releases: Receiver<ObjectId>,
}

/// A cloneable handle for requesting objects from any thread.
///
/// Requests take effect on the next
/// [`process_queued_commands`](super::RuntimeContentManager::process_queued_commands).
#[derive(Clone)]
pub struct ContentRequestSender {
    loads: Sender<ObjectId>,
    releases: Sender<ObjectId>,
    status: Arc<StatusCache>,
}

impl ContentRequestSender {
    pub(crate) fn channel(status: Arc<StatusCache>) -> (Self, RequestReceivers) {
        let (load_tx, load_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        (
            Self {
                loads: load_tx,
                releases: release_tx,
                status,
            },
            RequestReceivers {
                loads: load_rx,
                releases: release_rx,
            },
        )
    }

    /// Requests an object.
    pub fn load_object_async(&self, object_id: ObjectId) {
        self.status.mark_queued(object_id);
        if self.loads.send(object_id).is_err() {
            log::warn!("Content manager is gone, dropping load of object {object_id}");
            return;
        }
        log::trace!("Queued load of object {object_id}");
    }

    /// Requests several objects.
    pub fn load_objects_async(&self, object_ids: &[ObjectId]) {
        for &object_id in object_ids {
            self.load_object_async(object_id);
        }
    }

    /// Gives back one reference to an object.
    pub fn release_object_async(&self, object_id: ObjectId) {
        if self.releases.send(object_id).is_err() {
            log::warn!("Content manager is gone, dropping release of object {object_id}");
            return;
        }
        log::trace!("Queued release of object {object_id}");
    }

    /// Gives back one reference to each object.
    pub fn release_objects_async(&self, object_ids: &[ObjectId]) {
        for &object_id in object_ids {
            self.release_object_async(object_id);
        }
    }

    /// Current status of an object.
    pub fn get_object_loading_status(&self, object_id: ObjectId) -> ObjectLoadingStatus {
        self.status.status(object_id)
    }

    /// The loaded object, if it completed and is a `T`.
    pub fn get_object_value<T: Any + Send + Sync>(&self, object_id: ObjectId) -> Option<Arc<T>> {
        self.status.value(object_id)?.downcast::<T>()
    }
}

impl std::fmt::Debug for ContentRequestSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRequestSender")
            .field("queued_loads", &self.loads.len())
            .field("queued_releases", &self.releases.len())
            .finish()
    }
}
