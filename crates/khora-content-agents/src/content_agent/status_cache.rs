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

//! Object statuses and values shared between producers and the drain.
//!
//! Besides the status, each entry counts the loads queued but not yet
//! drained and the drained loads that failed without an active object.
//! An entry is dropped only when both counts are zero and the object was
//! released, so a status never reads `None` while a load is still queued.

use ahash::AHashMap;
use khora_content_core::{ObjectId, ObjectLoadingStatus, ObjectValue};
use parking_lot::Mutex;

#[derive(Debug)]
struct StatusEntry {
    status: ObjectLoadingStatus,
    value: Option<ObjectValue>,
    pending: u32,
    failed: u32,
}

impl StatusEntry {
    fn new(status: ObjectLoadingStatus) -> Self {
        Self {
            status,
            value: None,
            pending: 0,
            failed: 0,
        }
    }
}

/// The only piece of manager state readable from any thread.
#[derive(Debug, Default)]
pub(crate) struct StatusCache {
    entries: Mutex<AHashMap<ObjectId, StatusEntry>>,
}

impl StatusCache {
    /// Counts a new load request. `None` and `Error` become `Queued`, any
    /// other status is kept.
    pub(crate) fn mark_queued(&self, object_id: ObjectId) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(object_id)
            .or_insert_with(|| StatusEntry::new(ObjectLoadingStatus::None));
        entry.pending += 1;
        if matches!(
            entry.status,
            ObjectLoadingStatus::None | ObjectLoadingStatus::Error
        ) {
            entry.status = ObjectLoadingStatus::Queued;
            entry.value = None;
        }
    }

    /// The drain picked up one queued load.
    pub(crate) fn take_queued(&self, object_id: ObjectId) {
        if let Some(entry) = self.entries.lock().get_mut(&object_id) {
            entry.pending = entry.pending.saturating_sub(1);
        }
    }

    /// Sets a status without a value. Any cached value is dropped.
    pub(crate) fn set(&self, object_id: ObjectId, status: ObjectLoadingStatus) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(object_id)
            .or_insert_with(|| StatusEntry::new(status));
        entry.status = status;
        entry.value = None;
    }

    pub(crate) fn set_completed(&self, object_id: ObjectId, value: ObjectValue) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(object_id)
            .or_insert_with(|| StatusEntry::new(ObjectLoadingStatus::Completed));
        entry.status = ObjectLoadingStatus::Completed;
        entry.value = Some(value);
    }

    /// A `Queued` object that turned out to be active again goes back to
    /// `Loading`. Returns whether it did.
    pub(crate) fn resume_loading(&self, object_id: ObjectId) -> bool {
        match self.entries.lock().get_mut(&object_id) {
            Some(entry) if entry.status == ObjectLoadingStatus::Queued => {
                entry.status = ObjectLoadingStatus::Loading;
                true
            }
            _ => false,
        }
    }

    /// A load ended in `Error` without leaving an active object. The
    /// request still owes a release.
    pub(crate) fn fail_request(&self, object_id: ObjectId) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(object_id)
            .or_insert_with(|| StatusEntry::new(ObjectLoadingStatus::Error));
        entry.status = ObjectLoadingStatus::Error;
        entry.value = None;
        entry.failed += 1;
    }

    /// Balances one release against a failed request. Returns `false` when
    /// there is none to balance.
    ///
    /// The last one clears an `Error` status unless a load is still queued.
    /// A retry that got further keeps its status.
    pub(crate) fn release_failed(&self, object_id: ObjectId) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&object_id) else {
            return false;
        };
        if entry.failed == 0 {
            return false;
        }
        entry.failed -= 1;
        if entry.failed == 0 && entry.pending == 0 && entry.status == ObjectLoadingStatus::Error {
            entries.remove(&object_id);
        }
        true
    }

    /// The last reference to an active object is gone.
    ///
    /// The entry is dropped unless loads are still queued, which keep it
    /// `Queued`, or failed requests still owe releases, which keep it
    /// `Error`.
    pub(crate) fn release_active(&self, object_id: ObjectId) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&object_id) else {
            return;
        };
        entry.value = None;
        if entry.pending > 0 {
            entry.status = ObjectLoadingStatus::Queued;
        } else if entry.failed > 0 {
            entry.status = ObjectLoadingStatus::Error;
        } else {
            entries.remove(&object_id);
        }
    }

    pub(crate) fn status(&self, object_id: ObjectId) -> ObjectLoadingStatus {
        self.entries
            .lock()
            .get(&object_id)
            .map_or(ObjectLoadingStatus::None, |entry| entry.status)
    }

    /// The cached value, only present once the object completed.
    pub(crate) fn value(&self, object_id: ObjectId) -> Option<ObjectValue> {
        self.entries
            .lock()
            .get(&object_id)
            .and_then(|entry| entry.value.clone())
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }
}
