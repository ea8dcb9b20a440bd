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

use std::thread;
use std::time::Duration;

use anyhow::Result;
use khora_content_agents::{ContentError, RuntimeContentManager};
use khora_content_core::catalog::RawCatalogData;
use khora_content_core::{
    ArchiveId, ContentConfig, FileHandle, FileId, ObjectId, ObjectLoadingStatus,
};
use khora_content_data::CatalogBuilder;
use khora_content_infra::{
    BackendEvent, CompletionMode, MemoryContentBackend, MemoryFile,
};

type Manager = RuntimeContentManager<MemoryContentBackend>;

fn identity(name: &str) -> String {
    name.to_string()
}

fn manager_with(raw: &RawCatalogData, backend: MemoryContentBackend) -> Result<Manager> {
    let mut manager = RuntimeContentManager::new(backend, ContentConfig::default());
    manager.load_catalog_data_with(raw, identity, identity)?;
    Ok(manager)
}

/// Archive `Ar1` holding file `Fa` (no dependencies) holding object `Obj1`.
fn single_object_catalog() -> (RawCatalogData, ArchiveId, FileId, ObjectId) {
    let ar1 = ArchiveId::new_v5("Ar1");
    let fa = FileId::new_v5("Fa");
    let obj1 = ObjectId::new_v5("Obj1");

    let mut builder = CatalogBuilder::new();
    builder
        .add_archive(ar1, "ar1")
        .add_file(fa, ar1, "fa", &[])
        .add_object(obj1, fa, 1);
    (builder.build(), ar1, fa, obj1)
}

fn single_object_backend(mode: CompletionMode) -> MemoryContentBackend {
    let backend = MemoryContentBackend::with_mode(mode);
    backend
        .add_archive("ar1")
        .add_file("fa", MemoryFile::new().with_object(1, "payload".to_string()));
    backend
}

#[test]
fn test_single_object_load_and_release() -> Result<()> {
    // --- 1. ARRANGE ---
    let (raw, ar1, fa, obj1) = single_object_catalog();
    let backend = single_object_backend(CompletionMode::Manual);
    let mut manager = manager_with(&raw, backend.clone())?;

    // --- 2. ACT ---
    manager.load_object_async(obj1);

    // --- 3. ASSERT ---
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Queued);

    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Loading);
    assert!(manager.get_object_value::<String>(obj1).is_none());
    assert_eq!(manager.active().files.ref_count(&fa), 1);
    assert_eq!(manager.active().archives.ref_count(&ar1), 1);

    backend.complete_pending();
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Completed);
    let value = manager
        .get_object_value::<String>(obj1)
        .expect("Completed object should expose its value");
    assert_eq!(value.as_str(), "payload");
    assert!(
        manager.get_object_value::<u32>(obj1).is_none(),
        "A value of another type should not be exposed"
    );

    manager.release_object_async(obj1);
    manager.process_queued_commands()?;

    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::None);
    assert!(manager.active().is_empty(), "Release should cascade down to the archive");
    assert!(backend.is_idle());
    assert_eq!(
        backend.events(),
        vec![
            BackendEvent::Mount(ar1),
            BackendEvent::LoadFile(fa),
            BackendEvent::UnloadFile(fa),
            BackendEvent::Unmount(ar1),
        ]
    );
    Ok(())
}

#[test]
fn test_repeated_loads_are_reference_counted() -> Result<()> {
    let (raw, ar1, fa, obj1) = single_object_catalog();
    let backend = single_object_backend(CompletionMode::Immediate);
    let mut manager = manager_with(&raw, backend.clone())?;

    manager.load_objects_async(&[obj1, obj1, obj1]);
    manager.process_queued_commands()?;

    assert_eq!(manager.active().objects.ref_count(&obj1), 3);
    assert_eq!(manager.active().files.ref_count(&fa), 1);
    assert_eq!(manager.active().archives.ref_count(&ar1), 1);

    manager.release_objects_async(&[obj1, obj1]);
    manager.process_queued_commands()?;
    assert_eq!(manager.active().objects.ref_count(&obj1), 1);
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Completed);

    manager.release_object_async(obj1);
    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    assert!(backend.is_idle());
    Ok(())
}

#[test]
fn test_identical_dependency_lists_are_loaded_once() -> Result<()> {
    // --- 1. ARRANGE ---
    let ar = ArchiveId::new_v5("Ar");
    let f1 = FileId::new_v5("F1");
    let f2 = FileId::new_v5("F2");
    let a = FileId::new_v5("A");
    let b = FileId::new_v5("B");
    let obj_a = ObjectId::new_v5("ObjA");
    let obj_b = ObjectId::new_v5("ObjB");

    let mut builder = CatalogBuilder::new();
    builder
        .add_archive(ar, "ar")
        .add_file(f1, ar, "f1", &[])
        .add_file(f2, ar, "f2", &[])
        .add_file(a, ar, "a", &[f1, f2])
        .add_file(b, ar, "b", &[f1, f2])
        .add_object(obj_a, a, 1)
        .add_object(obj_b, b, 1);

    let backend = MemoryContentBackend::new();
    backend.add_archive("ar");
    for path in ["f1", "f2", "a", "b"] {
        backend.add_file(path, MemoryFile::new().with_object(1, path.to_string()));
    }
    let mut manager = manager_with(&builder.build(), backend.clone())?;

    let shared_index = manager
        .catalog()
        .try_get_file_location(a)
        .expect("A is in the catalog")
        .dependency_index;
    assert_eq!(
        manager.catalog().try_get_file_location(b).map(|f| f.dependency_index),
        Some(shared_index)
    );

    // --- 2. ACT ---
    manager.load_object_async(obj_a);
    manager.load_object_async(obj_b);
    manager.process_queued_commands()?;

    // --- 3. ASSERT ---
    assert_eq!(manager.active().dependency_sets.ref_count(&shared_index), 2);
    assert_eq!(manager.active().files.ref_count(&f1), 1);
    assert_eq!(manager.active().files.ref_count(&f2), 1);
    let f1_loads = backend
        .events()
        .iter()
        .filter(|event| **event == BackendEvent::LoadFile(f1))
        .count();
    assert_eq!(f1_loads, 1, "F1 should be loaded exactly once");

    manager.release_object_async(obj_a);
    manager.process_queued_commands()?;
    assert_eq!(manager.active().dependency_sets.ref_count(&shared_index), 1);
    assert!(manager.active().files.contains(&f1));

    manager.release_object_async(obj_b);
    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    assert!(backend.is_idle());
    Ok(())
}

#[test]
fn test_load_and_release_in_one_batch_net_out() -> Result<()> {
    let (raw, _, _, obj1) = single_object_catalog();
    let backend = single_object_backend(CompletionMode::Immediate);
    let mut manager = manager_with(&raw, backend.clone())?;

    // Release submitted before the load of the same batch.
    manager.release_object_async(obj1);
    manager.load_object_async(obj1);
    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::None);

    manager.load_object_async(obj1);
    manager.release_object_async(obj1);
    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    assert!(backend.is_idle());
    Ok(())
}

#[test]
fn test_unknown_object_ends_in_error() -> Result<()> {
    let (raw, _, _, _) = single_object_catalog();
    let mut manager = manager_with(&raw, single_object_backend(CompletionMode::Immediate))?;
    let ghost = ObjectId::new_v5("Ghost");

    manager.load_object_async(ghost);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(ghost), ObjectLoadingStatus::Error);
    assert!(manager.wait_for_object_completion(ghost, 10)?);

    // Releasing the failed request clears it.
    manager.release_object_async(ghost);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(ghost), ObjectLoadingStatus::None);
    Ok(())
}

#[test]
fn test_object_can_be_requested_again_after_catalog_merge() -> Result<()> {
    // --- 1. ARRANGE ---
    let (raw, _, _, obj1) = single_object_catalog();
    let mut manager = manager_with(
        &CatalogBuilder::new().build(),
        single_object_backend(CompletionMode::Immediate),
    )?;
    manager.load_object_async(obj1);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Error);

    // --- 2. ACT ---
    manager.load_catalog_data_with(&raw, identity, identity)?;
    manager.load_object_async(obj1);

    // --- 3. ASSERT ---
    assert_eq!(
        manager.get_object_loading_status(obj1),
        ObjectLoadingStatus::Queued,
        "A new request should start over from Queued"
    );
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Completed);
    assert_eq!(manager.get_object_value::<String>(obj1).as_deref(), Some(&"payload".to_string()));
    assert_eq!(manager.active().objects.ref_count(&obj1), 1);

    // One release for the failed request, one for the loaded object.
    manager.release_object_async(obj1);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Completed);
    manager.release_object_async(obj1);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::None);
    assert!(manager.active().is_empty());
    Ok(())
}

#[test]
fn test_failed_loads_are_balanced_by_releases() -> Result<()> {
    // --- 1. ARRANGE ---
    let (raw, _, _, _) = single_object_catalog();
    let mut manager = manager_with(&raw, single_object_backend(CompletionMode::Immediate))?;
    let ghost = ObjectId::new_v5("Ghost");
    const REQUESTS: usize = 3;

    // --- 2. ACT ---
    for _ in 0..REQUESTS {
        manager.load_object_async(ghost);
    }
    manager.process_queued_commands()?;

    // --- 3. ASSERT ---
    for remaining in (0..REQUESTS).rev() {
        assert_eq!(manager.get_object_loading_status(ghost), ObjectLoadingStatus::Error);
        manager.release_object_async(ghost);
        manager.process_queued_commands()?;
        let expected = if remaining == 0 {
            ObjectLoadingStatus::None
        } else {
            ObjectLoadingStatus::Error
        };
        assert_eq!(manager.get_object_loading_status(ghost), expected);
    }
    assert!(manager.active().is_empty());
    Ok(())
}

#[test]
fn test_release_of_inactive_object_is_not_fatal() -> Result<()> {
    let (raw, _, _, obj1) = single_object_catalog();
    let mut manager = manager_with(&raw, single_object_backend(CompletionMode::Immediate))?;

    manager.release_object_async(obj1);
    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    Ok(())
}

#[test]
fn test_missing_file_is_a_hard_error() -> Result<()> {
    // --- 1. ARRANGE ---
    let (mut raw, _, _, obj1) = single_object_catalog();
    let ghost_file = FileId::new_v5("GhostFile");
    let broken = ObjectId::new_v5("Broken");
    let mut extra = CatalogBuilder::new();
    extra.add_object(broken, ghost_file, 1);
    raw.objects.extend(extra.build().objects);

    let mut manager = manager_with(&raw, single_object_backend(CompletionMode::Immediate))?;

    // --- 2. ACT ---
    manager.load_object_async(broken);
    manager.load_object_async(obj1);
    let err = manager
        .process_queued_commands()
        .expect_err("An object pointing at a missing file should abort the drain");

    // --- 3. ASSERT ---
    assert!(matches!(err, ContentError::UnknownFile(id) if id == ghost_file));
    assert!(err.is_fatal());
    assert_eq!(manager.get_object_loading_status(broken), ObjectLoadingStatus::Error);
    assert_eq!(manager.report_status().pending_loads, 1, "Obj1 should stay queued");

    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Completed);
    Ok(())
}

#[test]
fn test_dependency_cycle_is_reported() -> Result<()> {
    let ar = ArchiveId::new_v5("Ar");
    let a = FileId::new_v5("A");
    let obj = ObjectId::new_v5("Obj");

    let mut builder = CatalogBuilder::new();
    builder
        .add_archive(ar, "ar")
        .add_file(a, ar, "a", &[a])
        .add_object(obj, a, 1);

    let backend = MemoryContentBackend::new();
    backend.add_archive("ar").add_file("a", MemoryFile::new());
    let mut manager = manager_with(&builder.build(), backend.clone())?;

    manager.load_object_async(obj);
    let err = manager
        .process_queued_commands()
        .expect_err("A file depending on itself should be rejected");

    assert!(matches!(err, ContentError::DependencyCycle(_)));
    assert!(manager.active().is_empty(), "A failed load should not leave entries behind");
    assert!(backend.is_idle());
    Ok(())
}

#[test]
fn test_backend_failure_only_affects_its_objects() -> Result<()> {
    let ar = ArchiveId::new_v5("Ar");
    let good_file = FileId::new_v5("Good");
    let bad_file = FileId::new_v5("Bad");
    let good = ObjectId::new_v5("GoodObj");
    let bad = ObjectId::new_v5("BadObj");

    let mut builder = CatalogBuilder::new();
    builder
        .add_archive(ar, "ar")
        .add_file(good_file, ar, "good", &[])
        .add_file(bad_file, ar, "bad", &[])
        .add_object(good, good_file, 1)
        .add_object(bad, bad_file, 1);

    let backend = MemoryContentBackend::new();
    backend
        .add_archive("ar")
        .add_file("good", MemoryFile::new().with_object(1, 1u8))
        .add_file("bad", MemoryFile::new().with_object(1, 2u8))
        .fail_path("bad");
    let mut manager = manager_with(&builder.build(), backend)?;

    manager.load_objects_async(&[good, bad]);
    manager.process_queued_commands()?;

    assert_eq!(manager.get_object_loading_status(good), ObjectLoadingStatus::Completed);
    assert_eq!(manager.get_object_loading_status(bad), ObjectLoadingStatus::Error);
    assert!(
        manager.active().objects.contains(&bad),
        "A failed object stays referenced until it is released"
    );

    manager.release_objects_async(&[good, bad]);
    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    assert_eq!(manager.get_object_loading_status(bad), ObjectLoadingStatus::None);
    Ok(())
}

#[test]
fn test_object_missing_from_loaded_file_is_an_error() -> Result<()> {
    let (raw, _, _, obj1) = single_object_catalog();
    let backend = MemoryContentBackend::new();
    backend.add_archive("ar1").add_file("fa", MemoryFile::new());
    let mut manager = manager_with(&raw, backend)?;

    manager.load_object_async(obj1);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Error);
    Ok(())
}

#[test]
fn test_global_table_entries_become_placeholders() -> Result<()> {
    let ar = ArchiveId::new_v5("Ar");
    let f1 = FileId::new_v5("F1");
    let a = FileId::new_v5("A");
    let obj = ObjectId::new_v5("Obj");

    let mut builder = CatalogBuilder::new();
    builder
        .add_archive(ar, "ar")
        .add_file(f1, ar, "f1", &[])
        .add_file(a, ar, "a", &[FileId::INVALID, f1])
        .add_object(obj, a, 1);

    let backend = MemoryContentBackend::new();
    backend
        .add_archive("ar")
        .add_file("f1", MemoryFile::new())
        .add_file("a", MemoryFile::new().with_object(1, ()));
    let mut manager = manager_with(&builder.build(), backend.clone())?;

    manager.load_object_async(obj);
    manager.process_queued_commands()?;

    let index = manager
        .catalog()
        .try_get_file_location(a)
        .expect("A is in the catalog")
        .dependency_index;
    let set = manager
        .active()
        .dependency_sets
        .get(&index)
        .expect("A's dependency set should be active");
    assert_eq!(set.handles.len(), 2);
    assert_eq!(set.handles[0], FileHandle::PLACEHOLDER);
    assert!(!set.handles[1].is_placeholder());
    assert_eq!(manager.get_object_loading_status(obj), ObjectLoadingStatus::Completed);

    manager.release_object_async(obj);
    manager.process_queued_commands()?;
    assert!(backend.is_idle());
    Ok(())
}

#[test]
fn test_wait_for_object_completion() -> Result<()> {
    // --- 1. ARRANGE ---
    let (raw, _, _, obj1) = single_object_catalog();
    let backend = single_object_backend(CompletionMode::Manual);
    let mut manager = manager_with(&raw, backend.clone())?;

    assert!(
        !manager.wait_for_object_completion(obj1, 10)?,
        "An object never requested cannot complete"
    );

    manager.load_object_async(obj1);
    assert!(
        !manager.wait_for_object_completion(obj1, 10)?,
        "Nothing completes the load yet"
    );
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Loading);

    // --- 2. ACT ---
    let driver = backend.clone();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        driver.complete_pending()
    });
    let completed = manager.wait_for_object_completion(obj1, 0)?;

    // --- 3. ASSERT ---
    assert!(worker.join().is_ok());
    assert!(completed);
    assert_eq!(manager.get_object_loading_status(obj1), ObjectLoadingStatus::Completed);
    Ok(())
}

#[test]
fn test_requests_from_many_threads() -> Result<()> {
    let (raw, _, fa, obj1) = single_object_catalog();
    let backend = single_object_backend(CompletionMode::Immediate);
    let mut manager = manager_with(&raw, backend.clone())?;

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let sender = manager.request_sender();
            thread::spawn(move || {
                for _ in 0..10 {
                    sender.load_object_async(obj1);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("Producer thread panicked");
    }

    manager.process_queued_commands()?;
    assert_eq!(manager.active().objects.ref_count(&obj1), 40);
    assert_eq!(manager.active().files.ref_count(&fa), 1);

    let sender = manager.request_sender();
    thread::spawn(move || {
        for _ in 0..40 {
            sender.release_object_async(obj1);
        }
    })
    .join()
    .expect("Producer thread panicked");

    manager.process_queued_commands()?;
    assert!(manager.active().is_empty());
    assert!(backend.is_idle());
    Ok(())
}

#[test]
fn test_catalog_blob_feeds_the_manager() -> Result<()> {
    let (raw, ar1, _, obj1) = single_object_catalog();
    let backend = MemoryContentBackend::new();
    let config = ContentConfig::default();
    backend
        .add_archive(config.archive_path("ar1"))
        .add_file("fa", MemoryFile::new().with_object(1, 5i32));

    let mut manager = RuntimeContentManager::new(backend, config.clone());
    let summary = manager.load_catalog_bytes(&raw.to_bytes()?)?;
    assert_eq!(summary.objects, 1);
    assert_eq!(
        manager.catalog().try_get_archive_location(ar1),
        Some(config.archive_path("ar1").as_str())
    );

    manager.load_object_async(obj1);
    manager.process_queued_commands()?;
    assert_eq!(manager.get_object_value::<i32>(obj1).as_deref(), Some(&5));

    let status = manager.report_status();
    assert_eq!(status.active_objects, 1);
    assert_eq!(status.active_files, 1);
    assert_eq!(status.active_archives, 1);
    assert_eq!(status.frame_count, 1);
    assert_eq!(status.pending_loads, 0);
    Ok(())
}
