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

use std::time::Duration;

use anyhow::{Context, Result};
use khora_content_core::{
    ArchiveId, ContentBackend, FileHandle, FileId, FileLoadRequest, LoadingStatus, SceneId,
    SceneLoadParams, SceneLoadRequest,
};
use khora_content_infra::{
    utf8_decoder, ContentFileData, FsContentBackend, ObjectDecoderRegistry, SerializedObject,
};
use tempfile::tempdir;

const WAIT: Option<Duration> = Some(Duration::from_secs(5));

fn decoders() -> ObjectDecoderRegistry {
    let mut registry = ObjectDecoderRegistry::new();
    registry.register::<String>("text", utf8_decoder);
    registry
}

fn file_request<'a>(
    path: &'a str,
    mount: khora_content_core::ArchiveHandle,
    dependencies: &'a [FileHandle],
) -> FileLoadRequest<'a> {
    FileLoadRequest {
        file_id: FileId::new_v5(path),
        path,
        dependencies,
        mount,
    }
}

#[test]
fn test_loads_and_decodes_content_files() -> Result<()> {
    // --- 1. ARRANGE ---
    let dir = tempdir()?;
    let archive = dir.path().join("ar1");
    std::fs::create_dir(&archive)?;
    ContentFileData::default()
        .with_object(1, "text", b"hello".to_vec())
        .with_object(2, "mesh", vec![7, 7])
        .write_to(&archive.join("fa.khc"))
        .context("Failed to write content file")?;

    let mut backend = FsContentBackend::new(2, decoders());

    // --- 2. ACT ---
    let mount = backend.mount_archive(ArchiveId::new_v5("ar1"), &archive.to_string_lossy());
    let file = backend.load_file(file_request("fa.khc", mount, &[]));

    // --- 3. ASSERT ---
    assert!(backend.wait_for_file(file, WAIT), "Load should finish");
    assert_eq!(backend.archive_status(mount), LoadingStatus::Completed);
    assert_eq!(backend.file_status(file), LoadingStatus::Completed);

    let text = backend
        .file_object(file, 1)
        .and_then(|value| value.downcast::<String>())
        .context("Object 1 should decode as text")?;
    assert_eq!(text.as_str(), "hello");

    let raw = backend
        .file_object(file, 2)
        .and_then(|value| value.downcast::<SerializedObject>())
        .context("Object 2 should stay serialized")?;
    assert_eq!(raw.payload, vec![7, 7]);

    assert!(backend.file_object(file, 3).is_none());
    Ok(())
}

#[test]
fn test_missing_archive_fails_dependents() -> Result<()> {
    let dir = tempdir()?;
    let mut backend = FsContentBackend::new(1, decoders());

    let mount = backend.mount_archive(
        ArchiveId::new_v5("missing"),
        &dir.path().join("missing").to_string_lossy(),
    );
    let file = backend.load_file(file_request("fa.khc", mount, &[]));

    assert!(backend.wait_for_file(file, WAIT));
    assert_eq!(backend.archive_status(mount), LoadingStatus::Failed);
    assert_eq!(backend.file_status(file), LoadingStatus::Failed);
    Ok(())
}

#[test]
fn test_failed_dependency_fails_the_file() -> Result<()> {
    let dir = tempdir()?;
    let archive = dir.path().join("ar1");
    std::fs::create_dir(&archive)?;
    std::fs::write(archive.join("broken.khc"), b"not a content file")?;
    ContentFileData::default().write_to(&archive.join("fa.khc"))?;

    let mut backend = FsContentBackend::new(2, decoders());
    let mount = backend.mount_archive(ArchiveId::new_v5("ar1"), &archive.to_string_lossy());
    let broken = backend.load_file(file_request("broken.khc", mount, &[]));
    let file = backend.load_file(file_request(
        "fa.khc",
        mount,
        &[FileHandle::PLACEHOLDER, broken],
    ));

    assert!(backend.wait_for_file(file, WAIT));
    assert_eq!(backend.file_status(broken), LoadingStatus::Failed);
    assert_eq!(backend.file_status(file), LoadingStatus::Failed);
    Ok(())
}

#[test]
fn test_scene_requires_its_name_in_the_file() -> Result<()> {
    let dir = tempdir()?;
    let archive = dir.path().join("ar1");
    std::fs::create_dir(&archive)?;
    ContentFileData::default()
        .with_scene("main")
        .write_to(&archive.join("level.khc"))?;

    let mut backend = FsContentBackend::new(1, decoders());
    let mount = backend.mount_archive(ArchiveId::new_v5("ar1"), &archive.to_string_lossy());

    let request = |scene_name: &'static str| SceneLoadRequest {
        scene_id: SceneId::new_v5(scene_name),
        path: "level.khc",
        scene_name,
        dependencies: &[],
        mount,
        params: SceneLoadParams::default(),
    };
    let found = backend.load_scene(request("main"));
    let missing = backend.load_scene(request("other"));

    // Scenes have no blocking wait.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !(backend.scene_status(found).is_done() && backend.scene_status(missing).is_done()) {
        assert!(std::time::Instant::now() < deadline, "Scene loads should finish");
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(backend.scene_status(found), LoadingStatus::Completed);
    assert_eq!(backend.scene_status(missing), LoadingStatus::Failed);

    backend.unload_scene(found);
    assert_eq!(backend.scene_status(found), LoadingStatus::Failed);
    Ok(())
}
