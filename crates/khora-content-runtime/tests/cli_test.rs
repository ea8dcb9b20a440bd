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

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use khora_content_infra::ContentFileData;
use tempfile::tempdir;

const MANIFEST: &str = r#"(
    archives: [(id: "Ar1", path: "ar1")],
    files: [(id: "Fa", archive: "Ar1", path: "fa.khc")],
    objects: [
        (id: "Hello", file: "Fa", local_identifier: 1),
        (id: "Mesh", file: "Fa", local_identifier: 2),
        (id: "Lost", file: "Fa", local_identifier: 3),
    ],
)"#;

fn run(args: &[&str], dir: &Path) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_khora-content-runtime"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .output()
        .context("Failed to start the runtime binary")
}

#[test]
fn test_pack_inspect_and_load() -> Result<()> {
    // --- 1. ARRANGE ---
    let dir = tempdir()?;
    fs::write(dir.path().join("manifest.ron"), MANIFEST)?;
    let archive = dir.path().join("content").join("ar1");
    fs::create_dir_all(&archive)?;
    ContentFileData::default()
        .with_object(1, "text", b"hello".to_vec())
        .with_object(2, "mesh", vec![0; 12])
        .write_to(&archive.join("fa.khc"))?;

    // --- 2. ACT & ASSERT ---
    let packed = run(&["pack", "manifest.ron", "-o", "build/catalog.bin"], dir.path())?;
    assert!(packed.status.success(), "pack failed: {packed:?}");
    assert!(dir.path().join("build/catalog.bin").is_file());

    let inspected = run(&["inspect", "build/catalog.bin", "--json"], dir.path())?;
    assert!(inspected.status.success(), "inspect failed: {inspected:?}");
    let report: serde_json::Value = serde_json::from_slice(&inspected.stdout)?;
    assert_eq!(report["archives"][0]["path"], "ar1");
    assert_eq!(report["files"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["objects"].as_array().map(Vec::len), Some(3));

    // The default configuration resolves archives under `content/`.
    let loaded = run(
        &["load", "build/catalog.bin", "--object", "Hello", "--object", "Mesh"],
        dir.path(),
    )?;
    assert!(loaded.status.success(), "load failed: {loaded:?}");
    let stdout = String::from_utf8_lossy(&loaded.stdout);
    assert!(stdout.contains("\"hello\""), "Unexpected output: {stdout}");
    assert!(stdout.contains("'mesh', 12 bytes"), "Unexpected output: {stdout}");

    let lost = run(&["load", "build/catalog.bin", "--object", "Lost"], dir.path())?;
    assert!(!lost.status.success(), "An object missing from its file should fail the command");
    Ok(())
}

#[test]
fn test_config_file_moves_the_archive_root() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("manifest.ron"), MANIFEST)?;
    let archive = dir.path().join("packed").join("ar1.arc");
    fs::create_dir_all(&archive)?;
    ContentFileData::default()
        .with_object(1, "text", b"moved".to_vec())
        .write_to(&archive.join("fa.khc"))?;
    fs::write(
        dir.path().join("content.ron"),
        r#"(archive_root: "packed", archive_extension: Some("arc"), worker_threads: 1)"#,
    )?;

    let packed = run(&["pack", "manifest.ron", "-o", "catalog.bin"], dir.path())?;
    assert!(packed.status.success(), "pack failed: {packed:?}");

    let loaded = run(
        &["--config", "content.ron", "load", "catalog.bin", "--object", "Hello"],
        dir.path(),
    )?;
    assert!(loaded.status.success(), "load failed: {loaded:?}");
    assert!(String::from_utf8_lossy(&loaded.stdout).contains("\"moved\""));

    let missing = run(&["--config", "missing.ron", "inspect", "catalog.bin"], dir.path())?;
    assert!(!missing.status.success(), "A missing config file should be reported");
    Ok(())
}
