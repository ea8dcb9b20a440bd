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

use anyhow::{Context, Result};

use crate::manifest::CatalogManifest;

/// Builds a catalog blob from a RON manifest.
pub fn run(manifest_path: &Path, output: &Path) -> Result<()> {
    let source = fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
    let raw = CatalogManifest::from_ron(&source)?.to_raw()?;
    let bytes = raw.to_bytes().context("Failed to serialize catalog")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!(
        "Packed {} archives, {} files, {} objects, {} scenes and {} dependency sets into {} ({} bytes)",
        raw.archives.len(),
        raw.files.len(),
        raw.objects.len(),
        raw.scenes.len(),
        raw.dependencies.len(),
        output.display(),
        bytes.len()
    );
    Ok(())
}
