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

use anyhow::{bail, Context, Result};
use khora_content_agents::RuntimeContentManager;
use khora_content_core::{ContentBackend, ContentConfig, ObjectId, ObjectLoadingStatus};
use khora_content_infra::{utf8_decoder, FsContentBackend, ObjectDecoderRegistry, SerializedObject};

use crate::manifest::resolve_id;

fn decoders() -> ObjectDecoderRegistry {
    let mut registry = ObjectDecoderRegistry::new();
    registry.register::<String>("text", utf8_decoder);
    registry
}

fn describe<B: ContentBackend>(manager: &RuntimeContentManager<B>, object_id: ObjectId) -> String {
    if let Some(text) = manager.get_object_value::<String>(object_id) {
        return format!("text {text:?}");
    }
    match manager.get_object_value::<SerializedObject>(object_id) {
        Some(raw) => format!("'{}', {} bytes", raw.type_name, raw.payload.len()),
        None => "no value".to_string(),
    }
}

/// Loads objects through the filesystem backend, reports them, then
/// releases them and checks that nothing leaked.
pub fn run(
    config: ContentConfig,
    catalog_path: &Path,
    objects: &[String],
    timeout_ms: Option<u64>,
) -> Result<()> {
    let bytes = fs::read(catalog_path)
        .with_context(|| format!("Failed to read catalog {}", catalog_path.display()))?;
    let timeout_ms = timeout_ms.unwrap_or(config.wait_timeout_ms);

    let backend = FsContentBackend::from_config(&config, decoders());
    let mut manager = RuntimeContentManager::new(backend, config);
    manager
        .load_catalog_bytes(&bytes)
        .with_context(|| format!("Invalid catalog {}", catalog_path.display()))?;

    let object_ids: Vec<ObjectId> = objects
        .iter()
        .map(|text| resolve_id(text, ObjectId::new_v5))
        .collect();
    manager.load_objects_async(&object_ids);

    let mut failed = 0;
    for (text, object_id) in objects.iter().zip(&object_ids) {
        let finished = manager
            .wait_for_object_completion(*object_id, timeout_ms)
            .context("Failed to process content requests")?;
        let status = manager.get_object_loading_status(*object_id);
        if !finished || status != ObjectLoadingStatus::Completed {
            failed += 1;
        }
        match status {
            ObjectLoadingStatus::Completed => {
                println!("{text} ({object_id}): {} [{}]", status.as_str(), describe(&manager, *object_id));
            }
            _ if !finished => println!("{text} ({object_id}): timed out while {}", status.as_str()),
            _ => println!("{text} ({object_id}): {}", status.as_str()),
        }
    }

    manager.release_objects_async(&object_ids);
    manager
        .process_queued_commands()
        .context("Failed to release objects")?;
    println!("{}", manager.report_status().message);

    let report = manager.cleanup();
    if !report.is_clean() {
        log::warn!("{} entries leaked: {report:?}", report.leaked_count());
    }

    if failed > 0 {
        bail!("{failed} of {} objects did not load", object_ids.len());
    }
    Ok(())
}
