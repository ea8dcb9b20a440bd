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

//! Scene instances.
//!
//! A scene holds its file's archive and dependency set, not the file itself.
//! Those are given back one drain after the scene is unloaded, so the backend
//! has finished tearing the scene down before its dependencies go away.

use khora_content_core::{
    ContentBackend, LoadingStatus, SceneHandle, SceneId, SceneLoadParams, SceneLoadRequest,
};
use khora_content_data::ActiveScene;

use super::error::{ContentError, ResourceKind};
use super::loading::roll_back;
use super::manager::{DeferredRelease, RuntimeContentManager};

impl<B: ContentBackend> RuntimeContentManager<B> {
    /// Starts loading an instance of a scene.
    ///
    /// Every call creates a new instance with its own handle.
    pub fn load_scene_async(
        &mut self,
        scene_id: SceneId,
        params: SceneLoadParams,
    ) -> Result<SceneHandle, ContentError> {
        if !scene_id.is_valid() {
            return Err(ContentError::InvalidId(ResourceKind::Scene));
        }

        let (file_id, scene_name) = self
            .catalog
            .try_get_scene_location(scene_id)
            .map(|(file_id, name)| (file_id, name.to_string()))
            .ok_or(ContentError::UnknownScene(scene_id))?;
        let (archive_id, dependency_index, path) = {
            let location = self
                .catalog
                .try_get_file_location(file_id)
                .ok_or(ContentError::UnknownFile(file_id))?;
            (
                location.archive_id,
                location.dependency_index,
                location.path.to_string(),
            )
        };

        let dependencies = self.load_dependency_set(dependency_index)?;
        let mount = match self.load_archive(archive_id) {
            Ok(mount) => mount,
            Err(err) => {
                roll_back(self.release_dependency_set(dependency_index));
                return Err(err);
            }
        };

        let handle = self.backend.load_scene(SceneLoadRequest {
            scene_id,
            path: &path,
            scene_name: &scene_name,
            dependencies: &dependencies,
            mount,
            params,
        });

        self.active.scenes.insert(
            handle,
            ActiveScene {
                scene_id,
                file_id,
                archive_id,
                dependency_index,
                handle,
            },
        );
        log::info!("Scene '{scene_name}' ({scene_id}) loading as {handle:?}");
        Ok(handle)
    }

    /// Progress of a scene instance, `None` if the handle is unknown.
    pub fn get_scene_status(&self, handle: SceneHandle) -> Option<LoadingStatus> {
        self.active
            .scenes
            .contains_key(&handle)
            .then(|| self.backend.scene_status(handle))
    }

    /// Unloads a scene instance.
    ///
    /// The archive and dependency set it held are released at the start of
    /// the next [`process_queued_commands`](Self::process_queued_commands).
    pub fn unload_scene(&mut self, handle: SceneHandle) -> Result<(), ContentError> {
        let scene = self
            .active
            .scenes
            .remove(&handle)
            .ok_or_else(|| ContentError::not_active(ResourceKind::Scene, format!("{handle:?}")))?;

        self.backend.unload_scene(handle);
        self.deferred_releases.push_back(DeferredRelease {
            archive_id: scene.archive_id,
            dependency_index: scene.dependency_index,
        });
        log::info!("Scene {} unloaded, releasing its dependencies next drain", scene.scene_id);
        Ok(())
    }
}
