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

//! Reference-counted loading of files, archives and dependency sets.
//!
//! Loads go top-down: a file first acquires its dependency set, then its
//! archive, and only then asks the backend for itself. Releases walk the same
//! chain back when a count reaches zero.

use khora_content_core::{ArchiveHandle, ArchiveId, ContentBackend, FileHandle, FileId, FileLoadRequest};
use khora_content_data::{ActiveArchive, ActiveDependencySet, ActiveFile, Release};

use super::error::{ContentError, ResourceKind};
use super::manager::RuntimeContentManager;

impl<B: ContentBackend> RuntimeContentManager<B> {
    /// Acquires a content file, loading it on first use.
    pub fn load_file(&mut self, file_id: FileId) -> Result<FileHandle, ContentError> {
        if let Some((file, count)) = self.active.files.acquire(&file_id) {
            log::trace!("File {file_id} acquired (count {count})");
            return Ok(file.handle);
        }
        if !file_id.is_valid() {
            return Err(ContentError::InvalidId(ResourceKind::File));
        }

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

        let handle = self.backend.load_file(FileLoadRequest {
            file_id,
            path: &path,
            dependencies: &dependencies,
            mount,
        });

        self.active.files.insert(
            file_id,
            ActiveFile {
                file_id,
                archive_id,
                dependency_index,
                handle,
            },
        );
        log::debug!("File {file_id} loading from '{path}' ({handle:?})");
        Ok(handle)
    }

    /// Gives back one reference to a content file, unloading it at zero.
    pub fn release_file(&mut self, file_id: FileId) -> Result<(), ContentError> {
        let file = match self.active.files.release(&file_id) {
            None => return Err(ContentError::not_active(ResourceKind::File, file_id)),
            Some(Release::Retained(count)) => {
                log::trace!("File {file_id} released (count {count})");
                return Ok(());
            }
            Some(Release::Removed(file)) => file,
        };

        self.backend.unload_file(file.handle);
        log::debug!("File {file_id} unloaded");

        let archive = self.release_archive(file.archive_id);
        let dependencies = self.release_dependency_set(file.dependency_index);
        archive.and(dependencies).map_err(ContentError::into_cascade)
    }

    /// Acquires an archive, mounting it on first use.
    pub fn load_archive(&mut self, archive_id: ArchiveId) -> Result<ArchiveHandle, ContentError> {
        if let Some((archive, count)) = self.active.archives.acquire(&archive_id) {
            log::trace!("Archive {archive_id} acquired (count {count})");
            return Ok(archive.handle);
        }
        if !archive_id.is_valid() {
            return Err(ContentError::InvalidId(ResourceKind::Archive));
        }

        let path = self
            .catalog
            .try_get_archive_location(archive_id)
            .ok_or(ContentError::UnknownArchive(archive_id))?;
        let handle = self.backend.mount_archive(archive_id, path);

        self.active
            .archives
            .insert(archive_id, ActiveArchive { archive_id, handle });
        log::debug!("Archive {archive_id} mounting from '{path}' ({handle:?})");
        Ok(handle)
    }

    /// Gives back one reference to an archive, unmounting it at zero.
    pub fn release_archive(&mut self, archive_id: ArchiveId) -> Result<(), ContentError> {
        match self.active.archives.release(&archive_id) {
            None => Err(ContentError::not_active(ResourceKind::Archive, archive_id)),
            Some(Release::Retained(count)) => {
                log::trace!("Archive {archive_id} released (count {count})");
                Ok(())
            }
            Some(Release::Removed(archive)) => {
                self.backend.unmount_archive(archive.handle);
                log::debug!("Archive {archive_id} unmounted");
                Ok(())
            }
        }
    }

    /// Acquires a dependency set, loading every file in it on first use.
    ///
    /// Returns one handle per declared file. Invalid ids in the set stand for
    /// the shared global table and get [`FileHandle::PLACEHOLDER`].
    pub fn load_dependency_set(&mut self, index: usize) -> Result<Vec<FileHandle>, ContentError> {
        if let Some((set, count)) = self.active.dependency_sets.acquire(&index) {
            log::trace!("Dependency set {index} acquired (count {count})");
            return Ok(set.handles.clone());
        }

        let files = self
            .catalog
            .dependency_set(index)
            .ok_or(ContentError::DependencyIndexOutOfRange {
                index,
                len: self.catalog.dependency_set_count(),
            })?
            .to_vec();

        if !self.resolving_sets.insert(index) {
            return Err(ContentError::DependencyCycle(index));
        }
        let loaded = self.load_dependency_files(&files);
        self.resolving_sets.remove(&index);
        let handles = loaded?;

        self.active.dependency_sets.insert(
            index,
            ActiveDependencySet {
                handles: handles.clone(),
            },
        );
        if !files.is_empty() {
            log::debug!("Dependency set {index} loaded ({} files)", files.len());
        }
        Ok(handles)
    }

    /// Gives back one reference to a dependency set, releasing its files at
    /// zero.
    pub fn release_dependency_set(&mut self, index: usize) -> Result<(), ContentError> {
        match self.active.dependency_sets.release(&index) {
            None => return Err(ContentError::not_active(ResourceKind::DependencySet, index)),
            Some(Release::Retained(count)) => {
                log::trace!("Dependency set {index} released (count {count})");
                return Ok(());
            }
            Some(Release::Removed(_)) => {}
        }

        let files = self
            .catalog
            .dependency_set(index)
            .ok_or(ContentError::DependencyIndexOutOfRange {
                index,
                len: self.catalog.dependency_set_count(),
            })?
            .to_vec();

        let mut first_error = None;
        for file_id in files.into_iter().filter(FileId::is_valid) {
            if let Err(err) = self.release_file(file_id) {
                first_error.get_or_insert(err.into_cascade());
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn load_dependency_files(&mut self, files: &[FileId]) -> Result<Vec<FileHandle>, ContentError> {
        let mut handles = Vec::with_capacity(files.len());
        for (position, &file_id) in files.iter().enumerate() {
            if !file_id.is_valid() {
                handles.push(FileHandle::PLACEHOLDER);
                continue;
            }
            match self.load_file(file_id) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    for &loaded in files[..position].iter().filter(|id| id.is_valid()) {
                        roll_back(self.release_file(loaded));
                    }
                    return Err(err);
                }
            }
        }
        Ok(handles)
    }
}

/// Undo step of a failed load. The original error is what the caller sees, so
/// a failing undo is only logged.
pub(crate) fn roll_back(result: Result<(), ContentError>) {
    if let Err(err) = result {
        log::error!("Rollback after a failed load did not complete: {err}");
    }
}
