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

//! # Khora Content Infra
//!
//! Concrete implementations of the content backend contract: an in-memory
//! backend for tests and tools, and a threaded filesystem backend reading
//! content files from archive directories.

#![warn(missing_docs)]

pub mod backend;
pub mod content_file;
pub mod decoder;

pub use backend::{
    BackendError, BackendEvent, CompletionMode, FsContentBackend, MemoryContentBackend, MemoryFile,
};
pub use content_file::{ContentFileData, ContentFileError, SerializedObject};
pub use decoder::{utf8_decoder, ObjectDecoder, ObjectDecoderRegistry};
