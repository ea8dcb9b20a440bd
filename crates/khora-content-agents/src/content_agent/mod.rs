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

//! The content agent: a reference-counted, dependency-aware loader.

mod error;
mod loading;
mod manager;
mod objects;
mod queue;
mod report;
mod scenes;
mod status_cache;

pub use error::{ContentError, ResourceKind};
pub use manager::RuntimeContentManager;
pub use queue::ContentRequestSender;
pub use report::{ContentStatus, LeakReport};
