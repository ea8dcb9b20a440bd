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

//! Append-only string table backing every path and name of the catalog.

/// Index of a string inside [`ManagedStrings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StringId(u32);

#[derive(Debug, Default)]
pub(crate) struct ManagedStrings {
    strings: Vec<String>,
}

impl ManagedStrings {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, value: String) -> StringId {
        let id = StringId(self.strings.len() as u32);
        self.strings.push(value);
        id
    }

    pub(crate) fn get(&self, id: StringId) -> &str {
        // Ids are only ever produced by `push` on this table.
        &self.strings[id.0 as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.strings.len()
    }
}
