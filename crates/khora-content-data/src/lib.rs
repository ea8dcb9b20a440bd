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

//! # Khora Content Data
//!
//! Data layouts of the content runtime: the read-only [`Catalog`] that maps
//! ids to locations, the [`CatalogBuilder`] that produces catalogs, and the
//! reference-counted [`ActiveTables`] that track what is resident.

#![warn(missing_docs)]

pub mod active;
pub mod builder;
pub mod catalog;

pub use active::{
    ActiveArchive, ActiveDependencySet, ActiveFile, ActiveObject, ActiveScene, ActiveTables,
    RefCountedTable, Release,
};
pub use builder::CatalogBuilder;
pub use catalog::{
    Catalog, CatalogError, CatalogLoadSummary, ObjectLocation, ResolvedFile,
};
