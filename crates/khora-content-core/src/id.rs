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

//! Stable identifiers for every kind of content the runtime tracks.
//!
//! Each identifier wraps a 128-bit content hash. They represent the "idea" of
//! a piece of content, completely decoupled from its physical location on
//! disk: the catalog is what turns an id into a path. The default (nil) value
//! is reserved and means "invalid".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// The reserved invalid value.
            pub const INVALID: Self = Self(Uuid::nil());

            /// Wraps an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Builds an identifier from its raw 128-bit value.
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// Derives a deterministic (version 5) identifier from a name.
            ///
            /// The same name always yields the same identifier, which makes
            /// hand-written manifests and tests reproducible.
            pub fn new_v5(name: &str) -> Self {
                Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
            }

            /// Returns `true` unless this is the reserved invalid value.
            pub fn is_valid(&self) -> bool {
                !self.0.is_nil()
            }

            /// Returns the wrapped UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the raw 128-bit value.
            pub fn as_u128(&self) -> u128 {
                self.0.as_u128()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

content_id!(
    /// Identifies a mountable archive containing one or more content files.
    ArchiveId
);

content_id!(
    /// Identifies a loadable content file inside an archive.
    FileId
);

content_id!(
    /// Identifies a single object stored inside a content file.
    ObjectId
);

content_id!(
    /// Identifies a scene stored inside a content file.
    SceneId
);
