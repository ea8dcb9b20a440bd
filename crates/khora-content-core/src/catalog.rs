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

//! Defines the serialized, flat form of a content catalog.
//!
//! A catalog blob is a fixed-size header followed by a `bincode` payload. The
//! header identifies the file type and the format version so the runtime can
//! refuse data it does not understand before decoding anything. The payload
//! is a [`RawCatalogData`]: plain arrays of locations that reference each
//! other and a shared string table by index.

use crate::id::{ArchiveId, FileId, ObjectId, SceneId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique byte sequence to identify Khora catalog blobs. ("KHORACAT").
pub const CATALOG_MAGIC_BYTES: [u8; 8] = *b"KHORACAT";

/// The catalog format version written by this crate.
pub const CATALOG_FORMAT_VERSION: u32 = 1;

/// Index of a string inside [`RawCatalogData::strings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringIndex(pub u32);

/// Where an archive lives, as stored in the blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArchiveLocation {
    /// The archive being described.
    pub archive_id: ArchiveId,
    /// Untransformed archive name or path.
    pub path: StringIndex,
}

/// Where a content file lives and what it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFileLocation {
    /// The file being described.
    pub file_id: FileId,
    /// The archive that contains the file.
    pub archive_id: ArchiveId,
    /// Index into [`RawCatalogData::dependencies`].
    pub dependency_index: u32,
    /// Untransformed file name inside the archive.
    pub path: StringIndex,
}

/// Where an object lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObjectLocation {
    /// The object being described.
    pub object_id: ObjectId,
    /// The file that contains the object.
    pub file_id: FileId,
    /// Identifier of the object inside its file.
    pub local_identifier: i64,
}

/// Where a scene lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSceneLocation {
    /// The scene being described.
    pub scene_id: SceneId,
    /// The file that contains the scene.
    pub file_id: FileId,
    /// Name of the scene.
    pub scene_name: StringIndex,
}

/// The flat tables of a serialized catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCatalogData {
    /// All archives.
    pub archives: Vec<RawArchiveLocation>,
    /// All content files.
    pub files: Vec<RawFileLocation>,
    /// All objects.
    pub objects: Vec<RawObjectLocation>,
    /// All scenes.
    pub scenes: Vec<RawSceneLocation>,
    /// Dependency sets. Each set is an ordered list of file ids; an invalid
    /// id stands for the shared global table and is never loaded.
    pub dependencies: Vec<Vec<FileId>>,
    /// String table backing every path and name.
    pub strings: Vec<String>,
}

/// An error raised while reading or writing a catalog blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFormatError {
    /// The blob is smaller than the fixed-size header.
    TooShort {
        /// Number of bytes available.
        len: usize,
    },
    /// The blob does not start with [`CATALOG_MAGIC_BYTES`].
    InvalidMagic,
    /// The blob was written with a format version this crate cannot read.
    UnsupportedVersion {
        /// The version found in the header.
        found: u32,
    },
    /// The header announces more payload than the blob contains.
    Truncated {
        /// Payload length announced by the header.
        expected: u64,
        /// Payload bytes actually present.
        available: usize,
    },
    /// The payload could not be encoded.
    Encode(String),
    /// The payload could not be decoded.
    Decode(String),
}

impl fmt::Display for CatalogFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogFormatError::TooShort { len } => {
                write!(f, "Catalog blob too short for header ({len} bytes)")
            }
            CatalogFormatError::InvalidMagic => {
                write!(f, "Invalid magic bytes; not a Khora catalog")
            }
            CatalogFormatError::UnsupportedVersion { found } => write!(
                f,
                "Unsupported catalog format version {found} (expected {CATALOG_FORMAT_VERSION})"
            ),
            CatalogFormatError::Truncated {
                expected,
                available,
            } => write!(
                f,
                "Catalog payload truncated: header announces {expected} bytes, {available} available"
            ),
            CatalogFormatError::Encode(msg) => write!(f, "Failed to encode catalog: {msg}"),
            CatalogFormatError::Decode(msg) => write!(f, "Failed to decode catalog: {msg}"),
        }
    }
}

impl std::error::Error for CatalogFormatError {}

/// Fixed-size header: magic, version, payload length.
const HEADER_SIZE: usize = 8 + 4 + 8;

// The header is a fixed byte layout so it can be checked before touching the
// payload decoder; only the payload goes through serde.
impl RawCatalogData {
    /// Serializes the catalog into a versioned blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CatalogFormatError> {
        let config = bincode::config::standard();
        let payload = bincode::serde::encode_to_vec(self, config)
            .map_err(|e| CatalogFormatError::Encode(e.to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&CATALOG_MAGIC_BYTES);
        bytes.extend_from_slice(&CATALOG_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parses a versioned blob produced by [`RawCatalogData::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CatalogFormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CatalogFormatError::TooShort { len: bytes.len() });
        }
        if bytes[0..8] != CATALOG_MAGIC_BYTES {
            return Err(CatalogFormatError::InvalidMagic);
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[8..12]);
        let version = u32::from_le_bytes(version);
        if version != CATALOG_FORMAT_VERSION {
            return Err(CatalogFormatError::UnsupportedVersion { found: version });
        }

        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[12..HEADER_SIZE]);
        let length = u64::from_le_bytes(length);

        let payload = &bytes[HEADER_SIZE..];
        if (payload.len() as u64) < length {
            return Err(CatalogFormatError::Truncated {
                expected: length,
                available: payload.len(),
            });
        }

        let config = bincode::config::standard();
        let (data, _): (RawCatalogData, _) =
            bincode::serde::decode_from_slice(&payload[..length as usize], config)
                .map_err(|e| CatalogFormatError::Decode(e.to_string()))?;
        Ok(data)
    }

    /// Looks up a string by index.
    pub fn string(&self, index: StringIndex) -> Option<&str> {
        self.strings.get(index.0 as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawCatalogData {
        let archive = ArchiveId::new_v5("ar1");
        let file = FileId::new_v5("fa");
        RawCatalogData {
            archives: vec![RawArchiveLocation {
                archive_id: archive,
                path: StringIndex(0),
            }],
            files: vec![RawFileLocation {
                file_id: file,
                archive_id: archive,
                dependency_index: 0,
                path: StringIndex(1),
            }],
            objects: vec![RawObjectLocation {
                object_id: ObjectId::new_v5("obj1"),
                file_id: file,
                local_identifier: 7,
            }],
            scenes: vec![],
            dependencies: vec![vec![]],
            strings: vec!["ar1".to_string(), "fa".to_string()],
        }
    }

    #[test]
    fn test_blob_round_trip() {
        let data = sample();
        let bytes = data.to_bytes().unwrap();
        assert_eq!(&bytes[0..8], &CATALOG_MAGIC_BYTES);

        let decoded = RawCatalogData::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(decoded.string(StringIndex(1)), Some("fa"));
        assert_eq!(decoded.string(StringIndex(9)), None);
    }

    #[test]
    fn test_rejects_bad_header() {
        assert_eq!(
            RawCatalogData::from_bytes(&[0u8; 4]),
            Err(CatalogFormatError::TooShort { len: 4 })
        );

        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        assert_eq!(
            RawCatalogData::from_bytes(&bytes),
            Err(CatalogFormatError::InvalidMagic)
        );
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[8..12].copy_from_slice(&99u32.to_le_bytes());
        assert_eq!(
            RawCatalogData::from_bytes(&bytes),
            Err(CatalogFormatError::UnsupportedVersion { found: 99 })
        );
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = sample().to_bytes().unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            RawCatalogData::from_bytes(cut),
            Err(CatalogFormatError::Truncated { .. })
        ));
    }
}
