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

//! On-disk format of a content file.
//!
//! A content file is an 8-byte magic, a little-endian `u32` version and a
//! `bincode` payload. Object payloads stay opaque bytes until a decoder for
//! their type name turns them into a value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A unique byte sequence to identify Khora content files. ("KHORACNT").
pub const CONTENT_MAGIC_BYTES: [u8; 8] = *b"KHORACNT";

/// The content file version written by this crate.
pub const CONTENT_FORMAT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 8 + 4;

/// One object stored in a content file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedObject {
    /// Identifier of the object inside the file.
    pub local_identifier: i64,
    /// Name used to pick a decoder.
    pub type_name: String,
    /// Encoded object.
    pub payload: Vec<u8>,
}

/// Everything a content file holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFileData {
    /// Objects, in no particular order.
    pub objects: Vec<SerializedObject>,
    /// Names of the scenes stored in the file.
    pub scenes: Vec<String>,
}

/// An error raised while reading or writing a content file.
#[derive(Debug, Error)]
pub enum ContentFileError {
    /// The data is smaller than the header.
    #[error("content file too short for header ({0} bytes)")]
    TooShort(usize),
    /// The data does not start with [`CONTENT_MAGIC_BYTES`].
    #[error("invalid magic bytes; not a Khora content file")]
    InvalidMagic,
    /// Unknown format version.
    #[error("unsupported content file version {0} (expected {CONTENT_FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    /// The payload could not be encoded.
    #[error("failed to encode content file: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The payload could not be decoded.
    #[error("failed to decode content file: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContentFileData {
    /// Adds an object.
    pub fn with_object(
        mut self,
        local_identifier: i64,
        type_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        self.objects.push(SerializedObject {
            local_identifier,
            type_name: type_name.into(),
            payload,
        });
        self
    }

    /// Adds a scene name.
    pub fn with_scene(mut self, name: impl Into<String>) -> Self {
        self.scenes.push(name.into());
        self
    }

    /// Serializes the file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContentFileError> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&CONTENT_MAGIC_BYTES);
        bytes.extend_from_slice(&CONTENT_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parses bytes produced by [`ContentFileData::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContentFileError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ContentFileError::TooShort(bytes.len()));
        }
        if bytes[0..8] != CONTENT_MAGIC_BYTES {
            return Err(ContentFileError::InvalidMagic);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[8..HEADER_SIZE]);
        let version = u32::from_le_bytes(version);
        if version != CONTENT_FORMAT_VERSION {
            return Err(ContentFileError::UnsupportedVersion(version));
        }

        let (data, _) =
            bincode::serde::decode_from_slice(&bytes[HEADER_SIZE..], bincode::config::standard())?;
        Ok(data)
    }

    /// Reads and parses a file from disk.
    pub fn read_from(path: &Path) -> Result<Self, ContentFileError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Serializes and writes the file to disk.
    pub fn write_to(&self, path: &Path) -> Result<(), ContentFileError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
