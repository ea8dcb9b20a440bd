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

//! A registry of object decoders, selected by the type name stored next to
//! each serialized object.

use crate::content_file::SerializedObject;
use ahash::AHashMap;
use khora_content_core::ObjectValue;
use std::any::Any;
use std::error::Error;
use std::marker::PhantomData;

/// Turns the payload of a serialized object into a value of type `T`.
pub trait ObjectDecoder<T>: Send + Sync {
    /// Decodes a payload.
    fn decode(&self, payload: &[u8]) -> Result<T, Box<dyn Error + Send + Sync>>;
}

impl<T, F> ObjectDecoder<T> for F
where
    F: Fn(&[u8]) -> Result<T, Box<dyn Error + Send + Sync>> + Send + Sync,
{
    fn decode(&self, payload: &[u8]) -> Result<T, Box<dyn Error + Send + Sync>> {
        self(payload)
    }
}

trait AnyObjectDecoder: Send + Sync {
    fn decode_any(&self, payload: &[u8]) -> Result<ObjectValue, Box<dyn Error + Send + Sync>>;
}

struct ObjectDecoderWrapper<T, D>(D, PhantomData<fn() -> T>);

impl<T, D> AnyObjectDecoder for ObjectDecoderWrapper<T, D>
where
    T: Any + Send + Sync,
    D: ObjectDecoder<T>,
{
    fn decode_any(&self, payload: &[u8]) -> Result<ObjectValue, Box<dyn Error + Send + Sync>> {
        Ok(ObjectValue::new(self.0.decode(payload)?))
    }
}

/// Maps type names to decoders.
#[derive(Default)]
pub struct ObjectDecoderRegistry {
    decoders: AHashMap<String, Box<dyn AnyObjectDecoder>>,
}

impl ObjectDecoderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a decoder producing `T` for objects tagged `type_name`.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        type_name: &str,
        decoder: impl ObjectDecoder<T> + 'static,
    ) {
        let wrapped = ObjectDecoderWrapper(decoder, PhantomData);
        if self
            .decoders
            .insert(type_name.to_string(), Box::new(wrapped))
            .is_some()
        {
            log::warn!("Replacing the decoder registered for '{type_name}'");
        }
    }

    /// Whether a decoder is registered for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Decodes an object.
    ///
    /// Objects without a registered decoder are exposed as the
    /// [`SerializedObject`] itself.
    pub fn decode(
        &self,
        object: SerializedObject,
    ) -> Result<ObjectValue, Box<dyn Error + Send + Sync>> {
        match self.decoders.get(&object.type_name) {
            Some(decoder) => decoder.decode_any(&object.payload),
            None => Ok(ObjectValue::new(object)),
        }
    }
}

impl std::fmt::Debug for ObjectDecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ObjectDecoderRegistry")
            .field("type_names", &names)
            .finish()
    }
}

/// Decodes UTF-8 text objects into `String`.
pub fn utf8_decoder(payload: &[u8]) -> Result<String, Box<dyn Error + Send + Sync>> {
    Ok(String::from_utf8(payload.to_vec())?)
}
