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

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A thread-safe, reference-counted, type-erased handle to a loaded object.
///
/// Backends hand these out once a content file finished loading. Cloning is
/// cheap, as it only increments the reference count. Consumers get their
/// concrete type back with [`ObjectValue::downcast`].
#[derive(Clone)]
pub struct ObjectValue(Arc<dyn Any + Send + Sync>);

impl ObjectValue {
    /// Wraps a decoded object.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wraps an object that is already shared.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Returns a typed handle if the object is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    /// Returns `true` if the object is a `T`.
    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValue")
            .field("strong_count", &Arc::strong_count(&self.0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mesh {
        vertices: u32,
    }

    #[test]
    fn test_downcast_to_matching_type() {
        let value = ObjectValue::new(Mesh { vertices: 12 });
        assert!(value.is::<Mesh>());
        assert_eq!(value.downcast::<Mesh>().unwrap().vertices, 12);
    }

    #[test]
    fn test_downcast_to_other_type_fails() {
        let value = ObjectValue::new(Mesh { vertices: 3 });
        assert!(value.downcast::<String>().is_none());
    }

    #[test]
    fn test_clones_share_the_object() {
        let shared = Arc::new(Mesh { vertices: 1 });
        let value = ObjectValue::from_arc(shared.clone());
        let copy = value.clone();
        assert!(Arc::ptr_eq(&copy.downcast::<Mesh>().unwrap(), &shared));
    }
}
