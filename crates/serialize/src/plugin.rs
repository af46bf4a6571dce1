//! Per-operation context handed to codecs.
//!
//! A [`Plugin`] travels with every [`Session`](crate::Session) and
//! [`CopyContext`](crate::CopyContext). Codecs look up values by type, which
//! lets an application tune a single serialization call (for example, hand
//! the external serializer different options) without rebuilding the codec
//! provider.
//!
//! ```ignore
//! let mut plugin = Plugin::new();
//! plugin.insert(BincodeOptions::default().with_big_endian());
//!
//! let serializer = Serializer::new(provider).with_plugin(plugin);
//! ```

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

/// A type-keyed bag of context values.
///
/// At most one value per type is stored; inserting a second value of the same
/// type replaces the first.
#[derive(Default)]
pub struct Plugin {
    plugins: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Plugin {
    /// Creates a new empty plugin container.
    #[must_use]
    pub fn new() -> Self { Self { plugins: HashMap::new() } }

    /// Stores `value`, returning the value of the same type it replaced.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.plugins
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns the stored value of type `T`, if any.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.plugins
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns `true` if a value of type `T` is stored.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.plugins.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize { self.plugins.len() }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.plugins.is_empty() }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("count", &self.plugins.len())
            .finish_non_exhaustive()
    }
}
