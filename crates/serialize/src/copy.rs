//! Deep copying of object graphs.

use std::sync::Arc;

use fxhash::FxHashMap;

use crate::{CodecProvider, Object, Plugin, Result, TypeRegistry, registry::identity};

/// The state of one deep-copy operation.
///
/// Remembers the copy of every object seen so far, so that an object
/// reachable along several paths (or along a cycle) is copied once.
#[derive(Debug)]
pub struct CopyContext {
    provider: Arc<CodecProvider>,
    plugin: Arc<Plugin>,
    // The original is kept alive so its address stays unique.
    copies: FxHashMap<usize, (Object, Object)>,
}

impl CopyContext {
    /// Creates a context with no recorded copies.
    #[must_use]
    pub fn new(provider: Arc<CodecProvider>, plugin: Arc<Plugin>) -> Self {
        Self { provider, plugin, copies: FxHashMap::default() }
    }

    /// The registry of the codec provider.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry { self.provider.registry() }

    /// The caller's per-call context.
    #[must_use]
    pub fn plugin(&self) -> &Plugin { &self.plugin }

    /// Returns the copy already made of `original`, if any.
    #[must_use]
    pub fn try_get_copy(&self, original: &Object) -> Option<Object> {
        self.copies.get(&identity(original)).map(|(_, copy)| copy.clone())
    }

    /// Records `copy` as the copy of `original`.
    pub fn record_copy(&mut self, original: &Object, copy: &Object) {
        self.copies
            .insert(identity(original), (original.clone(), copy.clone()));
    }

    /// Copies `value` with the copier the provider selects for its runtime
    /// type.
    ///
    /// # Errors
    ///
    /// Fails when the type is unregistered, when no copier supports it, or
    /// when the selected copier fails.
    pub fn deep_copy(&mut self, value: &Object) -> Result<Object> {
        let provider = self.provider.clone();
        let ty = provider.registry().type_of(value)?;

        provider.copier_for(&ty)?.deep_copy(value, self)
    }
}
