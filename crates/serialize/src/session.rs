//! State shared by every codec taking part in one serialization or
//! deserialization pass.
//!
//! A [`Session`] owns the [`ReferenceTable`] of the pass and gives codecs
//! access to the [`CodecProvider`] and the caller's [`Plugin`]. Sessions are
//! created per call by the [`Serializer`](crate::Serializer) and are never
//! shared between threads.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new(provider.clone(), Arc::new(Plugin::new()));
//! let mut writer = Writer::new(&mut encoder, &mut session);
//! writer.write_object_field(0, None, &value)?;
//! ```

use std::sync::Arc;

use crate::{CodecProvider, Plugin, ReferenceTable, TypeRegistry};

/// Per-pass serialization state.
#[derive(Debug)]
pub struct Session {
    provider: Arc<CodecProvider>,
    plugin: Arc<Plugin>,
    references: ReferenceTable,
}

impl Session {
    /// Creates a session with an empty reference table.
    #[must_use]
    pub fn new(provider: Arc<CodecProvider>, plugin: Arc<Plugin>) -> Self {
        Self { provider, plugin, references: ReferenceTable::new() }
    }

    /// The codec provider of this pass.
    #[must_use]
    pub const fn provider(&self) -> &Arc<CodecProvider> { &self.provider }

    /// The registry of the codec provider.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry { self.provider.registry() }

    /// The caller's per-call context.
    #[must_use]
    pub fn plugin(&self) -> &Plugin { &self.plugin }

    /// The reference table of this pass.
    #[must_use]
    pub const fn references(&self) -> &ReferenceTable { &self.references }

    /// The reference table of this pass, mutably.
    pub const fn references_mut(&mut self) -> &mut ReferenceTable {
        &mut self.references
    }
}
