//! Reference tracking: preserves object identity and cycles.
//!
//! Writer and reader number objects in the same order. Every object written
//! in full, every placeholder created while reading, and every value field
//! marked with [`ReferenceTable::mark_value_field`] consumes the next id.
//! A later occurrence of an already written object is emitted as a
//! [`WireType::Reference`] field carrying that id.

use fxhash::FxHashMap;

use crate::{
    Error, Object, Reader, Result, Writer,
    registry::identity,
    wire::{Field, WireType},
};

#[derive(Debug)]
enum Slot {
    Placeholder,
    Object(Object),
}

/// The per-session table of numbered objects.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    current_id: u32,
    written: FxHashMap<usize, (u32, Object)>,
    read: FxHashMap<u32, Slot>,
}

impl ReferenceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// The most recently assigned id.
    #[must_use]
    pub const fn current_id(&self) -> u32 { self.current_id }

    const fn next_id(&mut self) -> u32 {
        self.current_id = self.current_id.wrapping_add(1);
        self.current_id
    }

    /// Consumes an id for a value that can never be referenced.
    pub const fn mark_value_field(&mut self) { self.next_id(); }

    /// Returns the id of `value` if it was written before; otherwise numbers
    /// it and returns `None`.
    ///
    /// The table keeps `value` alive so its address cannot be reused by a
    /// different object during the session.
    pub fn get_or_add_written(&mut self, value: &Object) -> Option<u32> {
        let key = identity(value);
        if let Some((id, _)) = self.written.get(&key) {
            return Some(*id);
        }

        let id = self.next_id();
        self.written.insert(key, (id, value.clone()));
        None
    }

    /// Reserves the next id for an object that is still being read.
    pub fn create_placeholder(&mut self) -> u32 {
        let id = self.next_id();
        self.read.insert(id, Slot::Placeholder);
        id
    }

    /// Numbers an object read in full that did not reserve a placeholder.
    pub fn record_read(&mut self, object: Object) -> u32 {
        let id = self.next_id();
        self.read.insert(id, Slot::Object(object));
        id
    }

    /// Fills the slot `id` with the finished object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateReference`] when `id` already holds an
    /// object.
    pub fn record_object(&mut self, object: Object, id: u32) -> Result<()> {
        if matches!(self.read.get(&id), Some(Slot::Object(_))) {
            return Err(Error::DuplicateReference(id));
        }

        self.read.insert(id, Slot::Object(object));
        Ok(())
    }

    /// Resolves a back-reference.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownReference`] when `id` was never assigned.
    /// - [`Error::UnresolvedReference`] when `id` is still a placeholder.
    pub fn lookup(&self, id: u32) -> Result<Object> {
        match self.read.get(&id) {
            None => Err(Error::UnknownReference(id)),
            Some(Slot::Placeholder) => Err(Error::UnresolvedReference(id)),
            Some(Slot::Object(object)) => Ok(object.clone()),
        }
    }
}

/// Writes a back-reference field if `value` was written before in this
/// session.
///
/// Returns `true` when the reference was written and the caller must not
/// write the value itself. On `false` the value has been numbered and must
/// be written in full.
///
/// # Errors
///
/// Fails when the encoder fails.
pub fn try_write_reference_field(
    writer: &mut Writer<'_>,
    field_id_delta: u32,
    value: &Object,
) -> Result<bool> {
    let Some(id) = writer.session_mut().references_mut().get_or_add_written(value)
    else {
        return Ok(false);
    };

    writer.write_field_header_expected(field_id_delta, WireType::Reference)?;
    writer.write_var_u32(id)?;

    Ok(true)
}

/// Reads the body of a back-reference field and resolves it.
///
/// # Errors
///
/// Fails when `field` is not a reference or the id does not resolve.
pub fn read_reference(reader: &mut Reader<'_>, field: &Field) -> Result<Object> {
    field.ensure_wire_type(WireType::Reference)?;

    let id = reader.read_var_u32()?;
    reader.session().references().lookup(id)
}
