//! The process-wide cache of compatibility-marker checks.
//!
//! Entries are keyed by serializer and type, added on first sight and never
//! removed. Concurrent first checks of one type may all compute the answer,
//! but only the first insert is kept and every caller returns the kept
//! value.

use std::{any::TypeId, sync::LazyLock};

use dashmap::DashMap;
use quill_serialize::TypeInfo;

use crate::ExternalSerializer;

static CONTRACT_CACHE: LazyLock<DashMap<(TypeId, TypeId), bool>> =
    LazyLock::new(DashMap::default);

/// Returns `S::is_contract(ty)`, computing it at most once per type in the
/// common case.
pub(crate) fn is_contract<S: ExternalSerializer>(ty: &TypeInfo) -> bool {
    let key = (TypeId::of::<S>(), ty.type_id());

    if let Some(cached) = CONTRACT_CACHE.get(&key) {
        return *cached;
    }

    let computed = S::is_contract(ty);
    let decided = *CONTRACT_CACHE.entry(key).or_insert(computed);

    tracing::debug!(
        serializer = std::any::type_name::<S>(),
        ty = ty.name(),
        contract = decided,
        "cached compatibility marker check"
    );

    decided
}

/// The cached compatibility-marker answer for `ty`, if it was computed.
#[must_use]
pub fn cached_contract_decision<S: ExternalSerializer>(
    ty: &TypeInfo,
) -> Option<bool> {
    CONTRACT_CACHE
        .get(&(TypeId::of::<S>(), ty.type_id()))
        .map(|cached| *cached)
}
