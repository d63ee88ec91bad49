// registry.rs - Process-wide record of instrumented types
//
// Keyed by definition id, so unrelated types sharing a name keep separate
// records. Every instrumentation pass appends the operations it wrapped, so
// the record of a type lists each operation at most once.

use crate::instrument::DefinitionId;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

static WRAPPED: Lazy<RwLock<HashMap<DefinitionId, Vec<String>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub(crate) fn record(id: DefinitionId, operations: &[String]) {
    let mut map = WRAPPED.write().unwrap_or_else(PoisonError::into_inner);
    let entry = map.entry(id).or_default();
    for name in operations {
        if !entry.contains(name) {
            entry.push(name.clone());
        }
    }
}

/// Operations the instrumenter wrapped for the definition `id`, in wrapping
/// order. Inherited operations are listed under the type that first wrapped
/// them.
pub fn wrapped_operations(id: DefinitionId) -> Option<Vec<String>> {
    WRAPPED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned()
}

/// Whether the definition `id` has been through the instrumenter.
pub fn is_instrumented(id: DefinitionId) -> bool {
    WRAPPED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&id)
}
