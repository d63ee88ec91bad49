// singleton.rs - One shared instance per type
//
// Entries live for the whole process and are never replaced. The registry is
// keyed by `TypeId`, so the downcast on lookup cannot fail.

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Entry = Arc<dyn Any + Send + Sync>;

static INSTANCES: Lazy<RwLock<HashMap<TypeId, Entry>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Process-wide instance of `T`, built by `init` on first request.
///
/// Later calls return the same instance and never run their `init`. `init`
/// runs under the registry lock and must not request another singleton.
pub fn instance<T, F>(init: F) -> Arc<T>
where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
{
    let key = TypeId::of::<T>();
    if let Some(existing) = INSTANCES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return downcast(Arc::clone(existing));
    }

    let mut map = INSTANCES.write().unwrap_or_else(PoisonError::into_inner);
    let entry = map.entry(key).or_insert_with(|| {
        tracing::debug!(type_name = std::any::type_name::<T>(), "singleton created");
        Arc::new(init()) as Entry
    });
    downcast(Arc::clone(entry))
}

/// Whether an instance of `T` has been created.
pub fn is_initialized<T: Any>() -> bool {
    INSTANCES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}

fn downcast<T: Any + Send + Sync>(entry: Entry) -> Arc<T> {
    match entry.downcast::<T>() {
        Ok(instance) => instance,
        Err(_) => unreachable!("singleton registry is keyed by TypeId"),
    }
}
