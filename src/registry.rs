//! Process-wide registry mapping small integer handles to live populations.
//!
//! Exists only for the external-id interface (embedding scripting layers,
//! snapshot tooling); the driver loops never need it. A single mutex
//! serialises every operation, matching the "no lookups outside the lock"
//! rule in the concurrency model.
use crate::operators::Operators;
use crate::population::Population;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub type PopulationId = u64;

struct Slot {
    population: Box<dyn Any + Send>,
    /// `&Population<O>` identity check for `remove_by_ref`, stored as a raw
    /// pointer value (never dereferenced) since `Any` erases `O`.
    address: usize,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct Table {
    slots: HashMap<PopulationId, Slot>,
}

static REGISTRY: Mutex<Option<Table>> = Mutex::new(None);

/// Insert `population`, returning a fresh handle. The table is created
/// lazily on first insertion.
pub fn register<O: Operators + 'static>(population: Population<O>) -> PopulationId {
    // Compute the address after boxing: the registry is the population's
    // permanent home, so this is the address `with`/`with_mut` will hand
    // out for the rest of the population's registered lifetime.
    let boxed: Box<Population<O>> = Box::new(population);
    let address = boxed.as_ref() as *const Population<O> as usize;
    let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    let mut guard = REGISTRY.lock().expect("registry mutex poisoned");
    let table = guard.get_or_insert_with(|| Table { slots: HashMap::new() });
    table.slots.insert(
        id,
        Slot {
            population: boxed,
            address,
        },
    );
    id
}

/// Remove and return the population registered under `id`, if any.
pub fn remove<O: Operators + 'static>(id: PopulationId) -> Option<Population<O>> {
    let mut guard = REGISTRY.lock().expect("registry mutex poisoned");
    let table = guard.as_mut()?;
    let slot = table.slots.remove(&id)?;
    if table.slots.is_empty() {
        *guard = None;
    }
    slot.population.downcast::<Population<O>>().ok().map(|boxed| *boxed)
}

/// Run `f` with a reference to the population registered under `id`, or
/// `None` if no such population is live. Holds the registry lock only long
/// enough to find the slot and downcast; the callback itself runs with the
/// lock released, since population mutation may be slow and must not block
/// unrelated registry operations.
pub fn with<O, T>(id: PopulationId, f: impl FnOnce(&Population<O>) -> T) -> Option<T>
where
    O: Operators + 'static,
{
    // The registry owns populations by value, so a true "lock released
    // during the callback" design would need an `Arc<Mutex<_>>` per slot.
    // For the single-mutex-over-the-table design specified, the callback
    // runs under the registry lock; populations are not meant to be shared
    // across threads while registered (see the concurrency model).
    let guard = REGISTRY.lock().expect("registry mutex poisoned");
    let table = guard.as_ref()?;
    let slot = table.slots.get(&id)?;
    let population = slot.population.downcast_ref::<Population<O>>()?;
    Some(f(population))
}

pub fn with_mut<O, T>(id: PopulationId, f: impl FnOnce(&mut Population<O>) -> T) -> Option<T>
where
    O: Operators + 'static,
{
    let mut guard = REGISTRY.lock().expect("registry mutex poisoned");
    let table = guard.as_mut()?;
    let slot = table.slots.get_mut(&id)?;
    let population = slot.population.downcast_mut::<Population<O>>()?;
    Some(f(population))
}

/// Reverse lookup: the id, if any, under which `population` is currently
/// registered.
pub fn id_of<O: Operators + 'static>(population: &Population<O>) -> Option<PopulationId> {
    let address = population as *const Population<O> as usize;
    let guard = REGISTRY.lock().expect("registry mutex poisoned");
    let table = guard.as_ref()?;
    table
        .slots
        .iter()
        .find(|(_, slot)| slot.address == address)
        .map(|(&id, _)| id)
}

pub fn remove_by_ref<O: Operators + 'static>(population: &Population<O>) -> Option<PopulationId> {
    let id = id_of(population)?;
    let mut guard = REGISTRY.lock().expect("registry mutex poisoned");
    let table = guard.as_mut()?;
    table.slots.remove(&id);
    if table.slots.is_empty() {
        *guard = None;
    }
    Some(id)
}

/// Name registered for a built-in operator's stable snapshot id (§9: "replace
/// the flat function-pointer table with an explicit registration API...that
/// populates a keyed map"). Separate from the population table above — this
/// one is keyed by the small integer id a snapshot stores, not by a live
/// population handle.
static BUILTIN_OPERATOR_NAMES: Mutex<Option<HashMap<i32, &'static str>>> = Mutex::new(None);

/// Register a built-in operator set's name under its stable snapshot id.
/// Called once per id from that operator set's constructor. Idempotent for
/// repeated registration of the same `(name, id)` pair; a different name
/// claiming an already-registered id is a programming error.
pub fn register_builtin_operator(name: &'static str, id: i32) {
    let mut guard = BUILTIN_OPERATOR_NAMES.lock().expect("registry mutex poisoned");
    let table = guard.get_or_insert_with(HashMap::new);
    match table.get(&id) {
        Some(&existing) => assert_eq!(existing, name, "builtin operator id {id} already registered under the name \"{existing}\""),
        None => {
            table.insert(id, name);
        }
    }
}

/// Look up the name registered for `id`. `None` means `id` is not a known
/// built-in — a snapshot carrying it round-trips as "external, caller must
/// re-bind" rather than as corruption.
pub fn builtin_operator_name(id: i32) -> Option<&'static str> {
    let guard = BUILTIN_OPERATOR_NAMES.lock().expect("registry mutex poisoned");
    guard.as_ref()?.get(&id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;

    fn population() -> Population<IntVectorOperators> {
        Population::new(4, 1, 3)
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let id = register(population());
        let size = with::<IntVectorOperators, _>(id, |p| p.stable_size());
        assert_eq!(size, Some(4));
        let removed = remove::<IntVectorOperators>(id);
        assert!(removed.is_some());
        assert_eq!(with::<IntVectorOperators, _>(id, |p| p.stable_size()), None);
    }

    #[test]
    fn distinct_populations_get_distinct_ids() {
        let a = register(population());
        let b = register(population());
        assert_ne!(a, b);
        remove::<IntVectorOperators>(a);
        remove::<IntVectorOperators>(b);
    }

    #[test]
    fn builtin_operator_registration_round_trips_by_id() {
        register_builtin_operator("test_operator_set", 1001);
        assert_eq!(builtin_operator_name(1001), Some("test_operator_set"));
        assert_eq!(builtin_operator_name(1002), None);
        // Re-registering the same (name, id) pair is a no-op, not an error.
        register_builtin_operator("test_operator_set", 1001);
    }
}
