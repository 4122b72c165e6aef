//! Caching of generated cells, keyed by component type and parameters.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use slotmap::{Key, SecondaryMap, SlotMap};

use crate::component::{serialize_params, Component};
use crate::deps::arcstr::ArcStr;

/// A cache key identifying one (component type, parameter values) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ParamKey {
    type_id: TypeId,
    params: Vec<u8>,
}

impl ParamKey {
    pub(crate) fn from_params<T>(params: &T::Params) -> Self
    where
        T: Component,
    {
        Self {
            type_id: TypeId::of::<T>(),
            params: serialize_params(params),
        }
    }
}

/// The result of a cache lookup: either the previously generated value, or a
/// freshly reserved ID under which the caller must generate it.
pub(crate) enum GeneratedCheck<V, K> {
    Exists(V),
    MustGenerate(K),
}

/// A map of generated values with stable, slotmap-allocated IDs.
///
/// A lookup with a previously unseen [`ParamKey`] reserves an ID; once the
/// value is generated it is stored under that ID and shared as an [`Arc`].
/// A failed generation leaves the reserved ID empty, so a retry regenerates.
pub(crate) struct GenerationMap<K, Id, V>
where
    Id: Key,
{
    ids: HashMap<K, Id>,
    keys: SlotMap<Id, ()>,
    values: SecondaryMap<Id, Arc<V>>,
    names: HashSet<ArcStr>,
}

impl<K, Id, V> GenerationMap<K, Id, V>
where
    K: Eq + Hash,
    Id: Key,
{
    pub(crate) fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: SlotMap::with_key(),
            values: SecondaryMap::new(),
            names: HashSet::new(),
        }
    }

    /// Generates a fresh ID, allowing a new value to be created.
    pub(crate) fn gen_id(&mut self) -> Id {
        self.keys.insert(())
    }

    /// Looks up the value for `key`, reserving an ID for it if absent.
    pub(crate) fn get(&mut self, key: K) -> GeneratedCheck<Arc<V>, Id> {
        if let Some(&id) = self.ids.get(&key) {
            match self.values.get(id) {
                Some(value) => GeneratedCheck::Exists(value.clone()),
                None => GeneratedCheck::MustGenerate(id),
            }
        } else {
            let id = self.gen_id();
            self.ids.insert(key, id);
            GeneratedCheck::MustGenerate(id)
        }
    }

    /// Stores a generated value under `id` and returns the shared handle.
    pub(crate) fn set(&mut self, id: Id, name: ArcStr, value: V) -> Arc<V> {
        self.names.insert(name);
        let value = Arc::new(value);
        self.values.insert(id, value.clone());
        value
    }

    /// Allocates an unused name derived from the given base name.
    pub(crate) fn alloc_name(&self, base_name: impl Into<ArcStr>) -> ArcStr {
        let base_name = base_name.into();
        if !self.names.contains(&base_name) {
            return base_name;
        }
        let mut i = 1;
        loop {
            let name = arcstr::format!("{}_{}", base_name, i);
            if !self.names.contains(&name) {
                return name;
            }
            i += 1;
        }
    }

    /// Returns an iterator over the values in the map, in generation order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<V>> {
        self.keys.keys().filter_map(|id| self.values.get(id))
    }
}
