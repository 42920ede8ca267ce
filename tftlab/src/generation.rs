//! Caching of generated objects keyed by component type and parameters.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

#[cfg(test)]
use serde::Serialize;
use slotmap::SlotMap;

use crate::component::{serialize_params, Component};
use crate::deps::arcstr::{self, ArcStr};
use crate::error::{ErrorSource, Result};

/// Identifies a component by its type and serialized parameters.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(crate) struct ParamKey {
    type_id: TypeId,
    params: Vec<u8>,
}

impl ParamKey {
    pub(crate) fn from_params<T>(params: &T::Params) -> Result<Self>
    where
        T: Component,
    {
        Ok(Self {
            type_id: TypeId::of::<T>(),
            params: serialize_params(params)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn raw<T: 'static, P: Serialize>(params: &P) -> Result<Self> {
        Ok(Self {
            type_id: TypeId::of::<T>(),
            params: serialize_params(params)?,
        })
    }
}

/// The outcome of looking up an object in a [`GenerationMap`].
pub(crate) enum GeneratedCheck<T, I> {
    /// The object was already generated.
    Exists(T),
    /// The object must be generated and stored under the given ID.
    MustGenerate(I),
}

#[derive(Debug)]
pub(crate) struct GenerationMap<K, I: slotmap::Key, V> {
    keys: HashMap<K, I>,
    values: SlotMap<I, Option<Arc<V>>>,
    names: HashSet<ArcStr>,
}

impl<K, I, V> Default for GenerationMap<K, I, V>
where
    I: slotmap::Key,
{
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            values: SlotMap::with_key(),
            names: HashSet::new(),
        }
    }
}

impl<K, I, V> GenerationMap<K, I, V>
where
    K: Hash + Eq,
    I: slotmap::Key,
{
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the stored object for `key`, or reserves an ID for it.
    ///
    /// Looking up a key whose object is still being generated is an error,
    /// since it can only happen when a component instantiates itself.
    pub(crate) fn get(&mut self, key: K) -> Result<GeneratedCheck<Arc<V>, I>> {
        if let Some(&id) = self.keys.get(&key) {
            return match self.values.get(id) {
                Some(Some(value)) => Ok(GeneratedCheck::Exists(value.clone())),
                _ => Err(ErrorSource::Internal(
                    "component instantiates itself recursively".to_string(),
                )
                .into()),
            };
        }
        let id = self.values.insert(None);
        self.keys.insert(key, id);
        Ok(GeneratedCheck::MustGenerate(id))
    }

    /// Stores a generated object under an ID previously returned by [`GenerationMap::get`]
    /// or [`GenerationMap::gen_id`].
    pub(crate) fn set(&mut self, id: I, name: ArcStr, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.names.insert(name);
        if let Some(slot) = self.values.get_mut(id) {
            *slot = Some(value.clone());
        } else {
            self.values.insert(Some(value.clone()));
        }
        value
    }

    /// Releases an ID reserved by [`GenerationMap::get`] whose object failed to generate.
    ///
    /// The key can be looked up again afterwards.
    pub(crate) fn abandon(&mut self, id: I) {
        if matches!(self.values.get(id), Some(None)) {
            self.values.remove(id);
            self.keys.retain(|_, v| *v != id);
        }
    }

    /// Reserves an ID for an object that is not keyed by parameters, such as an imported cell.
    #[inline]
    pub(crate) fn gen_id(&mut self) -> I {
        self.values.insert(None)
    }

    /// Returns `base_name` if it is unused, otherwise the first free `base_name_N`.
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

    /// Iterates over all generated objects in insertion order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<V>> {
        self.values.values().filter_map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use slotmap::new_key_type;

    use super::*;

    new_key_type! { struct TestKey; }

    #[test]
    fn get_caches_by_key() {
        let mut map: GenerationMap<ParamKey, TestKey, u32> = GenerationMap::new();
        let key = ParamKey::raw::<u32, _>(&(1.5f64, 2u8)).unwrap();
        let id = match map.get(key.clone()).unwrap() {
            GeneratedCheck::MustGenerate(id) => id,
            GeneratedCheck::Exists(_) => panic!("value should not exist yet"),
        };
        map.set(id, arcstr::literal!("value"), 7);
        match map.get(key).unwrap() {
            GeneratedCheck::Exists(v) => assert_eq!(*v, 7),
            GeneratedCheck::MustGenerate(_) => panic!("value should be cached"),
        }
        assert_eq!(map.values().count(), 1);
    }

    #[test]
    fn pending_key_is_an_error() {
        let mut map: GenerationMap<ParamKey, TestKey, u32> = GenerationMap::new();
        let key = ParamKey::raw::<u32, _>(&3u8).unwrap();
        assert!(matches!(
            map.get(key.clone()).unwrap(),
            GeneratedCheck::MustGenerate(_)
        ));
        assert!(map.get(key).is_err());
    }

    #[test]
    fn abandoned_key_can_be_generated_again() {
        let mut map: GenerationMap<ParamKey, TestKey, u32> = GenerationMap::new();
        let key = ParamKey::raw::<u32, _>(&4u8).unwrap();
        let id = match map.get(key.clone()).unwrap() {
            GeneratedCheck::MustGenerate(id) => id,
            GeneratedCheck::Exists(_) => panic!("value should not exist yet"),
        };
        map.abandon(id);
        let id = match map.get(key.clone()).unwrap() {
            GeneratedCheck::MustGenerate(id) => id,
            GeneratedCheck::Exists(_) => panic!("abandoned value should not exist"),
        };
        map.set(id, arcstr::literal!("value"), 9);
        map.abandon(id);
        assert!(matches!(map.get(key).unwrap(), GeneratedCheck::Exists(_)));
        assert_eq!(map.values().count(), 1);
    }

    #[test]
    fn alloc_name_appends_suffix() {
        let mut map: GenerationMap<ParamKey, TestKey, u32> = GenerationMap::new();
        assert_eq!(map.alloc_name("pad"), "pad");
        let id = map.gen_id();
        map.set(id, arcstr::literal!("pad"), 1);
        assert_eq!(map.alloc_name("pad"), "pad_1");
        let id = map.gen_id();
        map.set(id, arcstr::literal!("pad_1"), 2);
        assert_eq!(map.alloc_name("pad"), "pad_2");
    }
}
