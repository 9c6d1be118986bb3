//! The Context Store: a map from `KeyId` to a tagged value,
//! created empty per job, populated by the Payload Codec, mutated by VM
//! ops, and snapshotted into the result record at job completion. Not
//! thread-safe; owned by exactly one job at a time.

use std::collections::HashMap;
use tas_types::{KeyId, TaggedValue, ValueTag};

#[derive(Debug, Default, Clone)]
pub struct ContextStore {
    map: HashMap<KeyId, TaggedValue>,
}

impl ContextStore {
    pub fn new() -> ContextStore {
        ContextStore::default()
    }

    /// Overwrite semantics: storing a new value for an existing key
    /// replaces it.
    pub fn set(&mut self, key: KeyId, value: impl Into<TaggedValue>) {
        self.map.insert(key, value.into());
    }

    pub fn set_raw(&mut self, key: KeyId, value: TaggedValue) {
        self.map.insert(key, value);
    }

    pub fn contains(&self, key: KeyId) -> bool {
        self.map.contains_key(&key)
    }

    pub fn remove(&mut self, key: KeyId) -> Option<TaggedValue> {
        self.map.remove(&key)
    }

    pub fn tag_of(&self, key: KeyId) -> Option<ValueTag> {
        self.map.get(&key).map(|v| v.tag())
    }

    /// Returns `None` if the key is absent *or* the stored tag is not `T`
    ///.
    pub fn get<'a, T>(&'a self, key: KeyId) -> Option<T>
    where
        T: TryFrom<&'a TaggedValue>,
    {
        self.map.get(&key).and_then(|v| T::try_from(v).ok())
    }

    pub fn get_raw(&self, key: KeyId) -> Option<&TaggedValue> {
        self.map.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyId, &TaggedValue)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_get_rejects_wrong_tag() {
        let mut ctx = ContextStore::new();
        ctx.set(1u16, 42u32);
        assert_eq!(ctx.get::<u32>(1), Some(42));
        assert_eq!(ctx.get::<u8>(1), None);
        assert_eq!(ctx.get::<u32>(2), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let mut ctx = ContextStore::new();
        ctx.set(1u16, 1u32);
        ctx.set(1u16, 2u32);
        assert_eq!(ctx.get::<u32>(1), Some(2));
        assert_eq!(ctx.len(), 1);
    }
}
