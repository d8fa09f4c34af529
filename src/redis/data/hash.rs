//! Hash data structure backing Map objects

use ahash::AHashMap;

#[derive(Clone, Debug, PartialEq, Default)]
pub struct RedisHash {
    fields: AHashMap<Vec<u8>, Vec<u8>>,
}

impl RedisHash {
    pub fn new() -> Self {
        RedisHash {
            fields: AHashMap::new(),
        }
    }

    /// Set a field, returning true if the field did not exist before.
    pub fn set(&mut self, field: &[u8], value: &[u8]) -> bool {
        #[cfg(debug_assertions)]
        let pre_len = self.fields.len();

        let created = self.fields.insert(field.to_vec(), value.to_vec()).is_none();

        debug_assert_eq!(
            self.fields.get(field).map(Vec::as_slice),
            Some(value),
            "Postcondition violated: value must match after set"
        );
        #[cfg(debug_assertions)]
        debug_assert_eq!(
            self.fields.len(),
            if created { pre_len + 1 } else { pre_len },
            "Postcondition violated: len grows only for new fields"
        );

        created
    }

    pub fn get(&self, field: &[u8]) -> Option<&[u8]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn delete(&mut self, field: &[u8]) -> bool {
        let removed = self.fields.remove(field).is_some();

        debug_assert!(
            !self.fields.contains_key(field),
            "Postcondition violated: field must not exist after delete"
        );

        removed
    }

    pub fn exists(&self, field: &[u8]) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.fields.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
