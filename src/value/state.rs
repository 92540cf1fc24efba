use super::{FieldValue, SelectOption};
use ahash::AHashMap;

/// Dropdown choices per field key, fetched once per session.
pub type OptionSet = AHashMap<String, Vec<SelectOption>>;

/// The current, in-memory values of a form, keyed by field key.
///
/// A key that is absent has no value; conditions treat it as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: AHashMap<String, FieldValue>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.values.remove(key)
    }

    /// Replaces every value at once, as on initial load.
    pub fn replace(&mut self, other: FormState) {
        self.values = other.values;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for FormState {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
