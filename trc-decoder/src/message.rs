//! Message records and fixed-width expansion
//!
//! A [`MessageRecord`] is the canonical form of one trace line: an
//! insertion-ordered mapping from column name to a scalar or list value.
//! Which keys exist depends on the dialect and on the branch its grammar
//! took for the line.
//!
//! [`MessageRecord::expand`] flattens every list into numbered columns
//! (`DATA00`, `DATA01`, ...) for fixed-column export.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;

/// Value of one record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// One parsed trace line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageRecord {
    fields: IndexMap<String, FieldValue>,
}

impl MessageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value in place if the key exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Scalar value of `key`, if present and not a list
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    /// List value of `key`, if present and a list
    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(FieldValue::as_list)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten list values into numbered scalar columns
    ///
    /// A list `K = [v0, v1, ...]` becomes `K00 = v0, K01 = v1, ...` at the
    /// position the list occupied. Scalars pass through unchanged. The
    /// record itself is left untouched.
    pub fn expand(&self) -> ExpandedRecord {
        let mut fields = IndexMap::with_capacity(self.fields.len());

        for (key, value) in &self.fields {
            match value {
                FieldValue::Text(s) => {
                    fields.insert(key.clone(), s.clone());
                }
                FieldValue::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        fields.insert(indexed_key(key, i), item.clone());
                    }
                }
            }
        }

        ExpandedRecord { fields }
    }
}

impl<K, V> FromIterator<(K, V)> for MessageRecord
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let fields = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        MessageRecord { fields }
    }
}

/// Column name of element `index` of list field `key`
pub fn indexed_key(key: &str, index: usize) -> String {
    format!("{}{:02}", key, index)
}

/// Split `DATA07` into (`DATA`, 7); `None` for plain column names
fn split_indexed_key(key: &str) -> Option<(&str, usize)> {
    let prefix = key.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &key[prefix.len()..];

    if prefix.is_empty() || digits.len() < 2 {
        return None;
    }

    digits.parse().ok().map(|index| (prefix, index))
}

/// Read-only flat view of a [`MessageRecord`]: every value is a scalar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpandedRecord {
    fields: IndexMap<String, String>,
}

impl ExpandedRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values in `layout` column order, empty where the record has no value
    pub fn row<'a, S: AsRef<str>>(&'a self, layout: &[S]) -> Vec<&'a str> {
        layout
            .iter()
            .map(|column| self.get(column.as_ref()).unwrap_or(""))
            .collect()
    }

    /// Regroup numbered columns into list fields
    ///
    /// Inverse of [`MessageRecord::expand`]: `KEY00, KEY01, ...` become
    /// `KEY = [...]` in index order at the position of the first column.
    pub fn collapse(&self) -> MessageRecord {
        enum Slot {
            Text(String),
            Indexed(Vec<(usize, String)>),
        }

        let mut slots: IndexMap<String, Slot> = IndexMap::new();

        for (key, value) in &self.fields {
            match split_indexed_key(key) {
                Some((prefix, index)) => match slots.entry(prefix.to_string()) {
                    Entry::Occupied(mut entry) => match entry.get_mut() {
                        Slot::Indexed(items) => items.push((index, value.clone())),
                        text => *text = Slot::Indexed(vec![(index, value.clone())]),
                    },
                    Entry::Vacant(entry) => {
                        entry.insert(Slot::Indexed(vec![(index, value.clone())]));
                    }
                },
                None => {
                    slots.insert(key.clone(), Slot::Text(value.clone()));
                }
            }
        }

        slots
            .into_iter()
            .map(|(key, slot)| match slot {
                Slot::Text(s) => (key, FieldValue::Text(s)),
                Slot::Indexed(mut items) => {
                    items.sort_by_key(|(index, _)| *index);
                    (key, FieldValue::List(items.into_iter().map(|(_, v)| v).collect()))
                }
            })
            .collect()
    }
}

impl From<ExpandedRecord> for MessageRecord {
    fn from(expanded: ExpandedRecord) -> Self {
        expanded
            .fields
            .into_iter()
            .map(|(k, v)| (k, FieldValue::Text(v)))
            .collect()
    }
}
