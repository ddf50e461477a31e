//! Caller-facing value types: the parameter mapping passed to every
//! operation and the typed user search term.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named parameters for one operation call.
///
/// Values are JSON values: strings, numbers, booleans, or nested objects for
/// structured fields such as custom fields. Keys iterate in sorted order,
/// which is also the order read parameters are put on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// A parameter counts as present unless it is missing, `null`, or an
    /// empty string.
    pub fn is_present(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// How to look a single user up through the `users` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(u64),
    Email(String),
    Username(String),
}

impl UserLookup {
    /// All-digit terms are ids, terms containing `@` are emails, anything
    /// else is a login name.
    pub fn parse(term: &str) -> Self {
        let term = term.trim();
        if !term.is_empty() && term.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = term.parse() {
                return UserLookup::Id(id);
            }
        }
        if term.contains('@') {
            UserLookup::Email(term.to_string())
        } else {
            UserLookup::Username(term.to_string())
        }
    }

    pub fn to_params(&self) -> Params {
        match self {
            UserLookup::Id(id) => Params::new().with("id", *id),
            UserLookup::Email(email) => Params::new().with("email", email.as_str()),
            UserLookup::Username(login) => Params::new().with("username", login.as_str()),
        }
    }
}

impl From<u64> for UserLookup {
    fn from(id: u64) -> Self {
        UserLookup::Id(id)
    }
}
