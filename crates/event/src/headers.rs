//! Case-insensitive header map.
//!
//! Transports differ in how they expose headers: some preserve case, some
//! deliver multi-valued entries as arrays. [`Headers`] flattens all of that
//! into a single lower-cased name → first-value map so the rest of the
//! pipeline never has to care about the transport's conventions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Flattened transport headers: lower-cased names, first value wins.
///
/// Construction is total: any iterable of name/value pairs produces a valid
/// map, and re-normalizing an already-normalized map is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    map: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalized map from raw name/value pairs.
    ///
    /// Names are lower-cased. When the same name appears more than once
    /// (differing only in case counts as the same name), the first value is
    /// kept and later ones are ignored, matching how multi-valued transport
    /// headers are flattened.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = HashMap::new();
        for (name, value) in pairs {
            map.entry(name.as_ref().to_ascii_lowercase())
                .or_insert_with(|| value.as_ref().to_string());
        }
        Self { map }
    }

    /// Case-insensitive lookup. Absent headers are absent, never an error.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
        } else {
            self.map.get(name).map(String::as_str)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts or replaces a header under its lower-cased name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.map.insert(name.to_ascii_lowercase(), value.into());
    }

    /// True when the header is present with the literal value `"true"`
    /// (ASCII case-insensitive). Used for marker headers.
    pub fn is_flagged(&self, name: &str) -> bool {
        self.get(name)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
