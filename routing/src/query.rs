//! Ordered query parameters.
//!
//! Parameters keep insertion order. Merging follows "later wins" semantics:
//! when a key already exists its value is replaced but its position is kept.

use indexmap::IndexMap;
use indexmap::map::IntoIter;
use once_cell::sync::Lazy;
use regex::Regex;

/// `key/value` pairs left over at the end of a path.
static PATH_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)/([^/]+)").unwrap());

/// Anything that looks like an HTML tag, including an unterminated one.
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*(?:>|$)").unwrap());

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    params: IndexMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a form-urlencoded query string such as `a=1&b=2`.
    /// A leading `?` is ignored and repeated keys keep the last value.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// Extracts parameters from the unconsumed tail of a path, reading
    /// adjacent segments as `key/value`. Keys are lowercased and values have
    /// HTML tags stripped.
    pub fn from_path_pairs(path: &str) -> Self {
        PATH_PAIR
            .captures_iter(path)
            .map(|caps| (caps[1].to_lowercase(), strip_tags(&caps[2])))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merges `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: Query) {
        self.params.extend(other.params);
    }

    /// Returns `self` merged under `base`: every key present in `base`
    /// keeps the base value.
    pub fn under(mut self, base: &Query) -> Query {
        self.merge(base.clone());
        self
    }

    /// Replaces the first value equal to `from` with `to`.
    pub fn replace_first_value(&mut self, from: &str, to: &str) {
        if let Some(value) = self.params.values_mut().find(|value| *value == from) {
            *value = to.to_string();
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Query {
    type Item = (String, String);
    type IntoIter = IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

fn strip_tags(value: &str) -> String {
    HTML_TAG.replace_all(value, "").into_owned()
}
