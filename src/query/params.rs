use std::collections::BTreeMap;

/// Request parameter carrying the full-text query.
pub const SEARCH_PARAM: &str = "search";

/// Caller-supplied filter parameters. A key may be present with a null value,
/// which is treated the same as an absent key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    values: BTreeMap<String, Option<String>>,
}

impl FilterParams {
    pub fn new() -> Self { Self::default() }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), Some(value.into()));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) { self.values.insert(key.into(), value); }

    /// Non-null value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> { self.values.get(key).and_then(|v| v.as_deref()) }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// From a JSON object: null stays null, strings are taken verbatim, other values
    /// use their JSON text (`3`, `true`).
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let values = map
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                (k.clone(), text)
            })
            .collect();
        Self { values }
    }

    /// Parse `key=value` pairs, as given on the command line.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let mut out = Self::new();
        for pair in pairs {
            let (k, v) = pair.split_once('=').ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            out.insert(k.trim(), Some(v.to_string()));
        }
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), Some(v.into()))).collect() }
    }
}
