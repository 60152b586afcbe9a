//! Null-tolerant decoding of IPM JSON responses
//!
//! Every entity decoder follows the same rules:
//! - absent or `null` fields decode to `None` (or an empty collection)
//! - numbers arrive as JSON numbers that may be floats and are narrowed to `i64`
//! - `parentAid` arrives as a one-element sequence and is read as its first element
//! - unknown keys are ignored
//! - only identifying keys (`id`, `href`) are required; their absence is
//!   [`IpmError::MalformedResponse`]
//!
//! [`Node`] is the cursor top-level entities walk, since they merge the
//! observed `state` with the declared `config`. Flat nested records derive
//! `Deserialize` and apply the same rules through the [`lenient`] helpers;
//! [`Decode`] is the per-entity entry point.

use crate::error::IpmError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Cursor over an optional JSON subtree.
///
/// Navigation through missing keys yields another missing node instead of
/// failing, so decoders can walk `state.lifecycleStateCause.errors` without
/// checking each level.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(Option<&'a Value>);

impl<'a> Node<'a> {
    pub fn new(value: &'a Value) -> Self {
        Node(Some(value))
    }

    pub fn missing() -> Self {
        Node(None)
    }

    /// Underlying value, `None` when absent or JSON null
    pub fn value(&self) -> Option<&'a Value> {
        self.0.filter(|v| !v.is_null())
    }

    pub fn is_present(&self) -> bool {
        self.value().is_some()
    }

    /// Child by key
    pub fn get(&self, key: &str) -> Node<'a> {
        Node(self.value().and_then(|v| v.get(key)))
    }

    /// Walk a dotted path (`state.lifecycleState`)
    pub fn path(&self, dotted: &str) -> Node<'a> {
        dotted.split('.').fold(*self, |node, key| node.get(key))
    }

    pub fn str(&self) -> Option<String> {
        self.value().and_then(Value::as_str).map(str::to_string)
    }

    /// Integer, narrowing floats (`100.0` -> `100`)
    pub fn int(&self) -> Option<i64> {
        self.value().and_then(lenient::narrow)
    }

    /// Elements of a sequence; empty when absent or not a sequence
    pub fn items(&self) -> Vec<Node<'a>> {
        match self.value() {
            Some(Value::Array(items)) => items.iter().map(Node::new).collect(),
            _ => Vec::new(),
        }
    }

    /// Keys of a mapping, in document order of the decoded map
    pub fn keys(&self) -> Vec<&'a str> {
        match self.value() {
            Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// String map (labels); empty when absent
    pub fn string_map(&self) -> BTreeMap<String, String> {
        match self.value() {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Deserialize a nested record; `None` when absent or null
    pub fn record<T: DeserializeOwned>(&self) -> Result<Option<T>, IpmError> {
        self.value()
            .map(|v| T::deserialize(v).map_err(IpmError::from))
            .transpose()
    }

    /// Identifying key that must be present on a successful response
    pub fn required_str(&self, key: &str, entity: &str) -> Result<String, IpmError> {
        self.get(key).str().ok_or_else(|| {
            IpmError::MalformedResponse(format!("{} response is missing '{}'", entity, key))
        })
    }
}

/// `deserialize_with` helpers carrying the decoding rules into serde derives
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeSet;

    pub(crate) fn narrow(value: &Value) -> Option<i64> {
        value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
    }

    /// Integer, narrowing floats (`100.0` -> `100`)
    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(narrow))
    }

    /// Integer set (subchannel groupings); `None` when absent, empty when `[]`
    pub fn int_set<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BTreeSet<i64>>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => Some(items.iter().filter_map(narrow).collect()),
            _ => None,
        })
    }

    /// String that the server sometimes sends as a number (error codes)
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            Some(other) => narrow(&other).map(|n| n.to_string()),
            None => None,
        })
    }

    /// `parentAid` quirk: the server sends `["1/1/1"]`; a bare string is tolerated
    pub fn parent_aid<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    /// `null` decodes to the default (empty collection)
    pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }
}

/// Typed decoder for one IPM entity
pub trait Decode: Sized {
    /// Entity name used in error messages
    const ENTITY: &'static str;

    fn decode(node: Node<'_>) -> Result<Self, IpmError>;
}

/// Normalize object-or-sequence responses to a sequence
pub fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Decode a response that may be a single object or a one-element sequence
pub fn decode_one<T: Decode>(value: &Value) -> Result<Option<T>, IpmError> {
    one_or_many(value)
        .into_iter()
        .next()
        .map(|v| T::decode(Node::new(v)))
        .transpose()
}

/// Decode every element of a list response
pub fn decode_many<T: Decode>(value: &Value) -> Result<Vec<T>, IpmError> {
    one_or_many(value)
        .into_iter()
        .map(|v| T::decode(Node::new(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_paths_are_none() {
        let v = json!({"state": {"lifecycleState": null}});
        let node = Node::new(&v);
        assert_eq!(node.path("state.lifecycleState").str(), None);
        assert_eq!(node.path("config.name").str(), None);
        assert!(node.path("a.b.c").items().is_empty());
    }

    #[test]
    fn test_float_narrowing() {
        let v = json!({"capacity": 100.0, "action": 3});
        let node = Node::new(&v);
        assert_eq!(node.get("capacity").int(), Some(100));
        assert_eq!(node.get("action").int(), Some(3));
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Quirks {
        #[serde(deserialize_with = "lenient::parent_aid")]
        parent_aid: Option<String>,
        #[serde(deserialize_with = "lenient::int_set")]
        tx: Option<std::collections::BTreeSet<i64>>,
        #[serde(deserialize_with = "lenient::int_set")]
        rx: Option<std::collections::BTreeSet<i64>>,
        #[serde(deserialize_with = "lenient::text")]
        code: Option<String>,
        #[serde(deserialize_with = "lenient::or_default")]
        errors: Vec<String>,
    }

    #[test]
    fn test_record_applies_lenient_rules() {
        let v = json!({"q": {"parentAid": ["1/1/1", "ignored"], "tx": [1.0, 2, 2], "rx": [], "code": 7, "errors": null}});
        let quirks: Quirks = Node::new(&v).get("q").record().unwrap().unwrap();
        assert_eq!(quirks.parent_aid.as_deref(), Some("1/1/1"));
        assert_eq!(quirks.tx, Some(std::collections::BTreeSet::from([1, 2])));
        assert_eq!(quirks.rx, Some(std::collections::BTreeSet::new()));
        assert_eq!(quirks.code.as_deref(), Some("7"));
        assert!(quirks.errors.is_empty());

        let bare = json!({"parentAid": "2/1"});
        let quirks: Quirks = Node::new(&bare).record().unwrap().unwrap();
        assert_eq!(quirks.parent_aid.as_deref(), Some("2/1"));
        assert_eq!(quirks.tx, None);

        assert_eq!(Node::new(&v).get("missing").record::<Quirks>().unwrap(), None);
    }

    #[test]
    fn test_required_str_reports_entity() {
        let v = json!({"href": "/x/1"});
        let err = Node::new(&v).required_str("id", "transportCapacity").unwrap_err();
        assert!(matches!(err, IpmError::MalformedResponse(ref m) if m.contains("transportCapacity")));
    }

    #[test]
    fn test_one_or_many() {
        assert_eq!(one_or_many(&json!({"id": "a"})).len(), 1);
        assert_eq!(one_or_many(&json!([{"id": "a"}, {"id": "b"}])).len(), 2);
        assert!(one_or_many(&Value::Null).is_empty());
    }
}
