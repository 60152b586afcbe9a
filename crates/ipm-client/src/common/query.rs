//! Query utilities for the IPM API
//!
//! The `q` parameter takes a JSON predicate in a MongoDB-like dialect
//! (`$and`, `$elemMatch`). Helpers here build those predicates and the
//! `content=expanded` paths that carry them.

use serde_json::{json, Map, Value};

/// Path with `content=expanded` so nested children are inlined
pub fn expanded(path: &str) -> String {
    format!("{}?content=expanded", path)
}

/// Expanded path filtered by a predicate
pub fn expanded_with_q(path: &str, predicate: &Value) -> String {
    format!("{}?content=expanded&q={}", path, encode_predicate(predicate))
}

/// Serialize a predicate and URL-encode it for the `q` parameter
pub fn encode_predicate(predicate: &Value) -> String {
    urlencoding::encode(&predicate.to_string()).into_owned()
}

/// `{"$and": [clauses...]}`
pub fn and(clauses: Vec<Value>) -> Value {
    json!({ "$and": clauses })
}

/// `{field: {"$elemMatch": {k: v, ...}}}`
pub fn elem_match(field: &str, conditions: Map<String, Value>) -> Value {
    let mut clause = Map::new();
    clause.insert(field.to_string(), json!({ "$elemMatch": conditions }));
    Value::Object(clause)
}

/// Build a flat equality predicate from `(path, value)` pairs
pub fn equals<'a>(pairs: impl IntoIterator<Item = (String, &'a str)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_with_q_is_url_encoded() {
        let q = json!({"hubModule.state.module.moduleName": "mod A"});
        let path = expanded_with_q("/xr-networks", &q);
        assert!(path.starts_with("/xr-networks?content=expanded&q="));
        assert!(!path.contains(' '));
        assert!(!path.contains('"'));

        let encoded = path.split("&q=").nth(1).unwrap();
        let decoded = urlencoding::decode(encoded).unwrap();
        let back: Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn test_elem_match_shape() {
        let clause = elem_match(
            "endpoints",
            equals([("config.selector.x.moduleName".to_string(), "m1")]),
        );
        assert_eq!(
            clause,
            json!({"endpoints": {"$elemMatch": {"config.selector.x.moduleName": "m1"}}})
        );
    }
}
