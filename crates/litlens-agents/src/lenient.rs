//! Forgiving `deserialize_with` helpers for model-produced JSON, where a
//! quantity may arrive as `5` or `"5 mL"` and a list may arrive as one string.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&v))
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&v).unwrap_or_default())
}

pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(&other).into_iter().collect(),
    })
}

/// A list of records; null gives an empty list and malformed entries are skipped.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "opt_string")]
        amount: Option<String>,
        #[serde(default, deserialize_with = "string_list")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "number")]
        score: f64,
    }

    #[test]
    fn test_numbers_and_strings_become_strings() {
        let p: Loose = serde_json::from_value(json!({"amount": 5, "tags": ["a", 2, null, " "]})).unwrap();
        assert_eq!(p.amount.as_deref(), Some("5"));
        assert_eq!(p.tags, vec!["a".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_single_string_list_and_blank_option() {
        let p: Loose = serde_json::from_value(json!({"amount": "  ", "tags": "solo", "score": "0.8"})).unwrap();
        assert_eq!(p.amount, None);
        assert_eq!(p.tags, vec!["solo".to_string()]);
        assert_eq!(p.score, 0.8);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Rows {
        #[serde(default, deserialize_with = "list")]
        rows: Vec<Row>,
    }

    #[test]
    fn test_list_skips_bad_entries_and_null() {
        let r: Rows = serde_json::from_value(json!({"rows": [{"name": "a"}, "b", null, {"name": "c"}]})).unwrap();
        assert_eq!(r.rows, vec![Row { name: "a".into() }, Row { name: "c".into() }]);
        let r: Rows = serde_json::from_value(json!({"rows": null})).unwrap();
        assert!(r.rows.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let p: Loose = serde_json::from_value(json!({})).unwrap();
        assert_eq!(p.amount, None);
        assert!(p.tags.is_empty());
        assert_eq!(p.score, 0.0);
    }
}
