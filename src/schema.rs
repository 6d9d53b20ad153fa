//! Structural validation of untrusted JSON.
//!
//! Everything read back from storage or from an import file goes through a
//! [`Schema`] before it is deserialized into application types, so a
//! hand-edited or corrupted document is rejected with a path to the first
//! offending value instead of half-loading.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    Number,
    Boolean,
    Null,
    /// Matches only a missing value (absent property or absent document).
    Undefined,
    Array(Box<Schema>),
    /// Named properties, checked in declaration order.
    Object(Vec<(String, Schema)>),
    Union(Vec<Schema>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("invalid JSON: {0}")]
    Syntax(String),
    #[error("at {path}: expected {expected}, found {found}")]
    Mismatch {
        path: String,
        expected: String,
        found: &'static str,
    },
    #[error("malformed value: {0}")]
    Decode(String),
}

impl Schema {
    pub fn array(item: Schema) -> Self {
        Schema::Array(Box::new(item))
    }

    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(
            properties
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        )
    }

    /// `T | undefined`
    pub fn optional(schema: Schema) -> Self {
        Schema::Union(vec![schema, Schema::Undefined])
    }

    /// `T | null | undefined`, the shape serde gives an `Option` field.
    pub fn nullable(schema: Schema) -> Self {
        Schema::Union(vec![schema, Schema::Null, Schema::Undefined])
    }

    pub fn describe(&self) -> String {
        match self {
            Schema::String => "string".to_string(),
            Schema::Number => "number".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Null => "null".to_string(),
            Schema::Undefined => "undefined".to_string(),
            Schema::Array(item) => format!("array<{}>", item.describe()),
            Schema::Object(_) => "object".to_string(),
            Schema::Union(alternatives) => alternatives
                .iter()
                .map(Schema::describe)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        self.check(Some(value), "$")
    }

    /// Validate, then return a copy holding only the declared properties.
    pub fn sanitize(&self, value: &Value) -> Result<Value, SchemaError> {
        self.validate(value)?;
        Ok(self.prune(value))
    }

    fn check(&self, value: Option<&Value>, path: &str) -> Result<(), SchemaError> {
        match (self, value) {
            (Schema::Undefined, None)
            | (Schema::String, Some(Value::String(_)))
            | (Schema::Number, Some(Value::Number(_)))
            | (Schema::Boolean, Some(Value::Bool(_)))
            | (Schema::Null, Some(Value::Null)) => Ok(()),
            (Schema::Array(item), Some(Value::Array(items))) => {
                for (i, element) in items.iter().enumerate() {
                    item.check(Some(element), &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            (Schema::Object(properties), Some(Value::Object(map))) => {
                for (name, schema) in properties {
                    schema.check(map.get(name), &format!("{}.{}", path, name))?;
                }
                Ok(())
            }
            (Schema::Union(alternatives), _) => {
                let mut nearest = None;
                for alternative in alternatives {
                    match alternative.check(value, path) {
                        Ok(()) => return Ok(()),
                        Err(err) if nearest.is_none() && alternative.same_kind(value) => {
                            nearest = Some(err);
                        }
                        Err(_) => {}
                    }
                }
                // An alternative of the right kind failed deeper down: its
                // error points closer to the problem than the union's.
                Err(nearest.unwrap_or_else(|| self.mismatch(value, path)))
            }
            _ => Err(self.mismatch(value, path)),
        }
    }

    fn same_kind(&self, value: Option<&Value>) -> bool {
        matches!(
            (self, value),
            (Schema::Array(_), Some(Value::Array(_))) | (Schema::Object(_), Some(Value::Object(_)))
        )
    }

    fn mismatch(&self, value: Option<&Value>, path: &str) -> SchemaError {
        SchemaError::Mismatch {
            path: path.to_string(),
            expected: self.describe(),
            found: kind_of(value),
        }
    }

    // Assumes `value` already passed `check`.
    fn prune(&self, value: &Value) -> Value {
        match (self, value) {
            (Schema::Array(item), Value::Array(items)) => {
                Value::Array(items.iter().map(|element| item.prune(element)).collect())
            }
            (Schema::Object(properties), Value::Object(map)) => {
                let mut out = Map::new();
                for (name, schema) in properties {
                    if let Some(property) = map.get(name) {
                        out.insert(name.clone(), schema.prune(property));
                    }
                }
                Value::Object(out)
            }
            (Schema::Union(alternatives), _) => alternatives
                .iter()
                .find(|alternative| alternative.check(Some(value), "$").is_ok())
                .map(|alternative| alternative.prune(value))
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        }
    }
}

fn kind_of(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Parse `text`, check it against `schema`, then deserialize the sanitized
/// value. Every failure comes back as a [`SchemaError`].
pub fn parse_validated<T: DeserializeOwned>(text: &str, schema: &Schema) -> Result<T, SchemaError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| SchemaError::Syntax(e.to_string()))?;
    let clean = schema.sanitize(&value)?;
    serde_json::from_value(clean).map_err(|e| SchemaError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    fn person() -> Schema {
        Schema::object([
            ("name", Schema::String),
            ("age", Schema::Number),
            ("nickname", Schema::optional(Schema::String)),
            ("tags", Schema::array(Schema::String)),
        ])
    }

    #[test]
    fn primitives_match_only_their_kind() {
        assert!(Schema::String.validate(&json!("x")).is_ok());
        assert!(Schema::Number.validate(&json!(1.5)).is_ok());
        assert!(Schema::Boolean.validate(&json!(false)).is_ok());
        assert!(Schema::Null.validate(&json!(null)).is_ok());
        assert!(Schema::String.validate(&json!(1)).is_err());
        assert!(Schema::Number.validate(&json!("1")).is_err());
        assert!(Schema::Null.validate(&json!(false)).is_err());
        // a present value is never undefined, not even null
        assert!(Schema::Undefined.validate(&json!(null)).is_err());
    }

    #[test]
    fn reports_path_of_first_failure() {
        let doc = json!({ "name": "ada", "age": 36, "tags": ["a", 2, "c"] });
        let err = person().validate(&doc).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Mismatch {
                path: "$.tags[1]".to_string(),
                expected: "string".to_string(),
                found: "number",
            }
        );
        assert_eq!(err.to_string(), "at $.tags[1]: expected string, found number");
    }

    #[test]
    fn missing_required_property_is_undefined() {
        let doc = json!({ "name": "ada", "tags": [] });
        let err = person().validate(&doc).unwrap_err();
        assert_eq!(err.to_string(), "at $.age: expected number, found undefined");
    }

    #[test]
    fn optional_property_may_be_absent_but_not_wrong() {
        let ok = json!({ "name": "ada", "age": 36, "tags": [] });
        assert!(person().validate(&ok).is_ok());

        let bad = json!({ "name": "ada", "age": 36, "tags": [], "nickname": 3 });
        let err = person().validate(&bad).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at $.nickname: expected string | undefined, found number"
        );
    }

    #[test]
    fn union_surfaces_nested_error_of_matching_kind() {
        let schema = Schema::nullable(Schema::object([("value", Schema::Number)]));
        assert!(schema.validate(&json!(null)).is_ok());
        let err = schema.validate(&json!({ "value": "high" })).unwrap_err();
        assert_eq!(err.to_string(), "at $.value: expected number, found string");
    }

    #[test]
    fn sanitize_drops_undeclared_properties() {
        let doc = json!({
            "name": "ada",
            "age": 36,
            "tags": ["x"],
            "isAdmin": true,
        });
        let clean = person().sanitize(&doc).unwrap();
        assert_eq!(clean, json!({ "name": "ada", "age": 36, "tags": ["x"] }));
    }

    #[test]
    fn nested_arrays_of_objects_are_pruned() {
        let schema = Schema::array(Schema::object([("id", Schema::Number)]));
        let clean = schema
            .sanitize(&json!([{ "id": 1, "junk": 1 }, { "id": 2 }]))
            .unwrap();
        assert_eq!(clean, json!([{ "id": 1 }, { "id": 2 }]));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn parse_validated_classifies_failures() {
        let schema = Schema::object([("name", Schema::String), ("age", Schema::Number)]);

        let ok: Person = parse_validated(r#"{"name":"ada","age":36,"x":1}"#, &schema).unwrap();
        assert_eq!(ok, Person { name: "ada".into(), age: 36 });

        let syntax = parse_validated::<Person>("{not json", &schema).unwrap_err();
        assert!(matches!(syntax, SchemaError::Syntax(_)));

        let shape = parse_validated::<Person>(r#"{"name":"ada"}"#, &schema).unwrap_err();
        assert!(matches!(shape, SchemaError::Mismatch { .. }));

        // structurally a number, but not a u32
        let decode = parse_validated::<Person>(r#"{"name":"ada","age":-1}"#, &schema).unwrap_err();
        assert!(matches!(decode, SchemaError::Decode(_)));
    }
}
