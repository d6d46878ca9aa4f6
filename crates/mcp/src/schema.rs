// Input contract checking: required keys plus primitive type tags.
//
// A tool's JSON schema is compiled into an `InputContract` once, at
// registration. Only `type`, `properties` and `required` are interpreted;
// other keywords (`description`, `enum`, ...) are carried on the wire but
// not enforced.

use crate::error::{SchemaError, TypeMismatch, ValidationError};
use serde_json::{Map, Value};

/// Primitive JSON type tags understood by the checker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl TypeTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    /// `number` accepts any JSON number; `integer` only whole ones.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
        }
    }
}

/// Name of the JSON type of `value`, as reported in validation errors
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Property {
    name: String,
    /// Empty means any type is accepted
    types: Vec<TypeTag>,
}

/// Compiled form of a tool's input schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputContract {
    required: Vec<String>,
    properties: Vec<Property>,
}

impl InputContract {
    /// Compile a JSON-Schema-like object.
    pub fn from_schema(schema: &Value) -> Result<Self, SchemaError> {
        let schema = schema
            .as_object()
            .ok_or_else(|| SchemaError(format!("schema must be an object, got {}", type_name(schema))))?;

        if let Some(kind) = schema.get("type") {
            if kind.as_str() != Some("object") {
                return Err(SchemaError(format!(
                    "top-level type must be \"object\", got {}",
                    kind
                )));
            }
        }

        let properties = match schema.get("properties") {
            None => Vec::new(),
            Some(Value::Object(props)) => compile_properties(props)?,
            Some(other) => {
                return Err(SchemaError(format!(
                    "\"properties\" must be an object, got {}",
                    type_name(other)
                )))
            }
        };

        let required = match schema.get("required") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SchemaError(format!(
                            "\"required\" entries must be strings, got {}",
                            type_name(item)
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(SchemaError(format!(
                    "\"required\" must be an array, got {}",
                    type_name(other)
                )))
            }
        };

        Ok(Self {
            required,
            properties,
        })
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Check call arguments. Missing required keys are reported before type
    /// mismatches; each kind lists every offending field.
    pub fn validate(&self, arguments: &Value) -> Result<(), ValidationError> {
        let args = arguments
            .as_object()
            .ok_or_else(|| ValidationError::NotAnObject(type_name(arguments)))?;

        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|key| !args.contains_key(key.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired(missing));
        }

        let mismatches: Vec<TypeMismatch> = self
            .properties
            .iter()
            .filter(|prop| !prop.types.is_empty())
            .filter_map(|prop| {
                let value = args.get(&prop.name)?;
                if prop.types.iter().any(|t| t.matches(value)) {
                    return None;
                }
                Some(TypeMismatch {
                    field: prop.name.clone(),
                    expected: prop
                        .types
                        .iter()
                        .map(TypeTag::as_str)
                        .collect::<Vec<_>>()
                        .join(" or "),
                    actual: type_name(value),
                })
            })
            .collect();
        if !mismatches.is_empty() {
            return Err(ValidationError::InvalidTypes(mismatches));
        }

        Ok(())
    }
}

fn compile_properties(props: &Map<String, Value>) -> Result<Vec<Property>, SchemaError> {
    props
        .iter()
        .map(|(name, spec)| {
            let types = match spec.get("type") {
                None => Vec::new(),
                Some(Value::String(tag)) => vec![parse_tag(name, tag)?],
                Some(Value::Array(tags)) => tags
                    .iter()
                    .map(|tag| match tag.as_str() {
                        Some(tag) => parse_tag(name, tag),
                        None => Err(SchemaError(format!(
                            "property '{}' has a non-string type entry",
                            name
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(other) => {
                    return Err(SchemaError(format!(
                        "property '{}' has an invalid type declaration: {}",
                        name, other
                    )))
                }
            };
            Ok(Property {
                name: name.clone(),
                types,
            })
        })
        .collect()
}

fn parse_tag(property: &str, tag: &str) -> Result<TypeTag, SchemaError> {
    TypeTag::parse(tag)
        .ok_or_else(|| SchemaError(format!("property '{}' has unknown type \"{}\"", property, tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_contract() -> InputContract {
        InputContract::from_schema(&json!({
            "type": "object",
            "properties": {
                "city": {"type": "string"},
                "hours": {"type": "integer"}
            },
            "required": ["city", "hours"]
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_arguments_pass() {
        let contract = forecast_contract();
        assert!(contract.validate(&json!({"city": "Oslo", "hours": 12})).is_ok());
        // Undeclared keys are not rejected
        assert!(contract
            .validate(&json!({"city": "Oslo", "hours": 12, "units": "metric"}))
            .is_ok());
    }

    #[test]
    fn test_missing_required_lists_all_fields() {
        let err = forecast_contract().validate(&json!({})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRequired(vec!["city".into(), "hours".into()])
        );
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let err = forecast_contract()
            .validate(&json!({"city": "Oslo", "hours": "twelve"}))
            .unwrap_err();
        assert_eq!(err.fields(), vec!["hours"]);
        assert_eq!(
            err.to_string(),
            "Invalid argument 'hours': expected integer, got string"
        );
    }

    #[test]
    fn test_integer_rejects_fractional_numbers() {
        let err = forecast_contract()
            .validate(&json!({"city": "Oslo", "hours": 1.5}))
            .unwrap_err();
        assert_eq!(err.fields(), vec!["hours"]);

        let contract = InputContract::from_schema(&json!({
            "properties": {"ratio": {"type": "number"}}
        }))
        .unwrap();
        assert!(contract.validate(&json!({"ratio": 1.5})).is_ok());
        assert!(contract.validate(&json!({"ratio": 2})).is_ok());
    }

    #[test]
    fn test_union_types() {
        let contract = InputContract::from_schema(&json!({
            "type": "object",
            "properties": {"note": {"type": ["string", "null"]}}
        }))
        .unwrap();
        assert!(contract.validate(&json!({"note": null})).is_ok());
        assert!(contract.validate(&json!({"note": "x"})).is_ok());
        let err = contract.validate(&json!({"note": 3})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument 'note': expected string or null, got integer"
        );
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        let err = forecast_contract().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject("array"));
    }

    #[test]
    fn test_empty_schema_accepts_any_object() {
        let contract = InputContract::from_schema(&json!({})).unwrap();
        assert!(contract.validate(&json!({"anything": [1, 2, 3]})).is_ok());
        assert!(contract.required().is_empty());
    }

    #[test]
    fn test_invalid_schemas_rejected() {
        assert!(InputContract::from_schema(&json!("object")).is_err());
        assert!(InputContract::from_schema(&json!({"type": "string"})).is_err());
        assert!(InputContract::from_schema(&json!({"required": "city"})).is_err());
        assert!(InputContract::from_schema(&json!({
            "properties": {"city": {"type": "text"}}
        }))
        .is_err());
    }
}
