use super::{Schema, SchemaError, ValidationIssue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// The schema document itself is not valid JSON Schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCompileError {
    pub message: String,
}

impl fmt::Display for SchemaCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid JSON Schema: {}", self.message)
    }
}

impl std::error::Error for SchemaCompileError {}

/// [`Schema`] backed by a JSON Schema document.
///
/// The document is compiled once here; each `parse` validates against the
/// compiled form and then deserializes the accepted value into `T`.
///
/// ```rust
/// use brrtendpoint::validator::{JsonSchema, Schema};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct NewPet { name: String }
///
/// let schema = JsonSchema::<NewPet>::new(json!({
///     "type": "object",
///     "properties": { "name": { "type": "string" } },
///     "required": ["name"]
/// })).unwrap();
///
/// assert_eq!(schema.parse(json!({"name": "Rex"})).unwrap().name, "Rex");
/// assert!(schema.parse(json!({"name": 7})).is_err());
/// ```
pub struct JsonSchema<T = Value> {
    schema: Value,
    validator: jsonschema::Validator,
    coerce: bool,
    _output: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for JsonSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema")
            .field("schema", &self.schema)
            .field("coerce", &self.coerce)
            .finish()
    }
}

impl<T: DeserializeOwned> JsonSchema<T> {
    /// Compile `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCompileError`] if the document is not a valid schema.
    pub fn new(schema: Value) -> Result<Self, SchemaCompileError> {
        let validator = jsonschema::validator_for(&schema).map_err(|e| SchemaCompileError {
            message: e.to_string(),
        })?;
        Ok(Self {
            schema,
            validator,
            coerce: false,
            _output: PhantomData,
        })
    }

    /// Convert string properties to the primitive type their property schema
    /// declares before validating.
    ///
    /// Query strings, headers and path segments only ever carry strings; this
    /// lets `{"limit": {"type": "integer"}}` accept `?limit=10`.
    #[must_use]
    pub fn coerce_primitives(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// The schema document as given.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.schema
    }
}

impl JsonSchema<Value> {
    /// A schema whose output is the validated JSON value itself.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCompileError`] if the document is not a valid schema.
    pub fn untyped(schema: Value) -> Result<Self, SchemaCompileError> {
        Self::new(schema)
    }
}

impl<T: DeserializeOwned> Schema<T> for JsonSchema<T> {
    fn parse(&self, raw: Value) -> Result<T, SchemaError> {
        let raw = if self.coerce {
            coerce_object(raw, &self.schema)
        } else {
            raw
        };

        let issues: Vec<ValidationIssue> = self
            .validator
            .iter_errors(&raw)
            .map(|e| ValidationIssue::new(pointer_segments(&e.instance_path().to_string()), e.to_string()))
            .collect();
        if !issues.is_empty() {
            debug!(issue_count = issues.len(), "JSON Schema rejected value");
            return Err(SchemaError::new(issues));
        }

        serde_json::from_value(raw)
            .map_err(|e| SchemaError::new(vec![ValidationIssue::root(e.to_string())]))
    }

    fn json_schema(&self) -> Value {
        self.schema.clone()
    }
}

/// Split a JSON pointer (`/a/0/b~1c`) into unescaped segments.
fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn coerce_object(raw: Value, schema: &Value) -> Value {
    let Value::Object(map) = raw else {
        return raw;
    };
    let properties = schema.get("properties");
    Value::Object(
        map.into_iter()
            .map(|(key, value)| {
                let prop_schema = properties.and_then(|p| p.get(&key));
                let value = match value {
                    Value::String(s) => coerce_value(&s, prop_schema),
                    other => other,
                };
                (key, value)
            })
            .collect(),
    )
}

/// Decode a string according to the declared type.
///
/// Arrays split on commas; values that do not parse stay strings so the
/// schema reports them.
fn coerce_value(value: &str, schema: Option<&Value>) -> Value {
    fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
        match schema.and_then(|s| s.get("type")).and_then(|t| t.as_str()) {
            Some("integer") => val
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(val.to_string())),
            Some("number") => val
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from)
                .unwrap_or_else(|| Value::String(val.to_string())),
            Some("boolean") => val
                .parse::<bool>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(val.to_string())),
            _ => Value::String(val.to_string()),
        }
    }

    match schema.and_then(|s| s.get("type")).and_then(|t| t.as_str()) {
        Some("array") => {
            let items = schema.and_then(|s| s.get("items"));
            Value::Array(
                value
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|p| convert_primitive(p.trim(), items))
                    .collect(),
            )
        }
        _ => convert_primitive(value, schema),
    }
}
