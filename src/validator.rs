//! # Validator Module
//!
//! The schema capability every validation slot is built on.
//!
//! A [`Schema<T>`] turns a raw JSON value into a `T` or a [`SchemaError`].
//! Body, form, query, path-parameter and header slots all use the same
//! trait; only the output type differs. [`JsonSchema`] is the stock
//! implementation backed by the `jsonschema` crate, but any type can
//! implement the trait (a hand-written validator, a different schema
//! library, a test double).
//!
//! ## Issue trees
//!
//! Rejections carry a list of [`ValidationIssue`]s. When a [`SchemaError`] is
//! serialized it renders as a nested tree keyed by the failing field, with
//! each level's messages under `_errors`:
//!
//! ```json
//! {
//!   "_errors": [],
//!   "pet": { "_errors": [], "name": { "_errors": ["123 is not of type \"string\""] } }
//! }
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod json_schema;

pub use json_schema::{JsonSchema, SchemaCompileError};

/// Key holding the messages of one tree level.
pub const ERRORS_KEY: &str = "_errors";

/// One rejection reported by a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path from the root of the validated value to the offending field
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path,
            message: message.into(),
        }
    }

    /// An issue about the value as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), message)
    }
}

/// A schema rejection: one or more issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    issues: Vec<ValidationIssue>,
}

impl SchemaError {
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        SchemaError { issues }
    }

    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Render the nested `_errors` tree.
    #[must_use]
    pub fn format(&self) -> Value {
        let mut root = IssueNode::default();
        for issue in &self.issues {
            root.insert(&issue.path, &issue.message);
        }
        root.into_json()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation issue(s)", self.issues.len())?;
        for issue in &self.issues {
            if issue.path.is_empty() {
                write!(f, "; {}", issue.message)?;
            } else {
                write!(f, "; {}: {}", issue.path.join("."), issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

impl Serialize for SchemaError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.format().serialize(serializer)
    }
}

#[derive(Default)]
struct IssueNode {
    errors: Vec<String>,
    children: BTreeMap<String, IssueNode>,
}

impl IssueNode {
    fn insert(&mut self, path: &[String], message: &str) {
        match path.split_first() {
            None => self.errors.push(message.to_string()),
            Some((head, tail)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(tail, message),
        }
    }

    fn into_json(self) -> Value {
        let mut map = Map::new();
        map.insert(
            ERRORS_KEY.to_string(),
            Value::Array(self.errors.into_iter().map(Value::String).collect()),
        );
        for (key, child) in self.children {
            map.insert(key, child.into_json());
        }
        Value::Object(map)
    }
}

/// Validation capability for one slot, parameterized by its output type.
pub trait Schema<T>: Send + Sync {
    /// Validate `raw` and convert it into `T`.
    fn parse(&self, raw: Value) -> Result<T, SchemaError>;

    /// JSON Schema describing accepted input, used for documentation.
    fn json_schema(&self) -> Value {
        Value::Object(Map::new())
    }
}

/// Shared schemas: one compiled schema can back several endpoints.
impl<T, S: Schema<T> + ?Sized> Schema<T> for Arc<S> {
    fn parse(&self, raw: Value) -> Result<T, SchemaError> {
        (**self).parse(raw)
    }

    fn json_schema(&self) -> Value {
        (**self).json_schema()
    }
}
