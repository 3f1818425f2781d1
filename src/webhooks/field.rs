//! Field-addressed validation diagnostics.
//!
//! Errors render in the API server's format so clients see the same text
//! they would get from built-in validation:
//!
//! ```text
//! spec.invocationLimits[memory]: Invalid value: "50Mi": invocation limit quantity cannot ...
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(String),
    Key(String),
}

/// Path to a field within a resource, e.g. `spec.resources.limits[memory]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Root path with a single field name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Child(name.into())],
        }
    }

    /// Path to a named child field.
    pub fn child(&self, name: impl Into<String>) -> Self {
        self.with(Segment::Child(name.into()))
    }

    /// Path to a map entry.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(Segment::Key(key.into()))
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Child(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Child(name) => write!(f, ".{}", name)?,
                Segment::Key(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}

/// A rejected field value with a human-readable explanation.
///
/// The value is kept as JSON so maps render as `{"key":"value"}`, strings
/// are quoted and numbers appear as literals.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: Invalid value: {bad_value}: {detail}")]
pub struct FieldError {
    /// Path of the offending field.
    pub field: FieldPath,
    /// The value that was rejected.
    pub bad_value: Value,
    /// Why the value was rejected.
    pub detail: String,
}

impl FieldError {
    /// An invalid value at `field`.
    pub fn invalid(field: FieldPath, bad_value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self {
            field,
            bad_value: bad_value.into(),
            detail: detail.into(),
        }
    }
}

/// Ordered list of field errors collected during one validation.
pub type ErrorList = Vec<FieldError>;

/// Aggregated rejection of a whole object.
///
/// Renders like the API server's `Invalid` status:
/// `SpinApp.core.spinkube.dev "hello" is invalid: [<err>, <err>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidError {
    /// Kind qualified with its API group, e.g. `SpinApp.core.spinkube.dev`.
    pub qualified_kind: String,
    /// Name of the rejected object.
    pub name: String,
    /// Every field error, in rule order.
    pub errors: ErrorList,
}

impl InvalidError {
    pub fn new(qualified_kind: impl Into<String>, name: impl Into<String>, errors: ErrorList) -> Self {
        Self {
            qualified_kind: qualified_kind.into(),
            name: name.into(),
            errors,
        }
    }
}

impl fmt::Display for InvalidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} is invalid", self.qualified_kind, self.name)?;

        // Identical messages are reported once
        let mut seen = BTreeSet::new();
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(ToString::to_string)
            .filter(|message| seen.insert(message.clone()))
            .collect();

        match messages.as_slice() {
            [] => Ok(()),
            [only] => write!(f, ": {}", only),
            many => write!(f, ": [{}]", many.join(", ")),
        }
    }
}

impl std::error::Error for InvalidError {}
