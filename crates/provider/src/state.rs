//! Framework boundary for resource attributes.
//!
//! Resources read and write attributes through [`ResourceData`] during CRUD
//! operations and through [`ResourceDiff`] while a plan is being customized.
//! [`AttributeState`] is an in-memory implementation holding a prior and a
//! current attribute snapshot as JSON objects.

use pagerduty_workflow::MalformedStateError;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Attribute access during create, read, update, and delete.
pub trait ResourceData {
    /// Identifier of the remote object; empty when it does not exist.
    fn id(&self) -> &str;

    /// Records the identifier; an empty id marks the resource as gone.
    fn set_id(&mut self, id: &str);

    /// Current value of an attribute.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Writes an attribute.
    fn set(&mut self, key: &str, value: Value);
}

/// Attribute access while a pending plan is customized.
///
/// Errors are returned to the caller verbatim, so implementations choose
/// their own error type.
pub trait ResourceDiff {
    /// Error raised by the framework's state access.
    type Error: From<MalformedStateError>;

    /// Identifier of the existing resource; empty on first creation.
    fn id(&self) -> &str;

    /// The `(prior, proposed)` values of an attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the framework cannot read the attribute.
    fn get_change(&self, key: &str) -> std::result::Result<(Value, Value), Self::Error>;

    /// Replaces the proposed value of an attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the framework rejects the write.
    fn set_new(&mut self, key: &str, value: Value) -> std::result::Result<(), Self::Error>;
}

/// In-memory attribute store with prior and current snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeState {
    id: String,
    prior: Map<String, Value>,
    current: Map<String, Value>,
}

impl AttributeState {
    /// Creates an empty state for a resource that does not exist yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state whose current attributes come from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if `attributes` is not a JSON object.
    pub fn from_attributes(attributes: Value) -> Result<Self> {
        Ok(Self {
            current: into_object(attributes, "attributes")?,
            ..Self::default()
        })
    }

    /// Creates a plan view from the prior state and the proposed attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is not a JSON object.
    pub fn planned(id: impl Into<String>, prior: Value, proposed: Value) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            prior: into_object(prior, "prior")?,
            current: into_object(proposed, "proposed")?,
        })
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Current attributes as a JSON object.
    #[must_use]
    pub fn attributes(&self) -> Value {
        Value::Object(self.current.clone())
    }

    /// Moves the current attributes into the prior snapshot, as after an
    /// apply.
    pub fn commit(&mut self) {
        self.prior = self.current.clone();
    }
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(MalformedStateError::new(what, "an object").into()),
    }
}

impl ResourceData for AttributeState {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.current.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.current.insert(key.to_string(), value);
    }
}

impl ResourceDiff for AttributeState {
    type Error = Error;

    fn id(&self) -> &str {
        &self.id
    }

    fn get_change(&self, key: &str) -> Result<(Value, Value)> {
        let prior = self.prior.get(key).cloned().unwrap_or(Value::Null);
        let proposed = self.current.get(key).cloned().unwrap_or(Value::Null);
        Ok((prior, proposed))
    }

    fn set_new(&mut self, key: &str, value: Value) -> Result<()> {
        if !self.prior.contains_key(key) && !self.current.contains_key(key) {
            return Err(Error::missing_attribute(key));
        }
        self.current.insert(key.to_string(), value);
        Ok(())
    }
}
