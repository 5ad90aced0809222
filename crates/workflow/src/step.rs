//! Typed step tree for incident workflows.
//!
//! A workflow is an ordered list of [`Step`]s. Steps carry named [`Input`]s and,
//! for control-flow actions such as loops, [`InlineInputGroup`]s holding nested
//! step lists with the same shape at every depth.

use serde::{Deserialize, Serialize};

/// Where an input value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Declared in the user's configuration.
    #[default]
    UserSpecified,
    /// Filled in by the server with a default value.
    ServerGenerated,
}

impl Provenance {
    /// Returns true for [`Provenance::ServerGenerated`].
    #[must_use]
    pub fn is_generated(self) -> bool {
        self == Self::ServerGenerated
    }
}

/// A named parameter value bound to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    /// Parameter name, unique within the owning step.
    pub name: String,
    /// Parameter value.
    pub value: String,
    /// Derived on every reconciliation pass; the server never stores it.
    #[serde(default)]
    pub provenance: Provenance,
}

impl Input {
    /// Creates a user-specified input.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            provenance: Provenance::UserSpecified,
        }
    }

    /// Creates a server-generated input.
    pub fn generated(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            provenance: Provenance::ServerGenerated,
        }
    }

    /// Returns a copy of this input with the given provenance.
    #[must_use]
    pub fn with_provenance(&self, provenance: Provenance) -> Self {
        Self {
            provenance,
            ..self.clone()
        }
    }

    /// Returns true if the server supplied this value.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.provenance.is_generated()
    }
}

/// An input slot whose value is itself a list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineInputGroup {
    /// Parameter name of the slot.
    pub name: String,
    /// Nested steps, in server order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl InlineInputGroup {
    /// Creates a group with the given nested steps.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// One action invocation within a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Step {
    /// Server-assigned identifier; empty until the step has been created.
    #[serde(default)]
    pub id: String,
    /// Display label.
    pub name: String,
    /// Identifier of the workflow action this step runs.
    pub action_id: String,
    /// Inputs in declaration order.
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Inline step groups in declaration order.
    #[serde(default)]
    pub inline_input_groups: Vec<InlineInputGroup>,
}

impl Step {
    /// Creates a step without an id, inputs, or inline groups.
    pub fn new(name: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action_id: action_id.into(),
            ..Self::default()
        }
    }

    /// Sets the server-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Appends an input.
    #[must_use]
    pub fn with_input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    /// Appends an inline step group.
    #[must_use]
    pub fn with_inline_group(mut self, group: InlineInputGroup) -> Self {
        self.inline_input_groups.push(group);
        self
    }

    /// Returns true once the server has assigned an id.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Finds an input by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Finds an inline group by name.
    #[must_use]
    pub fn inline_group(&self, name: &str) -> Option<&InlineInputGroup> {
        self.inline_input_groups
            .iter()
            .find(|group| group.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provenance_is_user_specified() {
        assert_eq!(Provenance::default(), Provenance::UserSpecified);
        assert!(!Input::new("a", "1").is_generated());
        assert!(Input::generated("a", "1").is_generated());
    }

    #[test]
    fn test_with_provenance_keeps_name_and_value() {
        let input = Input::new("Message", "hello").with_provenance(Provenance::ServerGenerated);
        assert_eq!(input.name, "Message");
        assert_eq!(input.value, "hello");
        assert!(input.is_generated());
    }

    #[test]
    fn test_step_lookup_helpers() {
        let step = Step::new("Send", "pagerduty.com:incident-workflows:send-status-update:1")
            .with_id("P123")
            .with_input(Input::new("Message", "hi"))
            .with_inline_group(InlineInputGroup::new("Actions", vec![]));

        assert!(step.has_id());
        assert_eq!(step.input("Message").map(|i| i.value.as_str()), Some("hi"));
        assert!(step.input("Missing").is_none());
        assert!(step.inline_group("Actions").is_some());
    }

    #[test]
    fn test_provenance_serde_names() {
        let json = serde_json::to_string(&Provenance::ServerGenerated).unwrap();
        assert_eq!(json, "\"server_generated\"");
    }
}
