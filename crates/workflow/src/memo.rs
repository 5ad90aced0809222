//! Records which inputs the user last specified.
//!
//! The memo is rebuilt from the last applied configuration before every
//! update or read and is never stored on its own. Top-level steps are keyed
//! by their server id. Steps inside an inline group are keyed by their name,
//! since nested steps created through an inline group have no stable id of
//! their own; two nested steps sharing a name inside one group collapse to
//! the first one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::step::{InlineInputGroup, Step};

/// Inputs and inline groups the user declared on one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecifiedStep {
    /// Names of inputs whose provenance was not server-generated.
    pub input_names: Vec<String>,
    /// Nested memos keyed by inline group name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inline_groups: BTreeMap<String, SpecifiedStepMemo>,
}

impl SpecifiedStep {
    /// Returns true if the user declared an input with this name.
    #[must_use]
    pub fn specifies(&self, input_name: &str) -> bool {
        self.input_names.iter().any(|name| name == input_name)
    }

    /// Returns the memo for the nested steps of an inline group.
    #[must_use]
    pub fn inline_group(&self, group_name: &str) -> Option<&SpecifiedStepMemo> {
        self.inline_groups.get(group_name)
    }
}

/// Per-step record of previously specified inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecifiedStepMemo {
    steps: BTreeMap<String, SpecifiedStep>,
}

impl SpecifiedStepMemo {
    /// Creates an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for a correlation key.
    pub fn insert(&mut self, key: impl Into<String>, step: SpecifiedStep) {
        self.steps.insert(key.into(), step);
    }

    /// Looks up the entry for a correlation key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SpecifiedStep> {
        self.steps.get(key)
    }

    /// Number of recorded steps at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing is recorded at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates over `(key, entry)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpecifiedStep)> {
        self.steps.iter().map(|(key, step)| (key.as_str(), step))
    }
}

/// Captures the provenance the user most recently intended.
///
/// Only top-level steps with a known id get an entry. Inline groups are
/// always descended into, keyed as described in the module docs.
#[must_use]
pub fn extract_memo(configured_steps: &[Step]) -> SpecifiedStepMemo {
    let mut memo = SpecifiedStepMemo::new();
    for step in configured_steps.iter().filter(|step| step.has_id()) {
        memo.insert(step.id.clone(), specified_step(step));
    }
    memo
}

fn extract_nested_memo(group: &InlineInputGroup) -> SpecifiedStepMemo {
    let mut memo = SpecifiedStepMemo::new();
    for step in &group.steps {
        if memo.get(&step.name).is_some() {
            debug!(
                group = %group.name,
                step = %step.name,
                "Duplicate nested step name, keeping first memo entry"
            );
            continue;
        }
        memo.insert(step.name.clone(), specified_step(step));
    }
    memo
}

fn specified_step(step: &Step) -> SpecifiedStep {
    let input_names = step
        .inputs
        .iter()
        .filter(|input| !input.is_generated())
        .map(|input| input.name.clone())
        .collect();

    let inline_groups = step
        .inline_input_groups
        .iter()
        .map(|group| (group.name.clone(), extract_nested_memo(group)))
        .collect();

    SpecifiedStep {
        input_names,
        inline_groups,
    }
}
