//! Plan-time protection for server-generated inputs.
//!
//! When the user never declared an input that the server filled in, the next
//! plan would otherwise propose removing it. [`restore_generated_inputs`]
//! walks the prior and proposed trees side by side and puts such inputs back
//! into the proposed tree, leaving genuine user removals alone.
//!
//! A proposed step is paired with the prior step carrying the same server
//! id. A step without an id falls back to the prior step at the same
//! position, provided that step runs the same action and no other proposed
//! step claims its id. Inline groups are paired by name.

use std::fmt;

use tracing::debug;

use crate::step::{InlineInputGroup, Input, Step};

/// An input put back into the proposed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredInput {
    /// Attribute path of the owning input list, e.g. `step.0.input`.
    pub path: String,
    /// Name of the restored input.
    pub name: String,
    /// Index the input was inserted at, counted after earlier restorations
    /// into the same list.
    pub index: usize,
    /// Value carried over from the prior state.
    pub value: String,
}

impl fmt::Display for RestoredInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.path, self.name)
    }
}

/// Result of [`restore_generated_inputs`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffCustomization {
    /// The revised proposed tree.
    pub steps: Vec<Step>,
    /// Inputs that were re-added, in walk order.
    pub restored: Vec<RestoredInput>,
}

impl DiffCustomization {
    /// Returns true if the proposed tree was changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.restored.is_empty()
    }
}

/// Re-adds server-generated inputs that the proposed tree drops.
///
/// Each restored input lands at the index it held in the prior list, clamped
/// to the end of the proposed list. Inputs that were user-specified in the
/// prior tree are never restored. Neither argument is modified.
#[must_use]
pub fn restore_generated_inputs(prior: &[Step], proposed: &[Step]) -> DiffCustomization {
    let mut restored = Vec::new();
    let steps = restore_level(prior, proposed, "step", &mut restored);

    for input in &restored {
        debug!(path = %input.path, input = %input.name, "Keeping server-generated input in plan");
    }

    DiffCustomization { steps, restored }
}

fn restore_level(
    prior: &[Step],
    proposed: &[Step],
    prefix: &str,
    restored: &mut Vec<RestoredInput>,
) -> Vec<Step> {
    proposed
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let path = format!("{prefix}.{index}");
            match counterpart(prior, proposed, index) {
                Some(prior_step) => restore_step(prior_step, step, &path, restored),
                None => step.clone(),
            }
        })
        .collect()
}

/// Finds the prior step that `proposed[index]` is an edit of.
fn counterpart<'a>(prior: &'a [Step], proposed: &[Step], index: usize) -> Option<&'a Step> {
    let step = proposed.get(index)?;
    if step.has_id() {
        return prior.iter().find(|candidate| candidate.id == step.id);
    }

    let candidate = prior.get(index)?;
    let claimed = candidate.has_id() && proposed.iter().any(|other| other.id == candidate.id);
    (!claimed && candidate.action_id == step.action_id).then_some(candidate)
}

fn restore_step(
    prior: &Step,
    proposed: &Step,
    path: &str,
    restored: &mut Vec<RestoredInput>,
) -> Step {
    let input_path = format!("{path}.input");
    let inputs = merge_inputs(&prior.inputs, &proposed.inputs, &input_path, restored);

    let inline_input_groups = proposed
        .inline_input_groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let steps = match prior.inline_group(&group.name) {
                Some(prior_group) => restore_level(
                    &prior_group.steps,
                    &group.steps,
                    &format!("{path}.inline_steps_input.{index}.step"),
                    restored,
                ),
                None => group.steps.clone(),
            };
            InlineInputGroup {
                name: group.name.clone(),
                steps,
            }
        })
        .collect();

    Step {
        id: proposed.id.clone(),
        name: proposed.name.clone(),
        action_id: proposed.action_id.clone(),
        inputs,
        inline_input_groups,
    }
}

fn merge_inputs(
    prior: &[Input],
    proposed: &[Input],
    path: &str,
    restored: &mut Vec<RestoredInput>,
) -> Vec<Input> {
    let mut merged = proposed.to_vec();

    for (index, input) in prior.iter().enumerate() {
        if !input.is_generated() || proposed.iter().any(|p| p.name == input.name) {
            continue;
        }
        let at = index.min(merged.len());
        merged.insert(at, input.clone());
        restored.push(RestoredInput {
            path: path.to_string(),
            name: input.name.clone(),
            index: at,
            value: input.value.clone(),
        });
    }

    merged
}
