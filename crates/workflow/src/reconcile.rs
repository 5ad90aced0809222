//! Provenance annotation for server-returned step trees.

use crate::memo::{SpecifiedStep, SpecifiedStepMemo};
use crate::step::{InlineInputGroup, Input, Provenance, Step};

/// How steps at one level of the tree find their memo entry.
#[derive(Debug, Clone, Copy)]
enum MemoKey {
    /// Top-level steps, keyed by server id.
    Id,
    /// Steps nested in an inline group, keyed by step name.
    Name,
}

impl MemoKey {
    fn of(self, step: &Step) -> &str {
        match self {
            Self::Id => &step.id,
            Self::Name => &step.name,
        }
    }
}

/// Annotates every input of `observed_steps` with its provenance.
///
/// An input is [`Provenance::ServerGenerated`] only when `include_all` is
/// false, the step resolved a memo entry, and that entry does not name the
/// input. Steps without an entry (including every step when `memo` is `None`)
/// keep all their inputs as user-specified, so a brand-new step never looks
/// entirely generated.
///
/// The output has exactly the shape and order of `observed_steps`; the inputs
/// are not modified.
#[must_use]
pub fn reconcile(
    observed_steps: &[Step],
    memo: Option<&SpecifiedStepMemo>,
    include_all: bool,
) -> Vec<Step> {
    let memo = if include_all { None } else { memo };
    reconcile_level(observed_steps, memo, MemoKey::Id)
}

fn reconcile_level(steps: &[Step], memo: Option<&SpecifiedStepMemo>, key: MemoKey) -> Vec<Step> {
    steps
        .iter()
        .map(|step| {
            let entry = memo.and_then(|memo| memo.get(key.of(step)));
            reconcile_step(step, entry)
        })
        .collect()
}

fn reconcile_step(step: &Step, entry: Option<&SpecifiedStep>) -> Step {
    let inputs = step
        .inputs
        .iter()
        .map(|input| input.with_provenance(provenance_of(input, entry)))
        .collect();

    let inline_input_groups = step
        .inline_input_groups
        .iter()
        .map(|group| {
            let nested = entry.and_then(|entry| entry.inline_group(&group.name));
            InlineInputGroup {
                name: group.name.clone(),
                steps: reconcile_level(&group.steps, nested, MemoKey::Name),
            }
        })
        .collect();

    Step {
        id: step.id.clone(),
        name: step.name.clone(),
        action_id: step.action_id.clone(),
        inputs,
        inline_input_groups,
    }
}

fn provenance_of(input: &Input, entry: Option<&SpecifiedStep>) -> Provenance {
    match entry {
        Some(entry) if !entry.specifies(&input.name) => Provenance::ServerGenerated,
        _ => Provenance::UserSpecified,
    }
}

/// Returns the tree to send on create or update.
///
/// Server-generated inputs are dropped at every depth so defaults are never
/// echoed back as if the user had declared them.
#[must_use]
pub fn outbound_steps(steps: &[Step]) -> Vec<Step> {
    steps.iter().map(outbound_step).collect()
}

fn outbound_step(step: &Step) -> Step {
    Step {
        id: step.id.clone(),
        name: step.name.clone(),
        action_id: step.action_id.clone(),
        inputs: step
            .inputs
            .iter()
            .filter(|input| !input.is_generated())
            .cloned()
            .collect(),
        inline_input_groups: step
            .inline_input_groups
            .iter()
            .map(|group| InlineInputGroup {
                name: group.name.clone(),
                steps: outbound_steps(&group.steps),
            })
            .collect(),
    }
}
