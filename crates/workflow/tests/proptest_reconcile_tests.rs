//! Property-based tests for step tree reconciliation.
//!
//! These tests verify the behavioral contracts of the reconciler:
//! - Reconciliation is idempotent and never changes tree shape
//! - Provenance follows the memo exactly, at every nesting depth
//! - Plan revision restores generated inputs and only those, onto the step
//!   they came from even when steps are inserted or removed

use pagerduty_workflow::{
    InlineInputGroup, Input, SpecifiedStepMemo, Step, extract_memo, outbound_steps, reconcile,
    restore_generated_inputs,
};
use proptest::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Inputs with unique names and random provenance.
fn inputs_strategy() -> impl Strategy<Value = Vec<Input>> {
    proptest::collection::btree_map("[a-f]{1,3}", (any::<u8>(), any::<bool>()), 0..6).prop_map(
        |inputs| {
            inputs
                .into_iter()
                .map(|(name, (value, generated))| {
                    if generated {
                        Input::generated(name, value.to_string())
                    } else {
                        Input::new(name, value.to_string())
                    }
                })
                .collect()
        },
    )
}

/// A step list nested up to `depth` inline levels.
///
/// Top-level steps get unique ids; nested steps get unique names within their
/// group, matching how each level is correlated.
fn steps_strategy(depth: u32, top_level: bool) -> BoxedStrategy<Vec<Step>> {
    let nested = if depth == 0 {
        Just(None).boxed()
    } else {
        proptest::option::of(steps_strategy(depth - 1, false)).boxed()
    };

    proptest::collection::vec((inputs_strategy(), nested), 0..4)
        .prop_map(move |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(index, (inputs, nested))| {
                    let mut step = Step::new(format!("step_{index}"), "action:test");
                    if top_level {
                        step.id = format!("PSTEP{index}");
                    }
                    step.inputs = inputs;
                    if let Some(nested) = nested {
                        step.inline_input_groups
                            .push(InlineInputGroup::new("Actions", nested));
                    }
                    step
                })
                .collect()
        })
        .boxed()
}

fn tree_strategy() -> BoxedStrategy<Vec<Step>> {
    steps_strategy(2, true)
}

// =============================================================================
// Helpers
// =============================================================================

/// Removes inputs from the tree according to the bits of `seed`.
fn drop_inputs(steps: &[Step], seed: u64, counter: &mut u32) -> Vec<Step> {
    steps
        .iter()
        .map(|step| {
            let mut step = step.clone();
            step.inputs.retain(|_| {
                let keep = (seed >> (*counter % 64)) & 1 == 0;
                *counter += 1;
                keep
            });
            step.inline_input_groups = step
                .inline_input_groups
                .iter()
                .map(|group| InlineInputGroup::new(group.name.clone(), drop_inputs(&group.steps, seed, counter)))
                .collect();
            step
        })
        .collect()
}

fn all_user_specified(steps: &[Step]) -> bool {
    steps.iter().all(|step| {
        step.inputs.iter().all(|input| !input.is_generated())
            && step
                .inline_input_groups
                .iter()
                .all(|group| all_user_specified(&group.steps))
    })
}

fn check_provenance(steps: &[Step], memo: &SpecifiedStepMemo, by_id: bool) -> bool {
    steps.iter().all(|step| {
        let key = if by_id { &step.id } else { &step.name };
        let entry = memo.get(key);
        let inputs_ok = step.inputs.iter().all(|input| match entry {
            Some(entry) => input.is_generated() != entry.specifies(&input.name),
            None => !input.is_generated(),
        });
        let groups_ok = step.inline_input_groups.iter().all(|group| {
            match entry.and_then(|entry| entry.inline_group(&group.name)) {
                Some(nested) => check_provenance(&group.steps, nested, false),
                None => all_user_specified(&group.steps),
            }
        });
        inputs_ok && groups_ok
    })
}

/// Removes one top-level step and inserts a fresh one without an id.
fn reshape(steps: &[Step], remove: Option<usize>, insert: Option<usize>) -> Vec<Step> {
    let mut steps = steps.to_vec();
    if let Some(at) = remove.filter(|_| !steps.is_empty()) {
        steps.remove(at % steps.len());
    }
    if let Some(at) = insert {
        let fresh = Step::new("inserted", "action:inserted").with_input(Input::new("fresh", "1"));
        steps.insert(at % (steps.len() + 1), fresh);
    }
    steps
}

/// The prior step a proposed step should inherit generated inputs from:
/// same id at the top level, same position inside inline groups.
fn counterpart<'a>(prior: &'a [Step], step: &Step, index: usize, by_id: bool) -> Option<&'a Step> {
    if !by_id {
        return prior.get(index);
    }
    if !step.has_id() {
        return None;
    }
    prior.iter().find(|p| p.id == step.id)
}

fn check_restored(prior: &[Step], proposed: &[Step], revised: &[Step], by_id: bool) -> bool {
    if proposed.len() != revised.len() {
        return false;
    }
    proposed.iter().zip(revised).enumerate().all(|(index, (q, r))| {
        let Some(p) = counterpart(prior, q, index, by_id) else {
            return q == r;
        };
        let proposed_names: HashSet<&str> = q.inputs.iter().map(|i| i.name.as_str()).collect();

        let kept: Vec<&Input> = r
            .inputs
            .iter()
            .filter(|i| proposed_names.contains(i.name.as_str()))
            .collect();
        let added: Vec<&Input> = r
            .inputs
            .iter()
            .filter(|i| !proposed_names.contains(i.name.as_str()))
            .collect();
        let expected_added: Vec<&Input> = p
            .inputs
            .iter()
            .filter(|i| i.is_generated() && !proposed_names.contains(i.name.as_str()))
            .collect();

        let inputs_ok = kept == q.inputs.iter().collect::<Vec<_>>() && added == expected_added;
        let groups_ok = q
            .inline_input_groups
            .iter()
            .zip(&r.inline_input_groups)
            .all(|(qg, rg)| match p.inline_group(&qg.name) {
                Some(pg) => check_restored(&pg.steps, &qg.steps, &rg.steps, false),
                None => qg == rg,
            });
        inputs_ok && groups_ok
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_reconcile_is_idempotent(tree in tree_strategy(), stored in tree_strategy()) {
        let memo = extract_memo(&stored);
        let first = reconcile(&tree, Some(&memo), false);
        let second = reconcile(&tree, Some(&memo), false);
        prop_assert_eq!(&first, &second);

        let again = reconcile(&first, Some(&memo), false);
        prop_assert_eq!(first, again);
    }

    #[test]
    fn prop_reconcile_preserves_shape(tree in tree_strategy(), stored in tree_strategy()) {
        let memo = extract_memo(&stored);
        let reconciled = reconcile(&tree, Some(&memo), false);
        prop_assert_eq!(strip_provenance(&reconciled), strip_provenance(&tree));
    }

    #[test]
    fn prop_provenance_follows_memo(tree in tree_strategy(), stored in tree_strategy()) {
        let memo = extract_memo(&stored);
        let reconciled = reconcile(&tree, Some(&memo), false);
        prop_assert!(check_provenance(&reconciled, &memo, true));
    }

    #[test]
    fn prop_own_memo_is_a_fixpoint(tree in tree_strategy()) {
        let memo = extract_memo(&tree);
        prop_assert_eq!(reconcile(&tree, Some(&memo), false), tree);
    }

    #[test]
    fn prop_without_memo_nothing_is_generated(tree in tree_strategy()) {
        prop_assert!(all_user_specified(&reconcile(&tree, None, false)));
    }

    #[test]
    fn prop_include_all_nothing_is_generated(tree in tree_strategy(), stored in tree_strategy()) {
        let memo = extract_memo(&stored);
        prop_assert!(all_user_specified(&reconcile(&tree, Some(&memo), true)));
    }

    #[test]
    fn prop_restore_only_generated(prior in tree_strategy(), seed in any::<u64>()) {
        let proposed = drop_inputs(&prior, seed, &mut 0);
        let revised = restore_generated_inputs(&prior, &proposed);
        prop_assert!(check_restored(&prior, &proposed, &revised.steps, true));
    }

    #[test]
    fn prop_restore_follows_step_ids(
        prior in tree_strategy(),
        seed in any::<u64>(),
        remove in proptest::option::of(any::<usize>()),
        insert in proptest::option::of(any::<usize>()),
    ) {
        let proposed = reshape(&drop_inputs(&prior, seed, &mut 0), remove, insert);
        let revised = restore_generated_inputs(&prior, &proposed);
        prop_assert!(check_restored(&prior, &proposed, &revised.steps, true));

        for restored in &revised.restored {
            let index: usize = restored.path.split('.').nth(1).unwrap().parse().unwrap();
            let step = &proposed[index];
            prop_assert!(step.has_id());
            let source = prior.iter().find(|p| p.id == step.id);
            prop_assert!(source.is_some());
        }
    }

    #[test]
    fn prop_restore_without_removals_is_identity(prior in tree_strategy()) {
        let revised = restore_generated_inputs(&prior, &prior);
        prop_assert!(!revised.changed());
        prop_assert_eq!(revised.steps, prior);
    }

    #[test]
    fn prop_outbound_never_sends_generated(tree in tree_strategy()) {
        prop_assert!(all_user_specified(&outbound_steps(&tree)));
    }
}

/// Marks every input user-specified so trees can be compared by shape.
fn strip_provenance(steps: &[Step]) -> Vec<Step> {
    steps
        .iter()
        .map(|step| {
            let mut step = step.clone();
            step.inputs = step
                .inputs
                .iter()
                .map(|input| Input::new(input.name.clone(), input.value.clone()))
                .collect();
            step.inline_input_groups = step
                .inline_input_groups
                .iter()
                .map(|group| InlineInputGroup::new(group.name.clone(), strip_provenance(&group.steps)))
                .collect();
            step
        })
        .collect()
}
