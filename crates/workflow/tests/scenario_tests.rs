//! End-to-end reconciliation scenarios across a read, plan, and apply cycle.

use pagerduty_workflow::{
    InlineInputGroup, Input, Provenance, SpecifiedStep, SpecifiedStepMemo, Step, extract_memo,
    outbound_steps, reconcile, restore_generated_inputs, steps_from_attributes,
    steps_to_attributes,
};
use serde_json::json;

const SEND_UPDATE: &str = "pagerduty.com:incident-workflows:send-status-update:1";
const LOOP_UNTIL: &str = "pagerduty.com:incident-workflows:loop-until:1";

fn provenance_of(step: &Step, name: &str) -> Option<Provenance> {
    step.input(name).map(|input| input.provenance)
}

#[test]
fn test_server_added_input_is_generated_on_read() {
    let stored = vec![
        Step::new("S", SEND_UPDATE)
            .with_id("S")
            .with_input(Input::new("A", "1"))
            .with_input(Input::generated("B", "2")),
    ];
    let memo = extract_memo(&stored);
    assert_eq!(memo.get("S").unwrap().input_names, vec!["A".to_string()]);

    let observed = vec![
        Step::new("S", SEND_UPDATE)
            .with_id("S")
            .with_input(Input::new("A", "1"))
            .with_input(Input::new("B", "2"))
            .with_input(Input::new("C", "3")),
    ];

    let reconciled = reconcile(&observed, Some(&memo), false);
    let step = &reconciled[0];
    assert_eq!(provenance_of(step, "A"), Some(Provenance::UserSpecified));
    assert_eq!(provenance_of(step, "B"), Some(Provenance::ServerGenerated));
    assert_eq!(provenance_of(step, "C"), Some(Provenance::ServerGenerated));
}

#[test]
fn test_plan_restores_generated_and_drops_user_removal() {
    let prior = vec![
        Step::new("S", SEND_UPDATE)
            .with_id("S")
            .with_input(Input::new("A", "1"))
            .with_input(Input::generated("B", "2"))
            .with_input(Input::new("C", "3")),
    ];
    let proposed = vec![
        Step::new("S", SEND_UPDATE)
            .with_id("S")
            .with_input(Input::new("A", "1")),
    ];

    let revised = restore_generated_inputs(&prior, &proposed);
    let step = &revised.steps[0];
    assert_eq!(provenance_of(step, "A"), Some(Provenance::UserSpecified));
    assert_eq!(provenance_of(step, "B"), Some(Provenance::ServerGenerated));
    assert_eq!(provenance_of(step, "C"), None);
    assert_eq!(revised.restored.len(), 1);
    assert_eq!(revised.restored[0].name, "B");

    assert_eq!(
        proposed[0].inputs.len(),
        1,
        "proposed tree must not be mutated"
    );
}

#[test]
fn test_nested_inline_step_tagged_independently() {
    let stored = vec![
        Step::new("Loop", LOOP_UNTIL)
            .with_id("PLOOP")
            .with_input(Input::new("Condition", "incident.status matches 'resolved'"))
            .with_inline_group(InlineInputGroup::new(
                "Actions",
                vec![
                    Step::new("Step2a", SEND_UPDATE).with_input(Input::new("Message", "ping")),
                ],
            )),
    ];
    let memo = extract_memo(&stored);

    let observed = vec![
        Step::new("Loop", LOOP_UNTIL)
            .with_id("PLOOP")
            .with_input(Input::new("Condition", "incident.status matches 'resolved'"))
            .with_input(Input::new("Delay", "5"))
            .with_inline_group(InlineInputGroup::new(
                "Actions",
                vec![
                    Step::new("Step2a", SEND_UPDATE)
                        .with_input(Input::new("Message", "ping"))
                        .with_input(Input::new("Audience", "internal")),
                ],
            )),
    ];

    let reconciled = reconcile(&observed, Some(&memo), false);
    let parent = &reconciled[0];
    assert_eq!(provenance_of(parent, "Condition"), Some(Provenance::UserSpecified));
    assert_eq!(provenance_of(parent, "Delay"), Some(Provenance::ServerGenerated));

    let nested = &parent.inline_group("Actions").unwrap().steps[0];
    assert_eq!(provenance_of(nested, "Message"), Some(Provenance::UserSpecified));
    assert_eq!(provenance_of(nested, "Audience"), Some(Provenance::ServerGenerated));
}

#[test]
fn test_nested_memo_ignores_sibling_entries() {
    let mut nested_memo = SpecifiedStepMemo::new();
    nested_memo.insert(
        "Step2a",
        SpecifiedStep {
            input_names: vec!["Message".to_string()],
            ..SpecifiedStep::default()
        },
    );
    let mut memo = SpecifiedStepMemo::new();
    memo.insert(
        "PLOOP",
        SpecifiedStep {
            input_names: vec!["Message".to_string()],
            inline_groups: [("Actions".to_string(), nested_memo)].into_iter().collect(),
        },
    );

    let observed = vec![
        Step::new("Loop", LOOP_UNTIL)
            .with_id("PLOOP")
            .with_inline_group(InlineInputGroup::new(
                "Actions",
                vec![
                    Step::new("Step2a", SEND_UPDATE).with_input(Input::new("Message", "x")),
                    Step::new("Step2b", SEND_UPDATE).with_input(Input::new("Message", "y")),
                ],
            )),
    ];

    let reconciled = reconcile(&observed, Some(&memo), false);
    let group = reconciled[0].inline_group("Actions").unwrap();
    assert!(!group.steps[0].inputs[0].is_generated());
    // No entry for Step2b, so nothing on it is treated as generated.
    assert!(!group.steps[1].inputs[0].is_generated());
}

#[test]
fn test_first_create_has_no_generated_inputs() {
    let observed = vec![
        Step::new("Notify", SEND_UPDATE)
            .with_id("PNEW")
            .with_input(Input::new("Message", "hi"))
            .with_input(Input::new("Audience", "internal")),
    ];

    let reconciled = reconcile(&observed, None, false);
    assert!(reconciled[0].inputs.iter().all(|input| !input.is_generated()));
}

#[test]
fn test_full_cycle_through_attributes() {
    let state = json!([{
        "id": "PSTEP",
        "name": "Notify",
        "action": SEND_UPDATE,
        "input": [
            {"name": "Message", "value": "hi", "generated": false},
            {"name": "Audience", "value": "internal", "generated": true}
        ],
        "inline_steps_input": []
    }]);

    let stored = steps_from_attributes(&state).unwrap();
    let memo = extract_memo(&stored);

    let request = outbound_steps(&stored);
    assert_eq!(request[0].inputs.len(), 1);

    // The API echoes the default back.
    let response = stored.clone();
    let reconciled = reconcile(&response, Some(&memo), false);
    assert_eq!(steps_to_attributes(&reconciled), state);
}
