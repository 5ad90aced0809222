//! Wire types for the PagerDuty incident workflow API.

use pagerduty_workflow::{InlineInputGroup, Input, Step};
use serde::{Deserialize, Serialize};

/// Reference type name the API expects for teams.
pub const TEAM_REFERENCE: &str = "team_reference";

/// An incident workflow as sent to and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncidentWorkflow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamReference>,

    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// Owning team of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamReference {
    pub id: String,

    #[serde(rename = "type", default = "team_reference")]
    pub kind: String,
}

impl TeamReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TEAM_REFERENCE.to_string(),
        }
    }
}

fn team_reference() -> String {
    TEAM_REFERENCE.to_string()
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub name: String,

    pub action_configuration: ActionConfiguration,
}

/// Action and inputs of a step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionConfiguration {
    pub action_id: String,

    #[serde(default)]
    pub inputs: Vec<ActionInput>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_steps_inputs: Vec<InlineStepsInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInput {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineStepsInput {
    pub name: String,
    pub value: InlineStepsValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineStepsValue {
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// `{"incident_workflow": {...}}` request and response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentWorkflowEnvelope {
    pub incident_workflow: IncidentWorkflow,
}

/// One page of the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentWorkflowPage {
    #[serde(default)]
    pub incident_workflows: Vec<IncidentWorkflow>,

    #[serde(default)]
    pub more: bool,

    #[serde(default)]
    pub offset: usize,

    #[serde(default)]
    pub limit: usize,
}

impl From<&Step> for WorkflowStep {
    fn from(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            name: step.name.clone(),
            action_configuration: ActionConfiguration {
                action_id: step.action_id.clone(),
                inputs: step
                    .inputs
                    .iter()
                    .map(|input| ActionInput {
                        name: input.name.clone(),
                        value: input.value.clone(),
                    })
                    .collect(),
                inline_steps_inputs: step
                    .inline_input_groups
                    .iter()
                    .map(|group| InlineStepsInput {
                        name: group.name.clone(),
                        value: InlineStepsValue {
                            steps: group.steps.iter().map(WorkflowStep::from).collect(),
                        },
                    })
                    .collect(),
            },
        }
    }
}

impl From<&WorkflowStep> for Step {
    fn from(step: &WorkflowStep) -> Self {
        let config = &step.action_configuration;
        Self {
            id: step.id.clone(),
            name: step.name.clone(),
            action_id: config.action_id.clone(),
            inputs: config
                .inputs
                .iter()
                .map(|input| Input::new(input.name.clone(), input.value.clone()))
                .collect(),
            inline_input_groups: config
                .inline_steps_inputs
                .iter()
                .map(|group| {
                    InlineInputGroup::new(
                        group.name.clone(),
                        group.value.steps.iter().map(Step::from).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl IncidentWorkflow {
    /// Steps as the typed tree, every input user-specified.
    #[must_use]
    pub fn step_tree(&self) -> Vec<Step> {
        self.steps.iter().map(Step::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_api_response() {
        let body = json!({
            "incident_workflow": {
                "id": "PWF1",
                "type": "incident_workflow",
                "name": "Major incident",
                "description": null,
                "team": {"id": "PTEAM", "type": "team_reference"},
                "steps": [{
                    "id": "PSTEP1",
                    "type": "step",
                    "name": "Loop",
                    "action_configuration": {
                        "action_id": "pagerduty.com:incident-workflows:loop-until:1",
                        "inputs": [{"name": "Condition", "value": "x"}],
                        "inline_steps_inputs": [{
                            "name": "Actions",
                            "value": {"steps": [{
                                "name": "Step2a",
                                "action_configuration": {
                                    "action_id": "pagerduty.com:incident-workflows:send-status-update:1",
                                    "inputs": [{"name": "Message", "value": "ping"}]
                                }
                            }]}
                        }]
                    }
                }]
            }
        });

        let envelope: IncidentWorkflowEnvelope = serde_json::from_value(body).unwrap();
        let workflow = envelope.incident_workflow;
        assert_eq!(workflow.team, Some(TeamReference::new("PTEAM")));
        assert!(workflow.description.is_none());

        let steps = workflow.step_tree();
        assert_eq!(steps[0].id, "PSTEP1");
        let nested = &steps[0].inline_group("Actions").unwrap().steps[0];
        assert_eq!(nested.name, "Step2a");
        assert_eq!(nested.inputs[0].value, "ping");
    }

    #[test]
    fn test_encodes_request_without_empty_fields() {
        let step = Step::new("Notify", "action:notify").with_input(Input::new("Message", "hi"));
        let workflow = IncidentWorkflow {
            name: "wf".to_string(),
            steps: vec![WorkflowStep::from(&step)],
            ..IncidentWorkflow::default()
        };

        let value = serde_json::to_value(&workflow).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "wf",
                "steps": [{
                    "name": "Notify",
                    "action_configuration": {
                        "action_id": "action:notify",
                        "inputs": [{"name": "Message", "value": "hi"}]
                    }
                }]
            })
        );
    }
}
