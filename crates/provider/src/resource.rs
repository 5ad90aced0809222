//! The `pagerduty_incident_workflow` resource.
//!
//! Steps are flattened into state with each input tagged `generated` when
//! the API supplied it rather than the configuration. The memo of declared
//! inputs is always taken from the attributes as they stood before the API
//! call, so a read or update never mistakes server defaults for drift.

use std::sync::Arc;

use pagerduty_workflow::{
    MalformedStateError, RestoredInput, STEP_KEY, SpecifiedStepMemo, Step, extract_memo,
    outbound_steps, reconcile, restore_generated_inputs, splice_restored_inputs,
    steps_from_attributes, steps_to_attributes,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::IncidentWorkflowApi;
use crate::error::{Error, Result};
use crate::models::{IncidentWorkflow, TeamReference, WorkflowStep};
use crate::state::{ResourceData, ResourceDiff};

/// Terraform type name of the resource.
pub const RESOURCE_TYPE: &str = "pagerduty_incident_workflow";

pub(crate) const NAME_KEY: &str = "name";
pub(crate) const DESCRIPTION_KEY: &str = "description";
pub(crate) const TEAM_KEY: &str = "team";

/// CRUD and plan customization for incident workflows.
#[derive(Clone)]
pub struct IncidentWorkflowResource {
    api: Arc<dyn IncidentWorkflowApi>,
}

impl IncidentWorkflowResource {
    /// Creates the resource on top of an API implementation.
    pub fn new(api: Arc<dyn IncidentWorkflowApi>) -> Self {
        Self { api }
    }

    /// Creates the workflow and stores the server's view.
    ///
    /// Nothing is recorded as declared before the first create, so every
    /// input the server returns is stored as user-specified.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is malformed or the API call
    /// fails.
    #[instrument(name = "incident_workflow_resource_create", skip_all)]
    pub async fn create(&self, data: &mut impl ResourceData) -> Result<()> {
        let (workflow, _) = build_workflow(data)?;
        let created = self.api.create(&workflow).await?;

        info!(id = %created.id, name = %created.name, "Created incident workflow");
        data.set_id(&created.id);
        flatten_workflow(data, &created, None, false);
        Ok(())
    }

    /// Refreshes state from the API.
    ///
    /// A workflow that no longer exists clears the id instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state is malformed or the API call fails.
    #[instrument(name = "incident_workflow_resource_read", skip_all, fields(id = %data.id()))]
    pub async fn read(&self, data: &mut impl ResourceData) -> Result<()> {
        let memo = extract_memo(&stored_steps(data)?);

        let fetched = self.api.get(data.id()).await;
        match fetched {
            Ok(workflow) => {
                flatten_workflow(data, &workflow, Some(&memo), false);
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!("Incident workflow no longer exists, removing from state");
                data.set_id("");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Sends the planned configuration and stores the server's view.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is malformed or the API call
    /// fails.
    #[instrument(name = "incident_workflow_resource_update", skip_all, fields(id = %data.id()))]
    pub async fn update(&self, data: &mut impl ResourceData) -> Result<()> {
        let (workflow, memo) = build_workflow(data)?;
        let updated = self.api.update(data.id(), &workflow).await?;

        debug!(steps = updated.steps.len(), "Updated incident workflow");
        flatten_workflow(data, &updated, Some(&memo), false);
        Ok(())
    }

    /// Deletes the workflow; one that is already gone counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(name = "incident_workflow_resource_delete", skip_all, fields(id = %data.id()))]
    pub async fn delete(&self, data: &mut impl ResourceData) -> Result<()> {
        let deleted = self.api.delete(data.id()).await;
        match deleted {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!("Incident workflow already deleted");
            }
            Err(err) => return Err(err),
        }
        data.set_id("");
        Ok(())
    }

    /// Keeps server-generated inputs out of the planned removals.
    ///
    /// Does nothing until the resource exists. Only the affected input lists
    /// of the proposed `step` value are rewritten. Errors from `diff` are
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the framework's error if reading or writing the plan fails,
    /// or a malformed-state error if the step attributes have the wrong shape.
    pub fn customize_diff<D: ResourceDiff>(
        &self,
        diff: &mut D,
    ) -> std::result::Result<Vec<RestoredInput>, D::Error> {
        customize_diff(diff)
    }
}

/// See [`IncidentWorkflowResource::customize_diff`].
///
/// # Errors
///
/// Returns the framework's error if reading or writing the plan fails, or a
/// malformed-state error if the step attributes have the wrong shape.
pub fn customize_diff<D: ResourceDiff>(
    diff: &mut D,
) -> std::result::Result<Vec<RestoredInput>, D::Error> {
    if diff.id().is_empty() {
        return Ok(Vec::new());
    }

    let (prior, mut planned) = diff.get_change(STEP_KEY)?;
    let prior = steps_from_attributes(&prior)?;
    let proposed = steps_from_attributes(&planned)?;

    let revised = restore_generated_inputs(&prior, &proposed);
    if revised.changed() {
        let names: Vec<String> = revised.restored.iter().map(ToString::to_string).collect();
        debug!(restored = ?names, "Restored server-generated inputs in plan");
        splice_restored_inputs(&mut planned, &revised.restored)?;
        diff.set_new(STEP_KEY, planned)?;
    }
    Ok(revised.restored)
}

pub(crate) fn stored_steps(data: &impl ResourceData) -> Result<Vec<Step>> {
    match data.get(STEP_KEY) {
        Some(value) => Ok(steps_from_attributes(value)?),
        None => Ok(Vec::new()),
    }
}

/// Builds the request body and the memo of declared inputs from the
/// current attributes.
fn build_workflow(data: &impl ResourceData) -> Result<(IncidentWorkflow, SpecifiedStepMemo)> {
    let name = string_attribute(data, NAME_KEY)?.ok_or_else(|| Error::missing_attribute(NAME_KEY))?;
    let description = string_attribute(data, DESCRIPTION_KEY)?;
    let team = string_attribute(data, TEAM_KEY)?
        .filter(|team| !team.is_empty())
        .map(TeamReference::new);

    let steps = stored_steps(data)?;
    let memo = extract_memo(&steps);

    let workflow = IncidentWorkflow {
        id: String::new(),
        name,
        description,
        team,
        steps: outbound_steps(&steps).iter().map(WorkflowStep::from).collect(),
    };
    Ok((workflow, memo))
}

fn string_attribute(data: &impl ResourceData, key: &str) -> Result<Option<String>> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MalformedStateError::new(key, "a string").into()),
    }
}

/// Writes the server's view of a workflow into state.
pub(crate) fn flatten_workflow(
    data: &mut impl ResourceData,
    workflow: &IncidentWorkflow,
    memo: Option<&SpecifiedStepMemo>,
    include_all: bool,
) {
    let steps = reconcile(&workflow.step_tree(), memo, include_all);

    data.set(NAME_KEY, Value::String(workflow.name.clone()));
    data.set(
        DESCRIPTION_KEY,
        workflow
            .description
            .clone()
            .map_or(Value::Null, Value::String),
    );
    data.set(
        TEAM_KEY,
        workflow
            .team
            .as_ref()
            .map_or(Value::Null, |team| Value::String(team.id.clone())),
    );
    data.set(STEP_KEY, steps_to_attributes(&steps));
}
