//! The `pagerduty_incident_workflow` data source.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::IncidentWorkflowApi;
use crate::error::{Error, Result};
use crate::resource::{NAME_KEY, flatten_workflow};
use crate::state::ResourceData;

/// Looks up an existing workflow by its exact name.
///
/// There is no configuration to compare against, so every input is stored
/// as user-specified.
#[derive(Clone)]
pub struct IncidentWorkflowDataSource {
    api: Arc<dyn IncidentWorkflowApi>,
}

impl IncidentWorkflowDataSource {
    /// Creates the data source on top of an API implementation.
    pub fn new(api: Arc<dyn IncidentWorkflowApi>) -> Self {
        Self { api }
    }

    /// Finds the workflow named by the `name` attribute and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no workflow has that name, or any
    /// API error.
    #[instrument(name = "incident_workflow_data_source_read", skip_all)]
    pub async fn read(&self, data: &mut impl ResourceData) -> Result<()> {
        let name = match data.get(NAME_KEY) {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return Err(Error::missing_attribute(NAME_KEY)),
        };

        let candidates = self.api.list(Some(&name)).await?;
        let found = candidates
            .into_iter()
            .find(|workflow| workflow.name == name)
            .ok_or_else(|| Error::NotFound {
                resource: format!("incident workflow named {name:?}"),
            })?;

        debug!(id = %found.id, name = %name, "Found incident workflow");

        // List results omit steps; fetch the full definition.
        let workflow = self.api.get(&found.id).await?;
        data.set_id(&workflow.id);
        flatten_workflow(data, &workflow, None, true);
        Ok(())
    }
}
