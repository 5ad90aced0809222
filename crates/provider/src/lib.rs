//! # pagerduty-provider
//!
//! Terraform resource glue for PagerDuty incident workflows.
//!
//! This crate wires the step reconciliation in `pagerduty-workflow` to the
//! PagerDuty REST API:
//!
//! - [`PagerDutyClient`] talks to the incident workflow endpoints, retrying
//!   transient failures at a fixed interval
//! - [`IncidentWorkflowResource`] implements create, read, update, delete and
//!   plan customization against a [`ResourceData`] / [`ResourceDiff`] store
//! - [`IncidentWorkflowDataSource`] looks workflows up by name
//!
//! ## Example
//!
//! ```ignore
//! use pagerduty_provider::{AttributeState, PagerDutyProvider, ProviderConfig};
//! use serde_json::json;
//!
//! let provider = PagerDutyProvider::new(ProviderConfig::new(token, "https://api.pagerduty.com")?)?;
//! let resource = provider.incident_workflow_resource();
//!
//! let mut state = AttributeState::from_attributes(json!({
//!     "name": "Major incident",
//!     "step": [{
//!         "name": "Notify",
//!         "action": "pagerduty.com:incident-workflows:send-status-update:1",
//!         "input": [{"name": "Message", "value": "Investigating"}]
//!     }]
//! }))?;
//! resource.create(&mut state).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_source;
pub mod error;
pub mod logging;
#[allow(missing_docs)]
pub mod models;
pub mod resource;
pub mod state;

pub use client::{IncidentWorkflowApi, PagerDutyClient};
pub use config::{ProviderConfig, ProviderSettings, RetryPolicy};
pub use data_source::IncidentWorkflowDataSource;
pub use error::{Error, Result};
pub use resource::{IncidentWorkflowResource, RESOURCE_TYPE, customize_diff};
pub use state::{AttributeState, ResourceData, ResourceDiff};

use std::sync::Arc;

use tracing::instrument;

/// Entry point holding the configured API client.
#[derive(Clone)]
pub struct PagerDutyProvider {
    api: Arc<dyn IncidentWorkflowApi>,
}

impl PagerDutyProvider {
    /// Creates the provider with an HTTP client for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[instrument(name = "pagerduty_provider_new", skip(config), fields(api_url = %config.api_url))]
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = PagerDutyClient::new(&config)?;
        Ok(Self::with_api(Arc::new(client)))
    }

    /// Creates the provider on top of any API implementation.
    pub fn with_api(api: Arc<dyn IncidentWorkflowApi>) -> Self {
        Self { api }
    }

    /// Resource types this provider serves.
    #[must_use]
    pub fn resource_types(&self) -> &'static [&'static str] {
        &[RESOURCE_TYPE]
    }

    /// Data source types this provider serves.
    #[must_use]
    pub fn data_source_types(&self) -> &'static [&'static str] {
        &[RESOURCE_TYPE]
    }

    /// The `pagerduty_incident_workflow` resource.
    #[must_use]
    pub fn incident_workflow_resource(&self) -> IncidentWorkflowResource {
        IncidentWorkflowResource::new(Arc::clone(&self.api))
    }

    /// The `pagerduty_incident_workflow` data source.
    #[must_use]
    pub fn incident_workflow_data_source(&self) -> IncidentWorkflowDataSource {
        IncidentWorkflowDataSource::new(Arc::clone(&self.api))
    }
}
