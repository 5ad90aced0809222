//! PagerDuty REST client for incident workflows.
//!
//! Transient failures (transport errors, 429, 5xx) are retried at a fixed
//! interval until the configured retry timeout elapses. Everything else is
//! returned on the first attempt. Creating a workflow is not idempotent, so
//! it is only resent after a 429, which the API rejects unprocessed.

use std::future::Future;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::{ProviderConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::models::{IncidentWorkflow, IncidentWorkflowEnvelope, IncidentWorkflowPage};

/// Media type for version 2 of the REST API.
const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

/// Page size used when listing workflows.
const PAGE_LIMIT: usize = 100;

/// Operations on the incident workflow endpoint.
#[async_trait]
pub trait IncidentWorkflowApi: Send + Sync {
    /// Creates a workflow and returns the stored version.
    async fn create(&self, workflow: &IncidentWorkflow) -> Result<IncidentWorkflow>;

    /// Fetches a workflow by id.
    async fn get(&self, id: &str) -> Result<IncidentWorkflow>;

    /// Replaces a workflow and returns the stored version.
    async fn update(&self, id: &str, workflow: &IncidentWorkflow) -> Result<IncidentWorkflow>;

    /// Deletes a workflow.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Lists workflows, optionally filtered by a name query.
    async fn list(&self, query: Option<&str>) -> Result<Vec<IncidentWorkflow>>;
}

/// HTTP implementation of [`IncidentWorkflowApi`].
pub struct PagerDutyClient {
    http: Client,
    base_url: String,
    authorization: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for PagerDutyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagerDutyClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PagerDutyClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            http,
            base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
            authorization: config.authorization(),
            retry: config.retry,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .header(header::ACCEPT, ACCEPT_V2)
            .header(header::AUTHORIZATION, &self.authorization)
    }

    /// Runs `call` until it succeeds, fails with an error `retryable`
    /// rejects, or the retry timeout is used up.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &str,
        retryable: fn(&Error) -> bool,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.retry.backoff();
        let mut attempts = 0_u32;

        loop {
            attempts += 1;

            match call().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "PagerDuty request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !retryable(&err) => return Err(err),
                Err(err) => {
                    let Some(wait) = backoff.next_backoff() else {
                        warn!(operation, attempts, error = %err, "Giving up on PagerDuty request");
                        return Err(Error::Timeout {
                            operation: operation.to_string(),
                            last_error: err.to_string(),
                        });
                    };
                    warn!(
                        operation,
                        attempts,
                        error = %err,
                        retry_in_ms = wait.as_millis(),
                        "Retrying PagerDuty request"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> Result<T> {
        let response = builder.send().await?;
        let response = check_status(response, path).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound {
            resource: path.to_string(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl IncidentWorkflowApi for PagerDutyClient {
    #[instrument(name = "incident_workflow_create", skip(self, workflow), fields(name = %workflow.name))]
    async fn create(&self, workflow: &IncidentWorkflow) -> Result<IncidentWorkflow> {
        let body = IncidentWorkflowEnvelope {
            incident_workflow: workflow.clone(),
        };
        let body = &body;
        let path = "incident_workflows";
        let envelope: IncidentWorkflowEnvelope = self
            .with_retry("create incident workflow", Error::is_rate_limited, || {
                self.send_json(self.request(Method::POST, path).json(body), path)
            })
            .await?;

        debug!(id = %envelope.incident_workflow.id, "Created incident workflow");
        Ok(envelope.incident_workflow)
    }

    #[instrument(name = "incident_workflow_get", skip(self))]
    async fn get(&self, id: &str) -> Result<IncidentWorkflow> {
        let path = format!("incident_workflows/{id}");
        let path = path.as_str();
        let envelope: IncidentWorkflowEnvelope = self
            .with_retry("read incident workflow", Error::is_retryable, || {
                self.send_json(self.request(Method::GET, path), path)
            })
            .await?;
        Ok(envelope.incident_workflow)
    }

    #[instrument(name = "incident_workflow_update", skip(self, workflow))]
    async fn update(&self, id: &str, workflow: &IncidentWorkflow) -> Result<IncidentWorkflow> {
        let body = IncidentWorkflowEnvelope {
            incident_workflow: IncidentWorkflow {
                id: String::new(),
                ..workflow.clone()
            },
        };
        let body = &body;
        let path = format!("incident_workflows/{id}");
        let path = path.as_str();
        let envelope: IncidentWorkflowEnvelope = self
            .with_retry("update incident workflow", Error::is_retryable, || {
                self.send_json(self.request(Method::PUT, path).json(body), path)
            })
            .await?;
        Ok(envelope.incident_workflow)
    }

    #[instrument(name = "incident_workflow_delete", skip(self))]
    async fn delete(&self, id: &str) -> Result<()> {
        let path = format!("incident_workflows/{id}");
        let path = path.as_str();
        self.with_retry("delete incident workflow", Error::is_retryable, || async move {
            let response = self.request(Method::DELETE, path).send().await?;
            check_status(response, path).await.map(|_| ())
        })
        .await
    }

    #[instrument(name = "incident_workflow_list", skip(self))]
    async fn list(&self, query: Option<&str>) -> Result<Vec<IncidentWorkflow>> {
        let path = "incident_workflows";
        let mut workflows = Vec::new();
        let mut offset = 0_usize;

        loop {
            let mut params = vec![
                ("limit", PAGE_LIMIT.to_string()),
                ("offset", offset.to_string()),
            ];
            if let Some(query) = query {
                params.push(("query", query.to_string()));
            }

            let params = &params;
            let page: IncidentWorkflowPage = self
                .with_retry("list incident workflows", Error::is_retryable, || {
                    self.send_json(self.request(Method::GET, path).query(params), path)
                })
                .await?;

            let fetched = page.incident_workflows.len();
            if fetched > 0 && page.offset + fetched <= offset {
                warn!(
                    requested = offset,
                    returned = page.offset,
                    "Incident workflow listing did not advance, stopping"
                );
                break;
            }
            workflows.extend(page.incident_workflows);
            if !page.more || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        debug!(count = workflows.len(), "Listed incident workflows");
        Ok(workflows)
    }
}
