use crate::backend::types::{Campaign, CampaignCreate, EntityRecord, IngestRequest, RawSubgraph};
use crate::error::{Result, TarvenError};
use crate::query::{self, QueryFilters, QueryRequest, QueryType};
use crate::session::Session;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// REST client for the campaign graph backend
///
/// The base URL is read from the session on every call so a settings save
/// takes effect without rebuilding the client.
pub struct BackendClient {
    http: Client,
    session: Arc<Session>,
}

impl BackendClient {
    /// Create a new backend client
    ///
    /// # Arguments
    ///
    /// * `session` - Session supplying the backend base URL
    /// * `timeout` - Optional per-request timeout (`None` waits indefinitely)
    pub fn new(session: Arc<Session>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self { http, session })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Absolute URL for an `/api`-relative path such as `/campaigns`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api{}",
            self.session.backend_url().trim_end_matches('/'),
            path
        )
    }

    pub async fn create_campaign(&self, request: &CampaignCreate) -> Result<Campaign> {
        let url = self.endpoint("/campaigns");
        log::debug!("POST {}", url);
        let response = self.http.post(&url).json(request).send().await?;
        read_json(response).await
    }

    /// Delete a campaign. Any non-2xx status is reported as `CampaignNotFound`.
    pub async fn delete_campaign(&self, campaign_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/campaigns/{}", urlencoding::encode(campaign_id)));
        log::debug!("DELETE {}", url);
        let response = self.http.delete(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::debug!("DELETE {} returned {}", url, status);
            return Err(TarvenError::CampaignNotFound);
        }
        Ok(())
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let url = self.endpoint("/campaigns");
        log::debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    /// Send an ingest batch; the backend's reply is returned untouched.
    pub async fn ingest(&self, campaign_id: &str, request: &IngestRequest) -> Result<Value> {
        let url = self.endpoint(&format!(
            "/campaigns/{}/ingest",
            urlencoding::encode(campaign_id)
        ));
        log::debug!(
            "POST {} ({} entities, {} relationships)",
            url,
            request.entities.len(),
            request.relationships.len()
        );
        let response = self.http.post(&url).json(request).send().await?;
        read_json(response).await
    }

    /// GET a compiled query path and return the parsed body.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path);
        log::debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    /// All entities of a campaign.
    pub async fn list_entities(&self, campaign_id: &str) -> Result<Vec<EntityRecord>> {
        let body = self
            .get(&format!("/campaigns/{}/entities", urlencoding::encode(campaign_id)))
            .await?;
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("entities") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        serde_json::from_value(Value::Array(items))
            .map_err(|e| TarvenError::Transport(format!("Invalid entity list: {}", e)))
    }

    /// Subgraph around a named entity at the default (skeleton) detail level.
    pub async fn subgraph(
        &self,
        campaign_id: &str,
        entity_name: &str,
        depth: u32,
    ) -> Result<RawSubgraph> {
        let request = QueryRequest {
            query_type: QueryType::Subgraph,
            filters: QueryFilters {
                entity_name: Some(entity_name.to_string()),
                depth: Some(depth),
                ..QueryFilters::default()
            },
        };
        let path = query::compile(campaign_id, &request)?;
        let body = self.get(&path).await?;
        serde_json::from_value(body)
            .map_err(|e| TarvenError::Transport(format!("Invalid subgraph response: {}", e)))
    }

    /// Full entity record, `None` when the backend does not return one.
    pub async fn entity(&self, campaign_id: &str, entity_id: &str) -> Result<Option<EntityRecord>> {
        let url = self.endpoint(&format!(
            "/campaigns/{}/entities/{}",
            urlencoding::encode(campaign_id),
            urlencoding::encode(entity_id)
        ));
        log::debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            log::debug!("GET {} returned {}", url, response.status());
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }
}

/// Check the status, then decode the body as JSON.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(TarvenError::Backend {
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| TarvenError::Transport(format!("Invalid JSON response: {}", e)))
}
