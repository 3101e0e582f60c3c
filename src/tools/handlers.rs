//! Operation bodies. Each returns the success envelope or an error; the
//! dispatcher turns errors into `{success: false, error}`.

use crate::backend::{BackendClient, CampaignCreate, IngestRequest};
use crate::error::{Result, TarvenError};
use crate::query::{self, QueryRequest};
use crate::session::CampaignRef;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct DeleteCampaignParams {
    campaign_id: String,
}

fn parse_params<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| TarvenError::Validation(format!("Invalid parameters: {}", e)))
}

/// Create a campaign and make it the active one.
pub async fn create_campaign(client: &BackendClient, arguments: Value) -> Result<Value> {
    let request: CampaignCreate = parse_params(arguments)?;
    let campaign = client.create_campaign(&request).await?;

    client.session().set_active(CampaignRef::new(
        campaign.campaign_id.clone(),
        Some(campaign.name.clone()),
    ));

    Ok(json!({
        "success": true,
        "campaign_id": campaign.campaign_id,
        "message": format!("Campaign \"{}\" created", request.name)
    }))
}

/// Delete a campaign; the active pointer is cleared only if it matches.
pub async fn delete_campaign(client: &BackendClient, arguments: Value) -> Result<Value> {
    let params: DeleteCampaignParams = parse_params(arguments)?;
    client.delete_campaign(&params.campaign_id).await?;

    if client.session().clear_if_matches(&params.campaign_id) {
        log::info!("Active campaign {} deleted", params.campaign_id);
    }

    Ok(json!({"success": true, "message": "Campaign deleted"}))
}

/// Forward an entity/relationship batch to the active campaign's ingest endpoint.
pub async fn store_entities(client: &BackendClient, arguments: Value) -> Result<Value> {
    let campaign = client.session().require_active()?;
    let request: IngestRequest = parse_params(arguments)?;
    let data = client.ingest(&campaign.id, &request.normalized()).await?;

    Ok(json!({"success": true, "data": data}))
}

/// Compile a query descriptor and GET it against the active campaign.
pub async fn query(client: &BackendClient, arguments: Value) -> Result<Value> {
    let campaign = client.session().require_active()?;
    let request: QueryRequest = parse_params(arguments)?;
    let path = query::compile(&campaign.id, &request)?;
    let data = client.get(&path).await?;

    Ok(json!({"success": true, "data": data}))
}
