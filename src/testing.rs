//! In-process graph backend for tests.
//!
//! Serves the REST contract on an ephemeral port, upserts entities by name
//! with list-field append, and counts every request it receives.

use crate::backend::{is_list_field, BackendClient};
use crate::session::Session;
use crate::settings::Settings;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone)]
struct MockEntity {
    entity_id: String,
    entity_type: String,
    name: String,
    properties: Map<String, Value>,
}

impl MockEntity {
    fn record(&self) -> Value {
        json!({
            "entity_id": self.entity_id,
            "type": self.entity_type,
            "name": self.name,
            "properties": self.properties,
            "metadata": {}
        })
    }

    fn skeleton(&self) -> Value {
        json!({"id": self.entity_id, "label": self.name, "type": self.entity_type})
    }
}

#[derive(Default)]
struct MockState {
    requests: usize,
    next_id: usize,
    campaigns: Vec<Value>,
    entities: HashMap<String, Vec<MockEntity>>,
    relationships: HashMap<String, Vec<Value>>,
    ingests: Vec<Value>,
    entity_delays: HashMap<String, u64>,
    subgraph_delays: HashMap<String, u64>,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn has_campaign(&self, id: &str) -> bool {
        self.campaigns.iter().any(|c| c["campaign_id"] == id)
    }

    fn resolve(&self, campaign_id: &str, name_or_id: &str) -> Option<String> {
        self.entities.get(campaign_id).and_then(|list| {
            list.iter()
                .find(|e| e.name == name_or_id || e.entity_id == name_or_id)
                .map(|e| e.entity_id.clone())
        })
    }

    fn upsert_entity(&mut self, campaign_id: &str, entity: &Value) {
        let name = entity["name"].as_str().unwrap_or_default().to_string();
        let entity_type = entity["type"].as_str().unwrap_or("Unknown").to_string();
        let incoming = entity["properties"].as_object().cloned().unwrap_or_default();

        let existing = self
            .entities
            .get_mut(campaign_id)
            .and_then(|list| list.iter_mut().find(|e| e.name == name));
        if let Some(existing) = existing {
            for (key, value) in incoming {
                if is_list_field(&key) {
                    let slot = existing
                        .properties
                        .entry(key)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = slot {
                        match value {
                            Value::Array(values) => items.extend(values),
                            other => items.push(other),
                        }
                    }
                } else {
                    existing.properties.insert(key, value);
                }
            }
            existing.entity_type = entity_type;
            return;
        }

        let entity_id = self.next_id("ent");
        self.entities
            .entry(campaign_id.to_string())
            .or_default()
            .push(MockEntity {
                entity_id,
                entity_type,
                name,
                properties: incoming,
            });
    }

    fn add_relationship(&mut self, campaign_id: &str, from: &str, to: &str, rel_type: &str, properties: Value) {
        let (Some(from_id), Some(to_id)) = (self.resolve(campaign_id, from), self.resolve(campaign_id, to)) else {
            return;
        };
        let id = self.next_id("rel");
        self.relationships
            .entry(campaign_id.to_string())
            .or_default()
            .push(json!({
                "id": id,
                "from_id": from_id,
                "to_id": to_id,
                "type": rel_type,
                "properties": properties
            }));
    }
}

type Shared = Arc<Mutex<MockState>>;

fn hit(state: &Shared) -> MutexGuard<'_, MockState> {
    let mut guard = state.lock().unwrap();
    guard.requests += 1;
    guard
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Campaign not found"}))).into_response()
}

/// Handle to a running mock backend
pub struct MockBackend {
    pub url: String,
    state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .route("/api/campaigns", post(create_campaign).get(list_campaigns))
            .route("/api/campaigns/:campaign_id", delete(delete_campaign))
            .route("/api/campaigns/:campaign_id/ingest", post(ingest))
            .route("/api/campaigns/:campaign_id/entities", get(list_entities))
            .route("/api/campaigns/:campaign_id/entities/:entity_id", get(get_entity))
            .route("/api/campaigns/:campaign_id/relationships", get(list_relationships))
            .route("/api/campaigns/:campaign_id/paths", get(paths))
            .route("/api/campaigns/:campaign_id/subgraph", get(subgraph))
            .route("/api/campaigns/:campaign_id/notes", get(plain_notes))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Fresh session pointed at this backend with tools enabled.
    pub fn session(&self) -> Arc<Session> {
        session_for(&self.url)
    }

    /// Client over a fresh session.
    pub fn client(&self) -> BackendClient {
        BackendClient::new(self.session(), None).unwrap()
    }

    /// Number of HTTP requests served so far.
    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    /// Ingest bodies exactly as received.
    pub fn ingests(&self) -> Vec<Value> {
        self.state.lock().unwrap().ingests.clone()
    }

    pub fn seed_campaign(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("camp");
        state.campaigns.push(json!({
            "campaign_id": id,
            "name": name,
            "system": "COC7",
            "created_at": "2024-03-01T18:30:12.123456"
        }));
        id
    }

    pub fn seed_entity(&self, campaign_id: &str, entity_type: &str, name: &str, properties: Value) -> String {
        let mut state = self.state.lock().unwrap();
        state.upsert_entity(
            campaign_id,
            &json!({"type": entity_type, "name": name, "properties": properties}),
        );
        state.resolve(campaign_id, name).unwrap()
    }

    pub fn seed_relationship(&self, campaign_id: &str, from: &str, to: &str, rel_type: &str, properties: Value) {
        self.state
            .lock()
            .unwrap()
            .add_relationship(campaign_id, from, to, rel_type, properties);
    }

    /// Delay the full-record response for one entity.
    pub fn delay_entity(&self, entity_id: &str, millis: u64) {
        self.state
            .lock()
            .unwrap()
            .entity_delays
            .insert(entity_id.to_string(), millis);
    }

    /// Delay every subgraph response for one campaign.
    pub fn delay_subgraph(&self, campaign_id: &str, millis: u64) {
        self.state
            .lock()
            .unwrap()
            .subgraph_delays
            .insert(campaign_id.to_string(), millis);
    }
}

/// Session pointed at `url`, tools enabled, no active campaign.
pub fn session_for(url: &str) -> Arc<Session> {
    Arc::new(Session::new(&Settings {
        backend_url: url.to_string(),
        tools_enabled: true,
    }))
}

async fn create_campaign(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = hit(&state);
    let id = state.next_id("camp");
    let campaign = json!({
        "campaign_id": id,
        "name": body["name"],
        "system": body["system"],
        "description": body.get("description").cloned().unwrap_or(Value::Null),
        "created_at": "2024-03-01T18:30:12.123456"
    });
    state.campaigns.push(campaign.clone());
    Json(campaign).into_response()
}

async fn list_campaigns(State(state): State<Shared>) -> Response {
    let state = hit(&state);
    Json(Value::Array(state.campaigns.clone())).into_response()
}

async fn delete_campaign(State(state): State<Shared>, Path(campaign_id): Path<String>) -> Response {
    let mut state = hit(&state);
    if !state.has_campaign(&campaign_id) {
        return not_found();
    }
    state.campaigns.retain(|c| c["campaign_id"] != campaign_id.as_str());
    state.entities.remove(&campaign_id);
    state.relationships.remove(&campaign_id);
    Json(json!({"status": "deleted"})).into_response()
}

async fn ingest(
    State(state): State<Shared>,
    Path(campaign_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = hit(&state);
    if !state.has_campaign(&campaign_id) {
        return not_found();
    }
    state.ingests.push(body.clone());

    let entities = body["entities"].as_array().cloned().unwrap_or_default();
    for entity in &entities {
        state.upsert_entity(&campaign_id, entity);
    }
    let relationships = body["relationships"].as_array().cloned().unwrap_or_default();
    for rel in &relationships {
        let from = rel["from_entity_name"].as_str().unwrap_or_default();
        let to = rel["to_entity_name"].as_str().unwrap_or_default();
        let rel_type = rel["type"].as_str().unwrap_or_default();
        let properties = rel.get("properties").cloned().unwrap_or_else(|| json!({}));
        state.add_relationship(&campaign_id, from, to, rel_type, properties.clone());
        if rel["bidirectional"].as_bool().unwrap_or(false) {
            let reverse = rel["reverse_type"].as_str().unwrap_or(rel_type);
            state.add_relationship(&campaign_id, to, from, reverse, properties);
        }
    }

    Json(json!({
        "entities_count": entities.len(),
        "relationships_count": relationships.len()
    }))
    .into_response()
}

async fn list_entities(
    State(state): State<Shared>,
    Path(campaign_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = hit(&state);
    let records: Vec<Value> = state
        .entities
        .get(&campaign_id)
        .map(|list| {
            list.iter()
                .filter(|e| params.get("name").map_or(true, |n| &e.name == n))
                .filter(|e| params.get("type").map_or(true, |t| &e.entity_type == t))
                .map(MockEntity::record)
                .collect()
        })
        .unwrap_or_default();
    Json(Value::Array(records)).into_response()
}

async fn get_entity(
    State(state): State<Shared>,
    Path((campaign_id, entity_id)): Path<(String, String)>,
) -> Response {
    let (delay, record) = {
        let state = hit(&state);
        let record = state
            .entities
            .get(&campaign_id)
            .and_then(|list| list.iter().find(|e| e.entity_id == entity_id))
            .map(MockEntity::record);
        (state.entity_delays.get(&entity_id).copied(), record)
    };
    if let Some(millis) = delay {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
    match record {
        Some(record) => Json(record).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Entity not found"}))).into_response(),
    }
}

async fn list_relationships(
    State(state): State<Shared>,
    Path(campaign_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = hit(&state);
    let rels: Vec<Value> = state
        .relationships
        .get(&campaign_id)
        .map(|list| {
            list.iter()
                .filter(|r| params.get("from_entity_id").map_or(true, |v| r["from_id"] == v.as_str()))
                .filter(|r| params.get("to_entity_id").map_or(true, |v| r["to_id"] == v.as_str()))
                .filter(|r| params.get("type").map_or(true, |v| r["type"] == v.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(Value::Array(rels)).into_response()
}

async fn paths(
    State(state): State<Shared>,
    Path(campaign_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = hit(&state);
    if !state.has_campaign(&campaign_id) {
        return not_found();
    }
    Json(json!({"paths": [], "query": params})).into_response()
}

/// 200 with a `text/plain` body.
async fn plain_notes(State(state): State<Shared>) -> Response {
    hit(&state);
    (StatusCode::OK, "Arkady was last seen near the mill").into_response()
}

/// Skeleton subgraph: the seed, then every entity (so the seed repeats),
/// then every relationship with the first one repeated.
async fn subgraph(
    State(state): State<Shared>,
    Path(campaign_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (delay, body) = {
        let state = hit(&state);
        if !state.has_campaign(&campaign_id) {
            return not_found();
        }
        (
            state.subgraph_delays.get(&campaign_id).copied(),
            subgraph_body(&state, &campaign_id, &params),
        )
    };
    if let Some(millis) = delay {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
    Json(body).into_response()
}

fn subgraph_body(state: &MockState, campaign_id: &str, params: &HashMap<String, String>) -> Value {
    let entities = state.entities.get(campaign_id).cloned().unwrap_or_default();
    let seed = entities.iter().find(|e| {
        params.get("entity_id").map_or(false, |id| &e.entity_id == id)
            || params.get("name").map_or(false, |name| &e.name == name)
    });
    let Some(seed) = seed else {
        return json!({"nodes": [], "edges": []});
    };

    let mut nodes = vec![seed.skeleton()];
    nodes.extend(entities.iter().map(MockEntity::skeleton));
    let mut edges = state.relationships.get(campaign_id).cloned().unwrap_or_default();
    if let Some(first) = edges.first().cloned() {
        edges.push(first);
    }
    json!({"nodes": nodes, "edges": edges})
}
