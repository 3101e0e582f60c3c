use crate::config::HttpServerConfig;
use crate::error::{Result, TarvenError};
use crate::mcp::server::{McpServer, PROTOCOL_VERSION};
use crate::mcp::types::*;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{stream, Stream};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

type SessionMap = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<JsonRpcResponse>>>>;

/// MCP over HTTP: JSON-RPC on `POST /mcp`, responses streamed over `GET /sse`
pub struct HttpMcpServer {
    server: Arc<McpServer>,
    api_key: String,
    allowed_origins: Vec<String>,
    authless: bool,
}

impl HttpMcpServer {
    /// Create the HTTP transport. Outside authless mode the API key must be
    /// present in the environment variable named by `api_key_env`.
    pub fn new(server: Arc<McpServer>, config: &HttpServerConfig) -> Result<Self> {
        let api_key = if config.authless {
            String::new()
        } else {
            std::env::var(&config.api_key_env).map_err(|_| {
                TarvenError::Config(format!(
                    "Environment variable {} not set. Set it in your .env file or enable authless mode.",
                    config.api_key_env
                ))
            })?
        };

        Ok(Self {
            server,
            api_key,
            allowed_origins: config.allowed_origins.clone(),
            authless: config.authless,
        })
    }

    pub async fn run(&self, port: u16) -> Result<()> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            TarvenError::Config(format!(
                "Failed to bind {}: {}. Set http_server.port in config.toml to use another port.",
                addr, e
            ))
        })?;
        log::info!("HTTP MCP server listening on http://{}", addr);
        log::info!("MCP endpoint: http://{}/mcp", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub fn router(&self) -> Router {
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let state = AppState {
            server: Arc::clone(&self.server),
            api_key: self.api_key.clone(),
            allowed_origins: self.allowed_origins.clone(),
            authless: self.authless,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        };

        Router::new()
            .route("/sse", get(handle_sse))
            .route("/mcp", post(handle_post))
            .route("/.well-known/mcp-server", get(handle_discovery))
            .route("/.well-known/mcp.json", get(handle_discovery))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(state)
    }
}

#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
    api_key: String,
    allowed_origins: Vec<String>,
    authless: bool,
    sessions: SessionMap,
}

impl AppState {
    fn check_request(&self, headers: &HeaderMap) -> std::result::Result<(), Response> {
        if self.authless {
            return Ok(());
        }
        validate_auth(headers, &self.api_key)?;
        validate_origin(headers, &self.allowed_origins)
    }
}

/// JSON-RPC over POST. With a live `session_id` the response goes out on
/// that SSE stream and the POST gets 202; otherwise it is the POST body.
async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: axum::body::Bytes,
) -> Response {
    if let Err(response) = state.check_request(&headers) {
        return response;
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("Invalid JSON: {}", e)})),
            )
                .into_response();
        }
    };

    // No per-connection handshake state over HTTP.
    let mut initialized = false;
    let method = request.method.clone();
    let response = match state.server.process_mcp_request(request, &mut initialized).await {
        Ok(Some(response)) => response,
        Ok(None) if method == "notifications/initialized" => {
            return StatusCode::ACCEPTED.into_response()
        }
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            log::error!("Error processing MCP request: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error", "details": e.to_string()})),
            )
                .into_response();
        }
    };

    let Some(session_id) = params.get("session_id") else {
        return (StatusCode::OK, Json(response)).into_response();
    };
    let mut sessions = state.sessions.lock().unwrap_or_else(|e| e.into_inner());
    match sessions.get(session_id) {
        Some(tx) => match tx.send(response) {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(mpsc::error::SendError(response)) => {
                log::debug!("SSE session {} closed; replying inline", session_id);
                sessions.remove(session_id);
                (StatusCode::OK, Json(response)).into_response()
            }
        },
        None => (StatusCode::OK, Json(response)).into_response(),
    }
}

/// SSE stream: an `endpoint` event naming the POST URL for this session,
/// then `message` events carrying JSON-RPC responses.
async fn handle_sse(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, Response> {
    state.check_request(&headers)?;

    let session_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    state
        .sessions
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(session_id.clone(), tx);
    log::debug!("SSE session {} opened", session_id);

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/mcp?session_id={}", session_id));
    let responses = UnboundedReceiverStream::new(rx).map(|response| {
        let data = serde_json::to_string(&response).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().event("message").data(data))
    });
    let events = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(responses);

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

async fn handle_discovery(State(state): State<AppState>) -> Response {
    let mut discovery = json!({
        "name": "tarvenote",
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {"tools": {}},
        "serverInfo": {
            "name": "tarvenote",
            "version": env!("CARGO_PKG_VERSION")
        },
        "transport": {"type": "sse", "endpoint": "/sse"}
    });
    if state.authless {
        discovery["authentication"] = json!({"type": "none"});
    }
    (StatusCode::OK, Json(discovery)).into_response()
}

async fn handle_health(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "tarvenote",
            "version": env!("CARGO_PKG_VERSION"),
            "tools": state.server.registry().len()
        })),
    )
        .into_response()
}

fn unauthorized(error: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": error,
            "message": "Use 'Authorization: Bearer <api-key>' header"
        })),
    )
        .into_response()
}

fn validate_auth(headers: &HeaderMap, expected_key: &str) -> std::result::Result<(), Response> {
    let header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;
    let provided = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid Authorization header format"))?;
    if provided != expected_key {
        return Err(unauthorized("Invalid API key"));
    }
    Ok(())
}

/// Reject browser origins outside the allow-list. Requests without an
/// Origin header, or with no list configured, pass.
fn validate_origin(headers: &HeaderMap, allowed_origins: &[String]) -> std::result::Result<(), Response> {
    if allowed_origins.is_empty() {
        return Ok(());
    }
    let Some(origin) = headers.get("origin").and_then(|h| h.to_str().ok()) else {
        return Ok(());
    };
    if allowed_origins
        .iter()
        .any(|allowed| origin == allowed || origin.starts_with(&format!("{}://", allowed)))
    {
        return Ok(());
    }
    Err((
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Origin not allowed",
            "message": format!("Origin '{}' is not in the allowed origins list", origin)
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::OperationRegistry;
    use crate::testing::MockBackend;
    use crate::tools::Dispatcher;

    struct Running {
        url: String,
        http: reqwest::Client,
    }

    async fn start(authless: bool, allowed_origins: Vec<String>, backend: &MockBackend) -> Running {
        let registry = Arc::new(OperationRegistry::new());
        Arc::new(Dispatcher::new(Arc::new(backend.client()))).apply_configuration(Some(registry.as_ref()));
        let server = HttpMcpServer {
            server: Arc::new(McpServer::new(registry)),
            api_key: "secret".to_string(),
            allowed_origins,
            authless,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = server.router();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Running {
            url: format!("http://{}", addr),
            http: reqwest::Client::new(),
        }
    }

    fn list_request() -> serde_json::Value {
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})
    }

    #[tokio::test]
    async fn test_health_and_discovery() {
        let backend = MockBackend::start().await;
        let running = start(true, Vec::new(), &backend).await;

        let health: serde_json::Value = running
            .http
            .get(format!("{}/health", running.url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["tools"], 4);

        let discovery: serde_json::Value = running
            .http
            .get(format!("{}/.well-known/mcp.json", running.url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(discovery["transport"]["endpoint"], "/sse");
        assert_eq!(discovery["authentication"]["type"], "none");
    }

    #[tokio::test]
    async fn test_post_requires_bearer_key() {
        let backend = MockBackend::start().await;
        let running = start(false, Vec::new(), &backend).await;
        let url = format!("{}/mcp", running.url);

        let missing = running.http.post(&url).json(&list_request()).send().await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::UNAUTHORIZED);

        let wrong = running
            .http
            .post(&url)
            .bearer_auth("nope")
            .json(&list_request())
            .send()
            .await
            .unwrap();
        assert_eq!(wrong.status(), reqwest::StatusCode::UNAUTHORIZED);

        let ok = running
            .http
            .post(&url)
            .bearer_auth("secret")
            .json(&list_request())
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = ok.json().await.unwrap();
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_origin_allow_list() {
        let backend = MockBackend::start().await;
        let running = start(false, vec!["http://localhost:3000".to_string()], &backend).await;
        let url = format!("{}/mcp", running.url);

        let blocked = running
            .http
            .post(&url)
            .bearer_auth("secret")
            .header("origin", "http://evil.example")
            .json(&list_request())
            .send()
            .await
            .unwrap();
        assert_eq!(blocked.status(), reqwest::StatusCode::FORBIDDEN);

        let allowed = running
            .http
            .post(&url)
            .bearer_auth("secret")
            .header("origin", "http://localhost:3000")
            .json(&list_request())
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_notification_and_bad_json() {
        let backend = MockBackend::start().await;
        let running = start(true, Vec::new(), &backend).await;
        let url = format!("{}/mcp", running.url);

        let accepted = running
            .http
            .post(&url)
            .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .send()
            .await
            .unwrap();
        assert_eq!(accepted.status(), reqwest::StatusCode::ACCEPTED);

        let bad = running
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
