use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{KekError, Result};
use crate::graph::OwnershipGraph;
use crate::kek::{check_squuid, Collection, ObjectStore};
use crate::network::style::layout_options;
use crate::network::{Delta, NetworkSessions};
use crate::view::{filter_rows, paginate, Column, ObjectView, Order, RelationTree, RelationType};

/// Upper bound for `per_page` in table requests.
const MAX_PER_PAGE: usize = 1000;
/// Upper bound for relation list depth.
const MAX_RELATION_LEVEL: usize = 10;

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .is_ok()
}

/// HTTP backend of the browser viewer
pub struct ViewerServer {
    state: AppState,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    graph: Arc<OwnershipGraph>,
    objects: Arc<ObjectStore>,
    sessions: Arc<NetworkSessions>,
    config: Arc<Config>,
}

impl ViewerServer {
    /// Serve `graph` and the entity files below `config.archive.data_dir`.
    pub fn new(config: Config, graph: OwnershipGraph) -> Self {
        let objects = ObjectStore::new(config.data_dir(), config.viewer.object_cache);
        let sessions = NetworkSessions::new(config.network.session_capacity);
        Self {
            state: AppState {
                graph: Arc::new(graph),
                objects: Arc::new(objects),
                sessions: Arc::new(sessions),
                config: Arc::new(config),
            },
        }
    }

    /// Run the HTTP server on `http_server.port`
    pub async fn run(&self) -> Result<()> {
        let port = self.state.config.http_server.port;
        let app = self.router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting viewer on http://{}", addr);
        log::info!("{} nodes, {} edges", self.state.graph.len(), self.state.graph.edges().len());

        if !check_port_available(port).await {
            return Err(KekError::Config(format!(
                "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            KekError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            KekError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        let allowed_origins = &self.state.config.http_server.allowed_origins;

        // No configured origins means a local setup; allow any.
        let cors = if allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let router = Router::new()
            .route("/health", get(handle_health))
            .route("/data/graph.dot", get(handle_graph_dot))
            .route("/data/:collection/:file", get(handle_entity_json))
            .route("/api/nodes", get(handle_nodes))
            .route("/api/objects/:squuid", get(handle_object))
            .route("/api/objects/:squuid/relations/:relation_type", get(handle_relations))
            .route("/api/network", post(handle_create_session))
            .route(
                "/api/network/:session",
                get(handle_get_session).delete(handle_delete_session),
            )
            .route("/api/network/:session/select/:squuid", post(handle_select))
            .route("/api/network/:session/subgraph/:squuid", post(handle_subgraph));

        let router = match &self.state.config.http_server.static_dir {
            Some(dir) => {
                log::info!("Serving viewer files from {}", dir.display());
                router.fallback_service(ServeDir::new(dir))
            }
            None => router.fallback(handle_not_found),
        };

        router
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

/// Error response with a status derived from the error kind
struct ApiError(KekError);

impl From<KekError> for ApiError {
    fn from(err: KekError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            KekError::NotFound(_) => StatusCode::NOT_FOUND,
            KekError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            other => {
                log::error!("Request failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run file reads and JSON parsing off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        KekError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("worker task failed: {}", e),
        ))
    })?
}

async fn serve_file(path: &std::path::Path, name: &str, content_type: &'static str) -> ApiResult<Response> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(KekError::NotFound(name.to_string()).into()),
        Err(e) => Err(KekError::from(e).into()),
    }
}

fn unknown_session(session: &str) -> KekError {
    KekError::NotFound(format!("network session {}", session))
}

async fn handle_health(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "kekgraph",
            "version": env!("CARGO_PKG_VERSION"),
            "nodes": state.graph.len(),
            "sessions": state.sessions.len(),
        })),
    )
        .into_response()
}

async fn handle_not_found() -> Response {
    ApiError(KekError::NotFound("no such route".to_string())).into_response()
}

async fn handle_graph_dot(State(state): State<AppState>) -> ApiResult<Response> {
    serve_file(&state.config.graph_path(), "graph.dot", "text/vnd.graphviz; charset=utf-8").await
}

/// `/data/{media|shareholders}/{squuid}.json`, as mirrored from the API
async fn handle_entity_json(
    State(state): State<AppState>,
    Path((collection, file)): Path<(String, String)>,
) -> ApiResult<Response> {
    let collection = Collection::parse(&collection)
        .ok_or_else(|| KekError::NotFound(format!("collection {}", collection)))?;
    let squuid = file
        .strip_suffix(".json")
        .ok_or_else(|| KekError::NotFound(file.clone()))?;
    let path = state.objects.entity_path(collection, squuid)?;
    serve_file(&path, &collection.entity_file(squuid), "application/json").await
}

#[derive(Debug, Deserialize)]
struct NodesQuery {
    #[serde(default)]
    q: String,
    /// `column`, `-column` or empty for unsorted; the configured default
    /// when absent.
    order: Option<String>,
    #[serde(default)]
    page: usize,
    per_page: Option<usize>,
}

async fn handle_nodes(State(state): State<AppState>, Query(query): Query<NodesQuery>) -> ApiResult<Response> {
    let order_str = query
        .order
        .as_deref()
        .unwrap_or(&state.config.viewer.default_order);
    let order = Order::parse(order_str)?;
    let per_page = query
        .per_page
        .unwrap_or(state.config.viewer.per_page)
        .clamp(1, MAX_PER_PAGE);

    let rows = filter_rows(&state.graph, &query.q);
    let page = paginate(rows, order, query.page, per_page);

    let columns: Vec<_> = Column::ALL
        .iter()
        .map(|c| json!({"key": c.key(), "title": c.title(), "numeric": c.is_numeric()}))
        .collect();

    Ok(Json(json!({
        "rows": page.rows,
        "page": page.page,
        "num_pages": page.num_pages,
        "total": page.total,
        "per_page": per_page,
        "order": order.map(|o| o.to_string()),
        "columns": columns,
    }))
    .into_response())
}

async fn handle_object(State(state): State<AppState>, Path(squuid): Path<String>) -> ApiResult<Json<ObjectView>> {
    let objects = Arc::clone(&state.objects);
    let view = blocking(move || {
        let object = objects
            .get(&squuid)?
            .ok_or_else(|| KekError::NotFound(format!("entity {}", squuid)))?;
        Ok(ObjectView::from(&*object))
    })
    .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct RelationsQuery {
    level: Option<usize>,
}

/// Relation tree of one type; `null` when the entity has none.
async fn handle_relations(
    State(state): State<AppState>,
    Path((squuid, relation_type)): Path<(String, String)>,
    Query(query): Query<RelationsQuery>,
) -> ApiResult<Json<Option<RelationTree>>> {
    let relation_type = RelationType::parse(&relation_type)?;
    let level = query
        .level
        .unwrap_or(state.config.viewer.relation_level)
        .clamp(1, MAX_RELATION_LEVEL);

    let objects = Arc::clone(&state.objects);
    let tree = blocking(move || {
        let object = objects
            .get(&squuid)?
            .ok_or_else(|| KekError::NotFound(format!("entity {}", squuid)))?;
        RelationTree::build(&*objects, &object, relation_type, level)
    })
    .await?;
    Ok(Json(tree))
}

async fn handle_create_session(State(state): State<AppState>) -> Response {
    let session = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(json!({
            "session": session,
            "options": layout_options(),
        })),
    )
        .into_response()
}

/// Everything currently in a session's network, for redrawing from scratch
async fn handle_get_session(State(state): State<AppState>, Path(session): Path<String>) -> ApiResult<Response> {
    let body = state
        .sessions
        .with(&session, |net| serde_json::to_value(&*net))
        .ok_or_else(|| unknown_session(&session))?
        .map_err(KekError::from)?;
    Ok(Json(body).into_response())
}

async fn handle_delete_session(State(state): State<AppState>, Path(session): Path<String>) -> ApiResult<StatusCode> {
    if state.sessions.remove(&session) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_session(&session).into())
    }
}

async fn handle_select(
    State(state): State<AppState>,
    Path((session, squuid)): Path<(String, String)>,
) -> ApiResult<Json<Delta>> {
    check_squuid(&squuid)?;
    let graph = &state.graph;
    let delta = state
        .sessions
        .with(&session, |net| net.select(graph, &squuid))
        .ok_or_else(|| unknown_session(&session))??;
    Ok(Json(delta))
}

#[derive(Debug, Deserialize)]
struct SubgraphQuery {
    /// Clear the network before adding the subgraph.
    #[serde(default)]
    replace: bool,
}

async fn handle_subgraph(
    State(state): State<AppState>,
    Path((session, squuid)): Path<(String, String)>,
    Query(query): Query<SubgraphQuery>,
) -> ApiResult<Json<Delta>> {
    check_squuid(&squuid)?;
    let graph = &state.graph;
    let delta = state
        .sessions
        .with(&session, |net| {
            if query.replace {
                net.clear();
            }
            net.show_subgraph(graph, &squuid)
        })
        .ok_or_else(|| unknown_session(&session))??;
    Ok(Json(delta))
}
