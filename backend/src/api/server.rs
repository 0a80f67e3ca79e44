//! HTTP server for board tools.
//!
//! # API Endpoints
//!
//! | Method | Path                                   | Description                     |
//! |--------|----------------------------------------|---------------------------------|
//! | GET    | `/health`                              | Health check                    |
//! | GET    | `/api/tools`                           | Tool list and column types      |
//! | POST   | `/api/tools/{name}`                    | Call a tool with JSON arguments |
//! | GET    | `/api/resources/schema`                | Board schema with metadata      |
//! | GET    | `/api/resources/columns/{column_id}`   | One column                      |
//! | GET    | `/api/resources/column-types`          | Columns with validation rules   |
//! | GET    | `/api/resources/metadata`              | Board metadata                  |
//! | GET    | `/api/logs`                            | SSE stream of tool activity     |

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, ToolCallResponse, ToolListResponse};
use crate::error::ServerError;
use crate::tools::BoardTools;

#[derive(Clone)]
pub struct AppState {
    pub tools: Arc<BoardTools>,
}

/// Routes over `tools`, without binding a socket.
pub fn router(tools: Arc<BoardTools>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(call_tool))
        .route("/api/resources/schema", get(schema_resource))
        .route("/api/resources/columns/{column_id}", get(column_resource))
        .route("/api/resources/column-types", get(column_types_resource))
        .route("/api/resources/metadata", get(metadata_resource))
        .route("/api/logs", get(sse_logs))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { tools })
}

pub async fn start_server(port: u16, tools: Arc<BoardTools>) -> Result<(), ServerError> {
    let app = router(tools);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "boardsync server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "boardsync",
        "version": env!("CARGO_PKG_VERSION"),
        "schema": state.tools.schema().status(),
        "board_id": state.tools.schema().board_id(),
    }))
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.list_tools().to_vec(),
        supported_column_types: state.tools.schema().registry().supported_types(),
    })
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolCallResponse>, (StatusCode, Json<Value>)> {
    let args = parse_arguments(&body)
        .map_err(|message| (StatusCode::BAD_REQUEST, Json(error_response(&message))))?;

    log_info(format!("Tool call: {}", name));
    let result = state.tools.call(&name, &args).await;
    Ok(Json(ToolCallResponse::new(&name, result)))
}

/// Empty body means no arguments.
fn parse_arguments(body: &[u8]) -> Result<Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(args) if args.is_object() => Ok(args),
        Ok(_) => Err("Tool arguments must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid JSON body: {}", e)),
    }
}

async fn schema_resource(State(state): State<AppState>) -> Json<Value> {
    Json(state.tools.board_schema_resource().await)
}

async fn column_resource(State(state): State<AppState>, Path(column_id): Path<String>) -> Json<Value> {
    Json(state.tools.column_resource(&column_id).await)
}

async fn column_types_resource(State(state): State<AppState>) -> Json<Value> {
    Json(state.tools.column_types_resource().await)
}

async fn metadata_resource(State(state): State<AppState>) -> Json<Value> {
    Json(state.tools.metadata_resource().await)
}

/// SSE endpoint for real-time tool activity
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // lagged receivers skip the missed entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
