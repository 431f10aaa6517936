//! HTTP route binder
//!
//! Uses axum to expose one `GET`/`POST` route per registered command, plus
//! an index route listing them.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinError;
use tracing::{debug, error, info};

use clirest_core::{execute, CommandDescriptor, ParamSource, RawParams, Registry, Reply, Status};

use crate::config::Config;

/// Build the router for every command in the registry.
///
/// `prefix` must already be normalized (see [`crate::config::normalize_prefix`]).
pub fn build_router(registry: &Arc<Registry>, prefix: &str) -> Router {
    let mut app = Router::new();

    for command in registry.commands() {
        let path = format!("{}/{}", prefix, command.name());
        info!(route = %path, "registering command route");

        let get_command = Arc::clone(command);
        let post_command = Arc::clone(command);
        app = app.route(
            &path,
            get(move |Query(pairs): Query<Vec<(String, String)>>| {
                handle_query(Arc::clone(&get_command), pairs)
            })
            .post(move |body: Bytes| handle_body(Arc::clone(&post_command), body)),
        );
    }

    let index_path = if prefix.is_empty() { "/".to_string() } else { prefix.to_string() };
    let index_registry = Arc::clone(registry);
    app.route(&index_path, get(move || index(Arc::clone(&index_registry))))
}

/// Start the HTTP server and serve until Ctrl-C
pub async fn serve(config: &Config, registry: Arc<Registry>) -> Result<()> {
    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen))?;

    let app = build_router(&registry, &config.api_prefix);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(addr = %addr, commands = registry.len(), "starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Query pairs become string values; the first occurrence of a name wins
fn query_params(pairs: Vec<(String, String)>) -> RawParams {
    let mut raw = RawParams::new();
    for (key, value) in pairs {
        raw.entry(key).or_insert(Value::String(value));
    }
    raw
}

/// A JSON object body becomes the raw map; anything else counts as empty
fn body_params(body: &[u8]) -> RawParams {
    if body.is_empty() {
        return RawParams::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!(kind = json_kind(&other), "ignoring non-object request body");
            RawParams::new()
        }
        Err(e) => {
            debug!("ignoring unparsable request body: {}", e);
            RawParams::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

async fn handle_query(command: Arc<CommandDescriptor>, pairs: Vec<(String, String)>) -> Response {
    respond(command, query_params(pairs), ParamSource::Query).await
}

async fn handle_body(command: Arc<CommandDescriptor>, body: Bytes) -> Response {
    respond(command, body_params(&body), ParamSource::Body).await
}

/// Resolve and dispatch on the blocking pool; a panic in the command is
/// reported like any other failure.
async fn respond(command: Arc<CommandDescriptor>, raw: RawParams, source: ParamSource) -> Response {
    let name = command.name().to_string();
    debug!(command = %name, source = %source, params = raw.len(), "handling request");

    let reply = match tokio::task::spawn_blocking(move || execute(&command, &raw, source)).await {
        Ok(reply) => reply,
        Err(e) => {
            let message = panic_message(e);
            error!(command = %name, "command aborted: {}", message);
            Reply::exception(message)
        }
    };

    info!(command = %name, source = %source, status = reply.status.code(), "request handled");
    into_response(reply)
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "command panicked".to_string()
    }
}

fn status_code(status: Status) -> StatusCode {
    match status {
        Status::Ok => StatusCode::OK,
        Status::BadRequest => StatusCode::BAD_REQUEST,
        Status::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn into_response(reply: Reply) -> Response {
    (status_code(reply.status), Json(reply.body)).into_response()
}

async fn index(registry: Arc<Registry>) -> Json<Value> {
    let commands: Vec<Value> = registry.commands().iter().map(|c| c.describe()).collect();
    Json(json!({ "commands": commands }))
}
