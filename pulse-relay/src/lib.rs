//! Pulse Relay
//!
//! This server provides:
//! 1. A WebSocket endpoint that fans every valid pulse out to all open connections
//! 2. A small JSON health endpoint
//! 3. Static file serving for the web frontend

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use log::warn;
use serde_json::json;
use std::{io, net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

pub mod hub;
mod relay;

// ── CLI Arguments ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Clone)]
#[command(name = "pulse-relay", about = "Pulse broadcast relay")]
pub struct Args {
    /// Debug mode
    #[arg(long)]
    pub debug: bool,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port to try when `port` is already bound
    #[arg(long, env = "FALLBACK_PORT")]
    pub fallback_port: Option<u16>,

    /// Directory with the web frontend
    #[arg(long, env = "STATIC_DIR", default_value = "web")]
    pub static_dir: PathBuf,
}

// ── Application State ──────────────────────────────────────────────────────────

pub struct AppStateInner {
    /// CLI arguments
    pub args: Args,

    /// Broadcast set of open connections
    pub hub: hub::Hub,
}

pub struct AppState(Arc<AppStateInner>);

impl AppState {
    /// Must be called inside a tokio runtime; starts the hub task.
    pub fn new(args: Args) -> Self {
        Self(Arc::new(AppStateInner {
            args,
            hub: hub::Hub::spawn(),
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

// ── Macros ─────────────────────────────────────────────────────────────────────

#[macro_export]
macro_rules! json_err {
    ($($arg: tt)*) => {
        {
            use serde_json::json;
            use axum::{Json, response::IntoResponse};
            let msg = format!($($arg)*);
            Json(json!({"error": msg})).into_response()
        }
    };
}

// ── Routes ─────────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(relay::relay_ws))
        .route("/stats", get(stats))
        .fallback_service(ServeDir::new(&state.args.static_dir))
        .with_state(state)
        .layer(cors)
}

async fn stats(State(state): State<AppState>) -> (StatusCode, Response) {
    state
        .hub
        .connection_count()
        .await
        .map(|n| (StatusCode::OK, Json(json!({ "connections": n })).into_response()))
        .unwrap_or_else(|e| (StatusCode::INTERNAL_SERVER_ERROR, json_err!("{e}")))
}

/// Binds `0.0.0.0:port`, moving to the fallback port only if the primary
/// one is taken.
pub async fn bind(args: &Args) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            let Some(fallback) = args.fallback_port else {
                return Err(e).with_context(|| format!("port {} is in use", args.port));
            };
            warn!("Port {} is in use, trying {fallback}", args.port);
            let addr = SocketAddr::from(([0, 0, 0, 0], fallback));
            TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind fallback port {fallback}"))
        }
        Err(e) => Err(e).with_context(|| format!("failed to bind {addr}")),
    }
}
