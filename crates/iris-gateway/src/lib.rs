// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP, webhook and duplex-socket edge for the iris platform (§6).
//!
//! Thin transport shell over the four core subsystems (`iris-lifecycle`,
//! `iris-store`, `iris-broadcast`, `iris-tools`): this crate owns no
//! business logic of its own beyond request validation, auth, and wiring a
//! turn's side effects to the wire.

pub mod auth;
mod error;
pub mod routes;
mod security;
mod turn;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

pub use auth::{AuthState, Authenticator, TokenStore};
pub use error::ApiError;

/// Request bodies larger than this are rejected before touching a handler.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state handed to every route via axum's `State` extractor. Cheap
/// to clone — every field is itself a handle (`Store` wraps a `PgPool`,
/// the rest are `Arc`s).
#[derive(Clone)]
pub struct AppState {
    pub store: iris_store::Store,
    pub lifecycle: Arc<iris_lifecycle::LifecycleManager>,
    pub broadcaster: Arc<iris_broadcast::Broadcaster>,
    pub auth: auth::AuthState,
}

/// Assembles the full router: agent/session management behind bearer auth,
/// webhooks and the duplex socket on their own auth paths, and the
/// loopback-only internal route — all behind the shared security headers
/// and CSRF guard.
pub fn router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/agents/create", post(routes::agents::create))
        .route("/agents/list", get(routes::agents::list))
        .route("/agents/:id", get(routes::agents::get).delete(routes::agents::delete))
        .route("/agents/:id/chat", post(routes::agents::chat))
        .route("/chat/sessions", post(routes::sessions::create).get(routes::sessions::list))
        .route("/chat/sessions/:id", get(routes::sessions::get).put(routes::sessions::update))
        .route(
            "/chat/sessions/:id/messages",
            get(routes::sessions::list_messages).post(routes::sessions::post_message),
        )
        .layer(middleware::from_fn_with_state(state.auth.clone(), auth::bearer_auth_mw));

    let unauthenticated = Router::new()
        .route("/telegram/webhook", post(routes::webhooks::telegram_webhook))
        .route("/discord/receive_message", post(routes::webhooks::discord_receive_message))
        .route("/internal/broadcast", post(routes::internal::broadcast))
        .route("/ws/chat/:session_id", get(ws::chat_socket));

    Router::new()
        .merge(authenticated)
        .merge(unauthenticated)
        .layer(middleware::from_fn(security::csrf_guard))
        .layer(middleware::from_fn(security::security_headers))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Binds and serves `router(state)` until the process receives a shutdown
/// signal. Plain `axum::serve` over a `TcpListener` — this edge sits
/// behind a load balancer/reverse proxy that terminates TLS.
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "iris-gateway listening");

    axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received, draining connections");
}
