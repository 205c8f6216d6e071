// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Bearer-token authentication and per-IP rate limiting (§6).
//!
//! Generalises `sven-gateway::http::auth`'s single shared operator token
//! into a trait: the core only knows a token resolves (or doesn't) to an
//! opaque user id, never how. [`tokens::TokenStore`] is the one concrete
//! implementation this crate ships.

pub mod tokens;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use tracing::warn;

pub use tokens::TokenStore;

/// Resolves a bearer token to the opaque user id it authenticates as.
/// Implementations never see more than the raw token string; how a token
/// maps to a user is entirely up to them (§3: "User — identity carried by
/// an opaque user id. Authored externally; the core only reads it.").
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<String>;
}

type IpLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// Shared auth state threaded through axum middleware. `S` is erased to
/// `Arc<dyn Authenticator>` so swapping `TokenStore` for an external
/// identity provider never touches the route or middleware wiring.
#[derive(Clone)]
pub struct AuthState {
    authenticator: Arc<dyn Authenticator>,
    limiter: Arc<IpLimiter>,
}

impl AuthState {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self::with_quota(authenticator, 5, 2)
    }

    /// `max_per_minute`: failed attempts allowed per IP before a lockout;
    /// `burst`: how many of those can land back to back.
    pub fn with_quota(authenticator: Arc<dyn Authenticator>, max_per_minute: u32, burst: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(max_per_minute).expect("max_per_minute must be > 0"))
            .allow_burst(NonZeroU32::new(burst).expect("burst must be > 0"));
        Self { authenticator, limiter: Arc::new(RateLimiter::keyed(quota)) }
    }
}

/// Resolves the authenticated user id for the current request, set by
/// [`bearer_auth_mw`] and read by handlers via `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// Axum middleware: verifies the bearer token and inserts an
/// [`AuthenticatedUser`] extension for downstream handlers. Rejects with
/// `401` on missing/invalid token, `429` once a per-IP lockout trips.
pub async fn bearer_auth_mw(
    State(auth): State<AuthState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut req: Request,
    next: Next,
) -> Response {
    let ip = addr.ip();
    let Some(token) = extract_bearer(req.headers()) else {
        return reject(&auth, ip);
    };

    match auth.authenticator.authenticate(token).await {
        Some(user_id) => {
            req.extensions_mut().insert(AuthenticatedUser(user_id));
            next.run(req).await
        }
        None => reject(&auth, ip),
    }
}

fn reject(auth: &AuthState, ip: IpAddr) -> Response {
    if !is_loopback(ip) && auth.limiter.check_key(&ip).is_err() {
        warn!(%ip, "rate limit exceeded after repeated auth failures");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(axum::http::header::RETRY_AFTER, "60")],
            "Too Many Requests",
        )
            .into_response();
    }
    warn!(%ip, "authentication failed");
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4 == Ipv4Addr::LOCALHOST,
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

/// The `?token=…` query-string variant used by [`crate::ws`], since
/// browsers can't set an `Authorization` header on a WebSocket upgrade.
pub async fn authenticate_query_token(auth: &AuthState, token: &str) -> Option<String> {
    auth.authenticator.authenticate(token).await
}
