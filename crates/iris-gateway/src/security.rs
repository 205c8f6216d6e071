// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Security headers and CSRF protection middleware, ported from
//! `sven-gateway::http::security` unchanged — both crates front a JSON API
//! a browser script could otherwise be tricked into calling cross-origin.
//!
//! WebSocket upgrade requests are exempt from the CSRF guard (browsers
//! enforce same-origin for WS already).

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

static HSTS: HeaderValue = HeaderValue::from_static("max-age=31536000; includeSubDomains");
static NO_SNIFF: HeaderValue = HeaderValue::from_static("nosniff");
static DENY_FRAME: HeaderValue = HeaderValue::from_static("DENY");
static NO_REFERRER: HeaderValue = HeaderValue::from_static("no-referrer");
static PERMISSIONS: HeaderValue = HeaderValue::from_static("camera=(), microphone=(), geolocation=()");
static CSP: HeaderValue = HeaderValue::from_static(
    "default-src 'self'; \
     script-src 'self'; \
     style-src 'self' 'unsafe-inline'; \
     img-src 'self' data:; \
     connect-src 'self' wss: ws:; \
     frame-ancestors 'none'; \
     base-uri 'none'; \
     object-src 'none'",
);

pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let h = resp.headers_mut();
    h.insert(axum::http::header::STRICT_TRANSPORT_SECURITY, HSTS.clone());
    h.insert(axum::http::header::X_CONTENT_TYPE_OPTIONS, NO_SNIFF.clone());
    h.insert(axum::http::header::X_FRAME_OPTIONS, DENY_FRAME.clone());
    h.insert(axum::http::header::REFERRER_POLICY, NO_REFERRER.clone());
    h.insert("permissions-policy", PERMISSIONS.clone());
    h.insert(axum::http::header::CONTENT_SECURITY_POLICY, CSP.clone());
    resp
}

/// Reject cross-origin mutating requests. Only POST/PUT/PATCH/DELETE are
/// checked; GET/HEAD/OPTIONS and WebSocket upgrades pass through.
pub async fn csrf_guard(req: Request, next: Next) -> Response {
    let is_ws_upgrade = req
        .headers()
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_ws_upgrade && is_mutating_method(req.method()) {
        if let Some(reason) = should_reject_cross_origin(req.headers()) {
            return (StatusCode::FORBIDDEN, reason).into_response();
        }
    }

    next.run(req).await
}

fn is_mutating_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn should_reject_cross_origin(headers: &axum::http::HeaderMap) -> Option<&'static str> {
    if let Some(sfs) = headers.get("sec-fetch-site").and_then(|v| v.to_str().ok()) {
        if sfs.eq_ignore_ascii_case("cross-site") {
            return Some("Forbidden: cross-site request");
        }
        return None;
    }

    if let Some(origin) = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()) {
        if !is_same_origin(origin) {
            return Some("Forbidden: cross-origin request");
        }
        return None;
    }

    if let Some(referer) = headers.get(axum::http::header::REFERER).and_then(|v| v.to_str().ok()) {
        if !is_same_origin(referer) {
            return Some("Forbidden: cross-origin referer");
        }
    }

    // Non-browser clients (curl, reqwest, native apps) send neither header —
    // they can't be a browser-driven CSRF vector.
    None
}

/// Loopback addresses are always accepted (operator tooling, local dev);
/// anything else is compared by the caller against the gateway's own
/// configured origin via `Host`/`Origin` equality, which axum's `Host`
/// extractor already normalises elsewhere — this check only needs to rule
/// out the common drive-by case of a browser tab on another site.
fn is_same_origin(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.") || url.contains("[::1]")
}
