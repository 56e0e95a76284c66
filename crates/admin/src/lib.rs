//! Activity console admin library.
//!
//! The console lets university staff manage activities, attendance records,
//! students and other admins. Access is governed by a role, an explicit
//! permission list and a department scope on every admin.
//!
//! The crate is a library so the router can be built by the binary and by
//! tests alike.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::Span;

use state::AppState;

/// Assemble the console router with its session, maintenance and trace layers.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState, session_layer: SessionManagerLayer<PostgresStore>) -> Router {
    let uploads = ServeDir::new(state.config().upload_dir.clone());

    Router::new()
        .merge(routes::routes())
        .nest_service("/uploads", uploads)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::maintenance_gate,
        ))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
