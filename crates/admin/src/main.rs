//! Activity console server.
//!
//! Serves the console JSON API, the public check-in endpoint, uploaded
//! avatars and the live event feed. Schema migrations are not run here; use
//! `console-cli migrate` before starting a new release.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use activity_console_admin::config::{AdminConfig, TlsConfig};
use activity_console_admin::db;
use activity_console_admin::middleware::create_session_layer;
use activity_console_admin::state::AppState;

/// Time in-flight requests (and open event streams) get after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

const DEFAULT_LOG_FILTER: &str = "activity_console_admin=info,tower_http=info,sqlx=warn";

fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.sentry_environment.clone().map(Into::into),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            // Admin emails and student ids stay out of Sentry.
            send_default_pii: false,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Warnings become Sentry events, info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// JSON lines on Fly.io, human-readable text elsewhere.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let on_fly = std::env::var_os("FLY_APP_NAME").is_some();
    let json_layer = on_fly.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!on_fly).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Log the pieces of configuration an operator most often gets wrong.
async fn report_startup(state: &AppState) {
    let config = state.config();

    if state.email().is_none() {
        tracing::warn!("SMTP is not configured; sign-in codes and invite links will only be logged");
    }

    let avatar_dir = config.upload_dir.join("avatars");
    if let Err(e) = tokio::fs::create_dir_all(&avatar_dir).await {
        tracing::warn!(dir = %avatar_dir.display(), error = %e, "avatar upload directory is not writable");
    }

    match state.system_settings().await {
        Ok(settings) if settings.maintenance.enabled => {
            tracing::warn!(
                bypass = settings.maintenance.allow_admin_bypass,
                "starting in maintenance mode"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not load system settings at startup"),
    }
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("rustls crypto provider already installed");

    let config = AdminConfig::from_env().expect("invalid console configuration");

    // The tracing layer needs the Sentry client, so Sentry goes first.
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("cannot connect to the console database");
    let session_layer = create_session_layer(&pool, &config).expect("cannot build session layer");
    let state = AppState::new(config.clone(), pool).expect("cannot build SMTP transport");

    report_startup(&state).await;

    let app = activity_console_admin::app(state, session_layer)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    match &config.tls {
        Some(tls) => serve_tls(app, addr, tls).await,
        None => serve_plain(app, addr).await,
    }
}

async fn serve_tls(app: Router, addr: SocketAddr, tls: &TlsConfig) {
    let rustls_config = RustlsConfig::from_pem(
        tls.cert_pem.as_bytes().to_vec(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await
    .expect("invalid TLS certificate or key");

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::info!(%addr, "console listening (https)");
    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("server error");
}

async fn serve_plain(app: Router, addr: SocketAddr) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("cannot bind console address");

    tracing::info!(%addr, "console listening (http)");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("cannot listen for Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("cannot listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
