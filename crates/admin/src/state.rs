//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::{SettingsError, settings};
use crate::models::SystemSettings;
use crate::services::{EmailError, EmailService, EventHub};

/// How long a loaded settings document is reused.
const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    email: Option<EmailService>,
    events: EventHub,
    settings_cache: Cache<(), SystemSettings>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Without SMTP configuration, emails are logged instead of sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, EmailError> {
        let email = match &config.email {
            Some(email_config) => Some(EmailService::new(email_config)?),
            None => {
                tracing::warn!("SMTP not configured; invite links and sign-in codes will be logged");
                None
            }
        };

        let settings_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(SETTINGS_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                events: EventHub::default(),
                settings_cache,
            }),
        })
    }

    /// Get a reference to the console configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Get the live event hub.
    #[must_use]
    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    /// Current system settings, served from a short-lived cache.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings row cannot be read.
    pub async fn system_settings(&self) -> Result<SystemSettings, SettingsError> {
        if let Some(cached) = self.inner.settings_cache.get(&()).await {
            return Ok(cached);
        }
        let loaded = settings::get_system_settings(self.pool()).await?;
        self.inner.settings_cache.insert((), loaded.clone()).await;
        Ok(loaded)
    }

    /// Replace the cached settings after a write.
    pub async fn cache_system_settings(&self, value: SystemSettings) {
        self.inner.settings_cache.insert((), value).await;
    }
}
