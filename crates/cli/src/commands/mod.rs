//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;

use activity_console_admin::db;

/// Errors shared by every command that touches the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read a required environment variable after loading `.env`.
pub fn required_env(name: &'static str) -> Result<String, ConnectError> {
    dotenvy::dotenv().ok();
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConnectError::MissingEnvVar(name))
}

/// Connect to the console database named by `CONSOLE_DATABASE_URL`.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let url = SecretString::from(required_env("CONSOLE_DATABASE_URL")?);
    tracing::info!("Connecting to console database...");
    Ok(db::create_pool(&url).await?)
}
