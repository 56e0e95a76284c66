//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! console-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CONSOLE_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/admin/migrations/` and are embedded at build
//! time.

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the console migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running console migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Console migrations complete");
    Ok(())
}
