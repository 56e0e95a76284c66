//! HTTP middleware for the console.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Maintenance gate (503 on `/api/*` while maintenance is on)
//!
//! Authentication is enforced per handler by the [`RequireAdminAuth`]
//! extractor.

pub mod auth;
pub mod maintenance;
pub mod session;

pub use auth::{RequireAdminAuth, clear_current_admin, session_admin, set_current_admin};
pub use maintenance::maintenance_gate;
pub use session::{SessionStoreError, create_session_layer};
