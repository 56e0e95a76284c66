//! Business logic services for the console.
//!
//! # Services
//!
//! - `audit` - Best-effort audit log writes
//! - `auth` - Email one-time-code sign-in
//! - `bulk` - Item-by-item bulk deletes
//! - `email` - Email delivery via SMTP
//! - `events` - Live event fan-out for the SSE feed
//! - `export` - Attendance CSV export
//! - `geofence` - Check-in distance checks
//! - `grants` - Rules for inviting, promoting and editing admins
//! - `notify` - Per-admin notifications
//! - `qr` - Check-in QR codes
//! - `scope` - Department scoping of lists and writes
//! - `tokens` - Random tokens, activity codes and secret hashing

pub mod audit;
pub mod auth;
pub mod bulk;
pub mod email;
pub mod events;
pub mod export;
pub mod geofence;
pub mod grants;
pub mod notify;
pub mod qr;
pub mod scope;
pub mod tokens;

pub use auth::{AdminAuthError, AdminAuthService, IssuedCode};
pub use email::{EmailError, EmailService, InviteEmail, generate_login_code};
pub use events::{EventHub, LiveEvent};
pub use export::ExportError;
pub use geofence::{GeoPoint, GeofenceCheck};
pub use grants::{Grant, GrantError, GrantRequest, InviteError};
pub use qr::QrError;
pub use scope::{DepartmentScope, Paging, ScopeWriteError};
pub use tokens::TokenError;
