//! Activity Console Core - Shared access-control types.
//!
//! This crate provides the types every console component agrees on:
//! - `admin` - The console HTTP server and its repositories
//! - `cli` - Command-line tools for migrations and bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The access-control model lives here so it can be
//! exercised without a running server.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, roles, permissions, departments
//! - [`guard`] - The authorization predicate consulted before privileged actions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod guard;
pub mod types;

pub use guard::{GuardDenial, GuardRequirements, GuardSubject, authorize};
pub use types::*;
