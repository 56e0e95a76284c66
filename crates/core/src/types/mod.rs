//! Core types for the activity console.
//!
//! This module provides type-safe wrappers for the access-control model and
//! common domain concepts.

pub mod department;
pub mod email;
pub mod id;
pub mod permission;
pub mod role;
pub mod status;

pub use department::{AdminDepartment, DepartmentError, dept_equals, normalize_department};
pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{AdminPermission, PermissionError, RawPermissions};
pub use role::{AdminRole, RoleError};
pub use status::*;
