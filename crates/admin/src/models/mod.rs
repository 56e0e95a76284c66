//! Domain models for the console.

pub mod activity;
pub mod admin_user;
pub mod audit;
pub mod invite;
pub mod notification;
pub mod record;
pub mod session;
pub mod settings;
pub mod student;

pub use activity::{Activity, ActivityFilter, ActivityInput, ActivityValidationError};
pub use admin_user::{AdminAccessUpdate, AdminProfile, AvatarPosition, NewAdmin, ProfileUpdate};
pub use audit::{AdminLogEntry, LogFilter, NewLogEntry, actions};
pub use invite::{AdminInvite, InviteListItem, NewInvite};
pub use notification::{AdminNotification, NewNotification};
pub use record::{
    ActivityRecord, BulkDeleteOutcome, BulkDeleteRequest, NewActivityRecord, RecordFilter,
    bangkok,
};
pub use session::{CurrentAdmin, keys as session_keys};
pub use settings::{BannerStandards, MaintenanceSettings, SystemSettings};
pub use student::{Student, StudentFilter, StudentInput};
