//! Activities that students check in to by scanning a QR code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use activity_console_core::{ActivityId, AdminUserId};

/// An activity (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: ActivityId,
    /// Six uppercase alphanumerics, unique.
    pub code: String,
    pub name: String,
    pub description: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub checkin_radius_m: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: Option<i32>,
    pub department: String,
    pub is_active: bool,
    pub require_location: bool,
    /// Check-in URL encoded in the QR image.
    pub qr_payload: String,
    pub created_by: Option<AdminUserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Returns true while students can check in.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time <= now && now <= self.end_time
    }
}

/// Create or replace payload for an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Falls back to the system default radius when omitted.
    #[serde(default)]
    pub checkin_radius_m: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub max_participants: Option<i32>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default = "default_require_location")]
    pub require_location: bool,
}

const fn default_require_location() -> bool {
    true
}

/// Reasons an activity payload is refused before any store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivityValidationError {
    #[error("activity name is required")]
    MissingName,
    #[error("location name is required")]
    MissingLocation,
    #[error("coordinates are out of range")]
    InvalidCoordinates,
    #[error("check-in radius must be greater than zero")]
    InvalidRadius,
    #[error("end time must be after start time")]
    EndBeforeStart,
    #[error("max participants must be greater than zero")]
    InvalidMaxParticipants,
}

impl ActivityInput {
    /// Check required fields and ranges.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), ActivityValidationError> {
        if self.name.trim().is_empty() {
            return Err(ActivityValidationError::MissingName);
        }
        if self.location_name.trim().is_empty() {
            return Err(ActivityValidationError::MissingLocation);
        }
        if !valid_coordinates(self.latitude, self.longitude) {
            return Err(ActivityValidationError::InvalidCoordinates);
        }
        if self.checkin_radius_m.is_some_and(|r| r <= 0) {
            return Err(ActivityValidationError::InvalidRadius);
        }
        if self.end_time <= self.start_time {
            return Err(ActivityValidationError::EndBeforeStart);
        }
        if self.max_participants.is_some_and(|m| m <= 0) {
            return Err(ActivityValidationError::InvalidMaxParticipants);
        }
        Ok(())
    }
}

/// Returns true for finite coordinates within WGS84 bounds.
#[must_use]
pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Filters for the activity list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
    /// Narrows the scoped list to one department.
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn input() -> ActivityInput {
        let start = Utc::now();
        ActivityInput {
            name: "ปฐมนิเทศ".to_string(),
            description: String::new(),
            location_name: "หอประชุมใหญ่".to_string(),
            latitude: 13.7563,
            longitude: 100.5018,
            checkin_radius_m: Some(100),
            start_time: start,
            end_time: start + Duration::hours(2),
            max_participants: None,
            department: None,
            require_location: true,
        }
    }

    #[test]
    fn test_valid_input() {
        assert_eq!(input().validate(), Ok(()));
    }

    #[test]
    fn test_validation_rules() {
        let mut i = input();
        i.name = "  ".to_string();
        assert_eq!(i.validate(), Err(ActivityValidationError::MissingName));

        let mut i = input();
        i.latitude = 91.0;
        assert_eq!(i.validate(), Err(ActivityValidationError::InvalidCoordinates));

        let mut i = input();
        i.longitude = f64::NAN;
        assert_eq!(i.validate(), Err(ActivityValidationError::InvalidCoordinates));

        let mut i = input();
        i.checkin_radius_m = Some(0);
        assert_eq!(i.validate(), Err(ActivityValidationError::InvalidRadius));

        let mut i = input();
        i.end_time = i.start_time;
        assert_eq!(i.validate(), Err(ActivityValidationError::EndBeforeStart));
    }
}
