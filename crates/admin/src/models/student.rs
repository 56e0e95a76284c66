//! Student records managed by admins with `manage_users`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use activity_console_core::StudentId;

/// A student who can check in to activities.
#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: StudentId,
    /// University-issued student number, used at check-in.
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Stored as written; may be a legacy label.
    pub department: String,
    pub major: String,
    pub year: Option<i16>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Create or replace payload for a student.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentInput {
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Required for wildcard admins; others are pinned to their own department.
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub year: Option<i16>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl StudentInput {
    /// Check required fields before touching the store.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let code = self.student_code.trim();
        if code.is_empty() || code.len() > 20 || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("student_code must be 1-20 letters, digits or dashes".to_string());
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("first_name and last_name are required".to_string());
        }
        if let Some(year) = self.year {
            if !(1..=8).contains(&year) {
                return Err("year must be between 1 and 8".to_string());
            }
        }
        Ok(())
    }
}

/// Filters for the student list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> StudentInput {
        StudentInput {
            student_code: "6401234".to_string(),
            first_name: "สมชาย".to_string(),
            last_name: "ใจดี".to_string(),
            email: None,
            department: Some("engineering".to_string()),
            major: "Computer Engineering".to_string(),
            year: Some(2),
            is_active: true,
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_code_and_year() {
        let mut bad = input();
        bad.student_code = "64 01".to_string();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.year = Some(12);
        assert!(bad.validate().is_err());
    }
}
