//! Global system settings.
//!
//! Stored as one JSON document under [`SYSTEM_SETTINGS_KEY`]. Every field has
//! a default so documents written by older versions still decode.

use serde::{Deserialize, Serialize};

/// Key of the global settings row.
pub const SYSTEM_SETTINGS_KEY: &str = "system";

/// Per-admin key holding the last selected console section.
pub const SECTION_PREFERENCE_KEY: &str = "console.section";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub maintenance: MaintenanceSettings,
    pub banner: BannerStandards,
    pub default_checkin_radius_m: i32,
    pub invite_expiry_days: i64,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            maintenance: MaintenanceSettings::default(),
            banner: BannerStandards::default(),
            default_checkin_radius_m: 100,
            invite_expiry_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    pub enabled: bool,
    pub message: String,
    /// Let signed-in admins below super admin keep working.
    pub allow_admin_bypass: bool,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            message: "ระบบอยู่ระหว่างการปรับปรุง กรุณาลองใหม่ภายหลัง".to_string(),
            allow_admin_bypass: false,
        }
    }
}

/// Upload standards for banner and avatar images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerStandards {
    pub max_file_size_kb: u32,
    /// Lower-case file extensions.
    pub allowed_formats: Vec<String>,
    pub recommended_width: u32,
    pub recommended_height: u32,
    /// Accepted relative deviation from the recommended aspect ratio.
    pub aspect_ratio_tolerance: f64,
}

impl Default for BannerStandards {
    fn default() -> Self {
        Self {
            max_file_size_kb: 2048,
            allowed_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
            recommended_width: 1600,
            recommended_height: 900,
            aspect_ratio_tolerance: 0.1,
        }
    }
}

impl BannerStandards {
    /// Returns true if `extension` (any case, with or without a dot) is allowed.
    #[must_use]
    pub fn allows_format(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_formats.iter().any(|f| f.eq_ignore_ascii_case(&ext))
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_file_size_kb as usize * 1024
    }
}

/// Reasons a settings document is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsValidationError {
    #[error("max file size must be greater than zero")]
    MaxFileSize,
    #[error("at least one image format must be allowed")]
    NoFormats,
    #[error("recommended dimensions must be positive")]
    Dimensions,
    #[error("aspect ratio tolerance must be between 0 and 1")]
    AspectTolerance,
    #[error("default check-in radius must be greater than zero")]
    Radius,
    #[error("invite expiry must be between 1 and 30 days")]
    InviteExpiry,
    #[error("maintenance message is required when maintenance mode is on")]
    MaintenanceMessage,
}

impl SystemSettings {
    pub const MAX_INVITE_EXPIRY_DAYS: i64 = 30;

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), SettingsValidationError> {
        let banner = &self.banner;
        if banner.max_file_size_kb == 0 {
            return Err(SettingsValidationError::MaxFileSize);
        }
        if banner.allowed_formats.iter().all(|f| f.trim().is_empty()) {
            return Err(SettingsValidationError::NoFormats);
        }
        if banner.recommended_width == 0 || banner.recommended_height == 0 {
            return Err(SettingsValidationError::Dimensions);
        }
        if !(0.0..=1.0).contains(&banner.aspect_ratio_tolerance) {
            return Err(SettingsValidationError::AspectTolerance);
        }
        if self.default_checkin_radius_m <= 0 {
            return Err(SettingsValidationError::Radius);
        }
        if !(1..=Self::MAX_INVITE_EXPIRY_DAYS).contains(&self.invite_expiry_days) {
            return Err(SettingsValidationError::InviteExpiry);
        }
        if self.maintenance.enabled && self.maintenance.message.trim().is_empty() {
            return Err(SettingsValidationError::MaintenanceMessage);
        }
        Ok(())
    }

    /// Lower-case and de-duplicate the format list.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut formats: Vec<String> = Vec::with_capacity(self.banner.allowed_formats.len());
        for raw in &self.banner.allowed_formats {
            let format = raw.trim().trim_start_matches('.').to_ascii_lowercase();
            if !format.is_empty() && !formats.contains(&format) {
                formats.push(format);
            }
        }
        self.banner.allowed_formats = formats;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(SystemSettings::default().validate(), Ok(()));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: SystemSettings =
            serde_json::from_value(serde_json::json!({"maintenance": {"enabled": true}})).unwrap();
        assert!(settings.maintenance.enabled);
        assert!(!settings.maintenance.message.is_empty());
        assert_eq!(settings.invite_expiry_days, 7);
    }

    #[test]
    fn test_validation_rules() {
        let mut s = SystemSettings::default();
        s.invite_expiry_days = 31;
        assert_eq!(s.validate(), Err(SettingsValidationError::InviteExpiry));

        let mut s = SystemSettings::default();
        s.banner.allowed_formats.clear();
        assert_eq!(s.validate(), Err(SettingsValidationError::NoFormats));

        let mut s = SystemSettings::default();
        s.default_checkin_radius_m = 0;
        assert_eq!(s.validate(), Err(SettingsValidationError::Radius));
    }

    #[test]
    fn test_format_matching() {
        let banner = BannerStandards::default();
        assert!(banner.allows_format(".PNG"));
        assert!(!banner.allows_format("gif"));
        assert_eq!(banner.max_bytes(), 2048 * 1024);
    }

    #[test]
    fn test_normalized_formats() {
        let mut s = SystemSettings::default();
        s.banner.allowed_formats = vec![".PNG".to_string(), "png".to_string(), " ".to_string()];
        assert_eq!(s.normalized().banner.allowed_formats, vec!["png".to_string()]);
    }
}
