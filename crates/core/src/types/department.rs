//! Department scope tags.
//!
//! Records written by older console versions store departments as localized
//! Thai faculty names; newer records store canonical keys. Every comparison
//! between a stored department and an admin's scope goes through
//! [`normalize_department`] so both representations compare equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing an [`AdminDepartment`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DepartmentError {
    /// The input matches no key, legacy label, or alias.
    #[error("unrecognized department: {0:?}")]
    Unrecognized(String),
}

/// An organizational unit that scopes what an admin may see and edit.
///
/// [`AdminDepartment::All`] is the wildcard reserved for super admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdminDepartment {
    Engineering,
    Science,
    Business,
    Humanities,
    Education,
    Agriculture,
    Nursing,
    InformationTechnology,
    StudentAffairs,
    /// Unrestricted scope.
    All,
}

/// Wildcard key shared by stored records and scope checks.
pub const WILDCARD_KEY: &str = "all";

impl AdminDepartment {
    /// The nine named departments, excluding the wildcard.
    pub const NAMED: [Self; 9] = [
        Self::Engineering,
        Self::Science,
        Self::Business,
        Self::Humanities,
        Self::Education,
        Self::Agriculture,
        Self::Nursing,
        Self::InformationTechnology,
        Self::StudentAffairs,
    ];

    /// Canonical storage key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Engineering => "engineering",
            Self::Science => "science",
            Self::Business => "business",
            Self::Humanities => "humanities",
            Self::Education => "education",
            Self::Agriculture => "agriculture",
            Self::Nursing => "nursing",
            Self::InformationTechnology => "information_technology",
            Self::StudentAffairs => "student_affairs",
            Self::All => WILDCARD_KEY,
        }
    }

    /// Thai label used by records created before keys were introduced.
    #[must_use]
    pub const fn legacy_label(self) -> &'static str {
        match self {
            Self::Engineering => "คณะวิศวกรรมศาสตร์",
            Self::Science => "คณะวิทยาศาสตร์",
            Self::Business => "คณะบริหารธุรกิจ",
            Self::Humanities => "คณะมนุษยศาสตร์และสังคมศาสตร์",
            Self::Education => "คณะครุศาสตร์",
            Self::Agriculture => "คณะเกษตรศาสตร์",
            Self::Nursing => "คณะพยาบาลศาสตร์",
            Self::InformationTechnology => "คณะเทคโนโลยีสารสนเทศ",
            Self::StudentAffairs => "กองพัฒนานักศึกษา",
            Self::All => "ทั้งหมด",
        }
    }

    /// English display label.
    #[must_use]
    pub const fn english_label(self) -> &'static str {
        match self {
            Self::Engineering => "Faculty of Engineering",
            Self::Science => "Faculty of Science",
            Self::Business => "Faculty of Business Administration",
            Self::Humanities => "Faculty of Humanities and Social Sciences",
            Self::Education => "Faculty of Education",
            Self::Agriculture => "Faculty of Agriculture",
            Self::Nursing => "Faculty of Nursing",
            Self::InformationTechnology => "Faculty of Information Technology",
            Self::StudentAffairs => "Division of Student Affairs",
            Self::All => "All departments",
        }
    }

    /// Returns true for the unrestricted wildcard.
    #[must_use]
    pub const fn is_wildcard(self) -> bool {
        matches!(self, Self::All)
    }

    /// Resolve a key, legacy label, English label, or known alias.
    #[must_use]
    pub fn parse_lenient(input: &str) -> Option<Self> {
        resolve(&clean(input))
    }
}

/// Lower-cased, trimmed, whitespace-collapsed form every matcher works on.
fn clean(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn resolve(cleaned: &str) -> Option<AdminDepartment> {
    if cleaned.is_empty() {
        return None;
    }

    let as_key = cleaned.replace([' ', '-'], "_");
    let without_faculty_prefix = cleaned.strip_prefix("คณะ").unwrap_or(cleaned);

    std::iter::once(AdminDepartment::All)
        .chain(AdminDepartment::NAMED)
        .find(|dept| {
            dept.key() == as_key
                || dept.legacy_label() == cleaned
                || dept.legacy_label().strip_prefix("คณะ") == Some(without_faculty_prefix)
                || dept.english_label().to_lowercase() == cleaned
        })
        .or_else(|| alias(cleaned))
}

/// Short names that show up in hand-entered legacy data.
fn alias(cleaned: &str) -> Option<AdminDepartment> {
    match cleaned {
        "*" | "any" => Some(AdminDepartment::All),
        "it" | "ict" | "ไอที" => Some(AdminDepartment::InformationTechnology),
        "eng" | "วิศวะ" => Some(AdminDepartment::Engineering),
        "sci" => Some(AdminDepartment::Science),
        "bba" | "บริหาร" => Some(AdminDepartment::Business),
        "student affairs" | "กิจการนักศึกษา" => Some(AdminDepartment::StudentAffairs),
        _ => None,
    }
}

/// Normalize a department value to its canonical key.
///
/// Returns the canonical key for anything recognized (including `all`), and
/// the cleaned input for anything else so unrecognized values still compare
/// consistently. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn normalize_department(input: &str) -> String {
    let cleaned = clean(input);
    resolve(&cleaned).map_or(cleaned, |dept| dept.key().to_owned())
}

/// Compare a stored department against an allowed scope key.
///
/// True when either side normalizes to the wildcard, or both normalize to the
/// same non-empty value.
#[must_use]
pub fn dept_equals(record_dept: &str, allowed: &str) -> bool {
    let record = normalize_department(record_dept);
    let allowed = normalize_department(allowed);

    record == WILDCARD_KEY || allowed == WILDCARD_KEY || (!record.is_empty() && record == allowed)
}

impl std::fmt::Display for AdminDepartment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for AdminDepartment {
    type Err = DepartmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| DepartmentError::Unrecognized(s.to_owned()))
    }
}

impl Serialize for AdminDepartment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for AdminDepartment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "engineering",
        "  Engineering ",
        "คณะวิศวกรรมศาสตร์",
        "วิศวกรรมศาสตร์",
        "Faculty of Information Technology",
        "information-technology",
        "IT",
        "ทั้งหมด",
        "ALL",
        "",
        "   ",
        "Faculty of Astrology",
        "คณะโบราณคดี",
    ];

    #[test]
    fn test_keys_resolve_to_themselves() {
        for dept in AdminDepartment::NAMED {
            assert_eq!(AdminDepartment::parse_lenient(dept.key()), Some(dept));
            assert_eq!(normalize_department(dept.key()), dept.key());
        }
    }

    #[test]
    fn test_legacy_labels_resolve() {
        for dept in AdminDepartment::NAMED {
            assert_eq!(AdminDepartment::parse_lenient(dept.legacy_label()), Some(dept));
            assert_eq!(
                AdminDepartment::parse_lenient(dept.english_label()),
                Some(dept)
            );
        }
        assert_eq!(
            AdminDepartment::parse_lenient("ทั้งหมด"),
            Some(AdminDepartment::All)
        );
    }

    #[test]
    fn test_faculty_prefix_is_optional() {
        assert_eq!(
            AdminDepartment::parse_lenient("วิทยาศาสตร์"),
            Some(AdminDepartment::Science)
        );
    }

    #[test]
    fn test_unrecognized_is_cleaned_not_mapped() {
        assert_eq!(normalize_department("  Faculty of  Astrology "), "faculty of astrology");
        assert_eq!(AdminDepartment::parse_lenient("Faculty of Astrology"), None);
        assert_eq!(AdminDepartment::parse_lenient(""), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize_department(sample);
            assert_eq!(normalize_department(&once), once, "input {sample:?}");
        }
    }

    #[test]
    fn test_wildcard_on_either_side() {
        for sample in SAMPLES {
            assert!(dept_equals(sample, "all"), "record {sample:?}");
            assert!(dept_equals("all", sample), "allowed {sample:?}");
        }
    }

    #[test]
    fn test_legacy_and_key_compare_equal() {
        assert!(dept_equals("คณะครุศาสตร์", "education"));
        assert!(dept_equals("education", "คณะครุศาสตร์"));
        assert!(!dept_equals("คณะครุศาสตร์", "nursing"));
    }

    #[test]
    fn test_empty_never_matches_named() {
        assert!(!dept_equals("", "science"));
        assert!(!dept_equals("", ""));
    }

    #[test]
    fn test_serde_writes_key_and_reads_legacy() {
        let json = serde_json::to_string(&AdminDepartment::StudentAffairs).unwrap();
        assert_eq!(json, "\"student_affairs\"");

        let parsed: AdminDepartment = serde_json::from_str("\"กองพัฒนานักศึกษา\"").unwrap();
        assert_eq!(parsed, AdminDepartment::StudentAffairs);

        assert!(serde_json::from_str::<AdminDepartment>("\"moon base\"").is_err());
    }
}
