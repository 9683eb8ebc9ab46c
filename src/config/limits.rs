//! Field constraints for boundary validation and query sizing.
//!
//! Inputs are checked against these limits before the service touches
//! storage, keeping transport/presentation concerns out of the core.

use serde::Deserialize;

/// Default maximum student name length.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 128;

/// Default maximum nickname length.
pub const DEFAULT_MAX_NICKNAME_LENGTH: usize = 64;

/// Default maximum grades carried by one student.
pub const DEFAULT_MAX_GRADES_PER_STUDENT: usize = 100;

/// Default lowest accepted score.
pub const DEFAULT_MIN_SCORE: f64 = 0.0;

/// Default highest accepted score.
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

/// Default page size when the caller passes a zero limit.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default cap on a single listing page.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// Field constraints applied at the service boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldLimits {
    /// Maximum student name length in bytes.
    pub max_name_length: usize,

    /// Maximum nickname length in bytes.
    pub max_nickname_length: usize,

    /// Maximum number of grades accepted in one create/replace.
    pub max_grades_per_student: usize,

    /// Lowest accepted score (inclusive).
    pub min_score: f64,

    /// Highest accepted score (inclusive).
    pub max_score: f64,

    /// Page size used when the caller passes a zero limit.
    pub default_page_size: u32,

    /// Cap applied to caller-supplied page sizes.
    pub max_page_size: u32,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_nickname_length: DEFAULT_MAX_NICKNAME_LENGTH,
            max_grades_per_student: DEFAULT_MAX_GRADES_PER_STUDENT,
            min_score: DEFAULT_MIN_SCORE,
            max_score: DEFAULT_MAX_SCORE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_limits_default() {
        let limits = FieldLimits::default();
        assert_eq!(limits.max_name_length, DEFAULT_MAX_NAME_LENGTH);
        assert_eq!(limits.max_grades_per_student, DEFAULT_MAX_GRADES_PER_STUDENT);
        assert_eq!(limits.min_score, 0.0);
        assert_eq!(limits.max_score, 100.0);
        assert_eq!(limits.default_page_size, DEFAULT_PAGE_SIZE);
    }
}
