//! Boundary validation for service inputs.
//!
//! Creation specs and patches are checked against the configured field
//! limits before the core touches storage, so transport and presentation
//! concerns never leak into the update path.

use crate::config::FieldLimits;
use crate::domain::{CreateStudent, GradeSpec, UpdateStudent};
use crate::services::ServiceError;

/// Error constants for validation failures.
pub mod errmsg {
    pub const NAME_EMPTY: &str = "name cannot be empty";
    pub const NAME_TOO_LONG: &str = "name exceeds maximum length";

    pub const NICKNAME_EMPTY: &str = "nickname cannot be empty";
    pub const NICKNAME_TOO_LONG: &str = "nickname exceeds maximum length";

    pub const TOO_MANY_GRADES: &str = "grade list exceeds maximum size";
    pub const SCORE_NOT_FINITE: &str = "score must be a finite number";
    pub const SCORE_OUT_OF_RANGE: &str = "score outside the allowed range";
}

/// Validate a creation spec.
pub fn validate_create(spec: &CreateStudent, limits: &FieldLimits) -> Result<(), ServiceError> {
    validate_name(&spec.name, limits)?;
    validate_nickname(&spec.nickname, limits)?;
    validate_grades(&spec.grades, limits)
}

/// Validate a partial update. Absent fields are not checked.
pub fn validate_update(patch: &UpdateStudent, limits: &FieldLimits) -> Result<(), ServiceError> {
    if let Some(name) = &patch.name {
        validate_name(name, limits)?;
    }
    if let Some(nickname) = &patch.nickname {
        validate_nickname(nickname, limits)?;
    }
    if let Some(grades) = &patch.grades {
        validate_grades(grades, limits)?;
    }
    Ok(())
}

fn validate_name(name: &str, limits: &FieldLimits) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(invalid("name", errmsg::NAME_EMPTY.to_string()));
    }
    if name.len() > limits.max_name_length {
        return Err(invalid(
            "name",
            format!(
                "{} (max: {}, got: {})",
                errmsg::NAME_TOO_LONG,
                limits.max_name_length,
                name.len()
            ),
        ));
    }
    Ok(())
}

fn validate_nickname(nickname: &str, limits: &FieldLimits) -> Result<(), ServiceError> {
    if nickname.trim().is_empty() {
        return Err(invalid("nickname", errmsg::NICKNAME_EMPTY.to_string()));
    }
    if nickname.len() > limits.max_nickname_length {
        return Err(invalid(
            "nickname",
            format!(
                "{} (max: {}, got: {})",
                errmsg::NICKNAME_TOO_LONG,
                limits.max_nickname_length,
                nickname.len()
            ),
        ));
    }
    Ok(())
}

fn validate_grades(grades: &[GradeSpec], limits: &FieldLimits) -> Result<(), ServiceError> {
    if grades.len() > limits.max_grades_per_student {
        return Err(invalid(
            "grades",
            format!(
                "{} (max: {}, got: {})",
                errmsg::TOO_MANY_GRADES,
                limits.max_grades_per_student,
                grades.len()
            ),
        ));
    }
    for grade in grades {
        if !grade.score.is_finite() {
            return Err(invalid("score", errmsg::SCORE_NOT_FINITE.to_string()));
        }
        if grade.score < limits.min_score || grade.score > limits.max_score {
            return Err(invalid(
                "score",
                format!(
                    "{} ({}..={}, got: {})",
                    errmsg::SCORE_OUT_OF_RANGE,
                    limits.min_score,
                    limits.max_score,
                    grade.score
                ),
            ));
        }
    }
    Ok(())
}

fn invalid(field: &'static str, reason: String) -> ServiceError {
    ServiceError::Validation { field, reason }
}
