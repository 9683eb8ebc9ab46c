//! Student/grade aggregate types.
//!
//! A `Student` owns its `Grade` records: grades are created, replaced, and
//! destroyed together with their student, and every grade carries a
//! back-reference to exactly one student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student together with the grade collection it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Identity, immutable after creation.
    pub id: Uuid,
    pub name: String,
    /// Unique handle. Matched exactly (case-sensitive) on lookup.
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    pub grades: Vec<Grade>,
}

/// A single grade record, owned by one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: Uuid,
    /// Owning student. Never null once persisted.
    pub student_id: Uuid,
    pub score: f64,
}

/// Input for creating a student, with optional initial grades.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudent {
    pub name: String,
    pub nickname: String,
    #[serde(default)]
    pub grades: Vec<GradeSpec>,
}

/// Partial update. Absent scalar fields keep their stored values; an absent
/// grade list leaves the stored grades untouched, a present one replaces
/// them wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub grades: Option<Vec<GradeSpec>>,
}

/// Specification for one grade record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeSpec {
    pub score: f64,
}

impl Student {
    /// Build an unpersisted student with fresh identities for itself and
    /// its initial grades.
    pub fn draft(spec: CreateStudent) -> Self {
        let id = Uuid::new_v4();
        let grades = spec
            .grades
            .iter()
            .map(|grade| Grade::draft(id, *grade))
            .collect();
        Self {
            id,
            name: spec.name,
            nickname: spec.nickname,
            created_at: Utc::now(),
            grades,
        }
    }
}

impl Grade {
    /// Build an unpersisted grade bound to its owning student.
    pub fn draft(student_id: Uuid, spec: GradeSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            score: spec.score,
        }
    }
}
