//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Students table schema.
#[derive(Iden)]
pub enum Students {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "nickname"]
    Nickname,
    #[iden = "created_at"]
    CreatedAt,
}

/// Grades table schema.
#[derive(Iden)]
pub enum Grades {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "student_id"]
    StudentId,
    #[iden = "score"]
    Score,
}

/// SQL for creating the students table.
pub const CREATE_STUDENTS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    nickname TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
)";

/// SQL for creating the grades table.
///
/// The FK cascade is a backstop; grade removal is done explicitly in the
/// unit of work so the transactional contract is visible in code.
pub const CREATE_GRADES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS grades (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    score REAL NOT NULL
)";

/// SQL for the grade ownership index.
pub const CREATE_GRADES_STUDENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id)";
