//! Persistence gateway interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Grade, Student};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unique constraint violated: {detail}")]
    UniqueViolation { detail: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Read side of student persistence, plus transaction acquisition.
///
/// All lookups eager-load the grade collection, so callers always observe
/// the full aggregate.
///
/// Implementations:
/// - `SqliteStudentStore`: SQLite storage
/// - `MockStudentStore`: In-memory mock for testing
#[async_trait]
pub trait StudentGateway: Send + Sync {
    /// Look up a student by identity.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>>;

    /// Look up a student by a non-identity term: case-insensitive match on
    /// name, or exact match on nickname.
    async fn search(&self, term: &str) -> Result<Option<Student>>;

    /// List students ordered by creation time, then identity.
    async fn list(&self, limit: u32, offset: u64) -> Result<Vec<Student>>;

    /// Open a unit of work. All writes go through the returned handle.
    async fn begin(&self) -> Result<Box<dyn StudentUnitOfWork>>;
}

/// An open transaction against student storage.
///
/// Every handle ends in exactly one of `commit` or `rollback`; both consume
/// it, and dropping an unfinished handle discards the transaction. The
/// underlying connection is released on every exit path.
#[async_trait]
pub trait StudentUnitOfWork: Send {
    /// Delete all grades owned by a student. Returns the deleted count.
    async fn delete_grades_of(&mut self, student_id: Uuid) -> Result<u64>;

    /// Insert grade records. Each grade must reference an existing student.
    async fn insert_grades(&mut self, grades: &[Grade]) -> Result<()>;

    /// Insert or update the student row. Does not touch grades.
    async fn save_student(&mut self, student: &Student) -> Result<()>;

    /// Delete the student row. Grades must already be removed.
    async fn delete_student(&mut self, student_id: Uuid) -> Result<()>;

    /// Delete every grade and student. Returns the removed student count.
    async fn delete_all(&mut self) -> Result<u64>;

    /// Make all staged writes durable.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all staged writes.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
