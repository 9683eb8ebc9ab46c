//! Service error taxonomy and persistence-error classification.

use sqlx::error::DatabaseError;
use tracing::error;

use crate::interfaces::StorageError;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the student service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No record matched the given identity or search term.
    #[error("No student matches '{term}'")]
    NotFound { term: String },

    /// A unique constraint was violated. Correctable by the caller; the
    /// conflicting detail is exposed.
    #[error("Conflicting value: {detail}")]
    Conflict { detail: String },

    /// Input rejected at the boundary, before any storage access.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Unclassified persistence failure. The underlying detail is logged
    /// at the classification site and withheld from the caller.
    #[error("Internal storage error")]
    Internal,

    /// The transaction could not be rolled back cleanly; the classified
    /// cause of the original failure is attached.
    #[error("Transaction aborted")]
    TransactionAborted {
        #[source]
        cause: Box<ServiceError>,
    },
}

/// Map a raw persistence error to the caller-facing taxonomy.
///
/// Unique-constraint conflicts keep their detail so the caller can correct
/// the input. Everything else is logged here in full and collapsed to an
/// opaque internal error. No retries happen at this level.
pub fn classify(err: StorageError) -> ServiceError {
    match err {
        StorageError::UniqueViolation { detail } => ServiceError::Conflict { detail },
        StorageError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            ServiceError::Conflict {
                detail: db.message().to_string(),
            }
        }
        other => {
            error!(error = %other, "unclassified storage failure");
            ServiceError::Internal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_classified_as_conflict() {
        let err = classify(StorageError::UniqueViolation {
            detail: "students.nickname: 'ada' already taken".to_string(),
        });
        match err {
            ServiceError::Conflict { detail } => assert!(detail.contains("ada")),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_failure_classified_as_internal() {
        let err = classify(StorageError::Unavailable("connection reset".to_string()));
        assert!(matches!(err, ServiceError::Internal));
        // Detail is withheld from the caller-facing message.
        assert_eq!(err.to_string(), "Internal storage error");
    }

    #[test]
    fn test_row_not_found_is_not_a_conflict() {
        let err = classify(StorageError::Database(sqlx::Error::RowNotFound));
        assert!(matches!(err, ServiceError::Internal));
    }
}
