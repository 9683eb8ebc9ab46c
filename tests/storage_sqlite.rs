//! SQLite storage integration tests.
//!
//! Run with: cargo test --test storage_sqlite
//!
//! Uses an in-memory database by default, no external dependencies required.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use gradebook::config::{StorageConfig, StorageType};
use gradebook::domain::{CreateStudent, GradeSpec, UpdateStudent};
use gradebook::services::{ServiceError, StudentService};
use gradebook::storage::{init_storage, SqliteStudentStore};

/// Build a service over a fresh in-memory database.
///
/// A single pooled connection so every access sees the same in-memory
/// database.
async fn sqlite_service() -> StudentService {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let store = SqliteStudentStore::new(pool);
    store.init().await.expect("Failed to create schema");

    StudentService::new(Arc::new(store))
}

fn spec(name: &str, nickname: &str, scores: &[f64]) -> CreateStudent {
    CreateStudent {
        name: name.to_string(),
        nickname: nickname.to_string(),
        grades: scores.iter().map(|&score| GradeSpec { score }).collect(),
    }
}

fn grades_patch(scores: &[f64]) -> UpdateStudent {
    UpdateStudent {
        grades: Some(scores.iter().map(|&score| GradeSpec { score }).collect()),
        ..UpdateStudent::default()
    }
}

fn scores_of(student: &gradebook::domain::Student) -> Vec<f64> {
    let mut scores: Vec<f64> = student.grades.iter().map(|g| g.score).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
    scores
}

#[tokio::test]
async fn test_create_and_fetch_roundtrip() {
    let service = sqlite_service().await;

    let created = service
        .create(spec("Ada Lovelace", "ada", &[90.0, 85.0]))
        .await
        .unwrap();

    let by_nickname = service.find_one("ada").await.unwrap();
    assert_eq!(by_nickname.id, created.id);
    assert_eq!(by_nickname.name, "Ada Lovelace");
    assert_eq!(scores_of(&by_nickname), vec![85.0, 90.0]);

    let by_name = service.find_one("ada lovelace").await.unwrap();
    assert_eq!(by_name.id, created.id);
}

#[tokio::test]
async fn test_update_replaces_grade_set() {
    let service = sqlite_service().await;
    let student = service
        .create(spec("Ada Lovelace", "ada", &[90.0, 85.0]))
        .await
        .unwrap();

    let updated = service
        .update(student.id, grades_patch(&[100.0]))
        .await
        .unwrap();
    assert_eq!(scores_of(&updated), vec![100.0]);
    assert_eq!(updated.grades[0].student_id, student.id);

    let refetched = service.find_one(&student.id.to_string()).await.unwrap();
    assert_eq!(scores_of(&refetched), vec![100.0]);
}

#[tokio::test]
async fn test_scalar_update_preserves_grades() {
    let service = sqlite_service().await;
    let student = service
        .create(spec("Ada Lovelace", "ada", &[90.0, 85.0]))
        .await
        .unwrap();

    let updated = service
        .update(
            student.id,
            UpdateStudent {
                name: Some("Ada Byron".to_string()),
                ..UpdateStudent::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Ada Byron");
    assert_eq!(scores_of(&updated), vec![85.0, 90.0]);
}

#[tokio::test]
async fn test_duplicate_nickname_is_conflict() {
    let service = sqlite_service().await;
    service.create(spec("Ada Lovelace", "ada", &[])).await.unwrap();

    let err = service
        .create(spec("Ada Byron", "ada", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { .. }));

    // The failed transaction was finished; the store keeps working.
    service.create(spec("Alan Turing", "alan", &[])).await.unwrap();
    assert_eq!(service.find_all(0, 0).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_conflicting_update_rolls_back_grade_replacement() {
    let service = sqlite_service().await;
    service.create(spec("Ada Lovelace", "ada", &[70.0])).await.unwrap();
    let alan = service
        .create(spec("Alan Turing", "alan", &[90.0, 85.0]))
        .await
        .unwrap();

    // The grade deletion and insertion run before the save that violates
    // the nickname constraint; all of it must be rolled back together.
    let err = service
        .update(
            alan.id,
            UpdateStudent {
                nickname: Some("ada".to_string()),
                grades: Some(vec![GradeSpec { score: 100.0 }]),
                ..UpdateStudent::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { .. }));

    let unchanged = service.find_one(&alan.id.to_string()).await.unwrap();
    assert_eq!(unchanged.nickname, "alan");
    assert_eq!(scores_of(&unchanged), vec![85.0, 90.0]);
}

#[tokio::test]
async fn test_update_missing_student_is_not_found() {
    let service = sqlite_service().await;

    let err = service
        .update(
            Uuid::new_v4(),
            UpdateStudent {
                name: Some("X".to_string()),
                ..UpdateStudent::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn test_remove_deletes_student_and_grades() {
    let service = sqlite_service().await;
    let ada = service
        .create(spec("Ada Lovelace", "ada", &[90.0]))
        .await
        .unwrap();
    let alan = service
        .create(spec("Alan Turing", "alan", &[80.0]))
        .await
        .unwrap();

    service.remove(ada.id).await.unwrap();

    let err = service.find_one(&ada.id.to_string()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    let remaining = service.find_one(&alan.id.to_string()).await.unwrap();
    assert_eq!(scores_of(&remaining), vec![80.0]);
}

#[tokio::test]
async fn test_delete_all_returns_student_count() {
    let service = sqlite_service().await;
    service.create(spec("Ada Lovelace", "ada", &[90.0])).await.unwrap();
    service.create(spec("Alan Turing", "alan", &[])).await.unwrap();

    assert_eq!(service.delete_all().await.unwrap(), 2);
    assert!(service.find_all(0, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_all_pagination() {
    let service = sqlite_service().await;
    for i in 0..3 {
        service
            .create(spec(&format!("Student {i}"), &format!("s{i}"), &[]))
            .await
            .unwrap();
    }

    assert_eq!(service.find_all(2, 0).await.unwrap().len(), 2);
    assert_eq!(service.find_all(2, 2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_init_storage_creates_database_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("data").join("gradebook.db");

    let config = StorageConfig {
        storage_type: StorageType::Sqlite,
        path: path.to_string_lossy().into_owned(),
    };
    let gateway = init_storage(&config).await.expect("Failed to init storage");

    let service = StudentService::new(gateway);
    service.create(spec("Ada Lovelace", "ada", &[90.0])).await.unwrap();

    assert!(path.exists());
}
