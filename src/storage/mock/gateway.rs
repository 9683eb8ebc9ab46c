//! Mock StudentGateway implementation for testing.
//!
//! The unit of work stages all writes against a snapshot of the shared
//! state and publishes the snapshot on commit, so atomicity and rollback
//! behavior are observable without a database. The nickname uniqueness
//! constraint is enforced like the real schema does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Grade, Student};
use crate::interfaces::{Result, StorageError, StudentGateway, StudentUnitOfWork};

type SharedState = Arc<RwLock<HashMap<Uuid, Student>>>;

/// Mock student store that keeps aggregates in memory.
#[derive(Default)]
pub struct MockStudentStore {
    state: SharedState,
    fail_on_save: Arc<RwLock<bool>>,
    fail_on_delete: Arc<RwLock<bool>>,
    fail_on_rollback: Arc<RwLock<bool>>,
}

impl MockStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `save_student` fail with an unclassified storage error.
    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    /// Make every grade/student deletion fail.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }

    /// Make rollback itself fail, leaving the transaction unfinishable.
    pub async fn set_fail_on_rollback(&self, fail: bool) {
        *self.fail_on_rollback.write().await = fail;
    }

    fn sorted(mut students: Vec<Student>) -> Vec<Student> {
        students.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        students
    }
}

#[async_trait]
impl StudentGateway for MockStudentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>> {
        let state = self.state.read().await;
        Ok(state.get(&id).cloned())
    }

    async fn search(&self, term: &str) -> Result<Option<Student>> {
        let state = self.state.read().await;
        let matches = state
            .values()
            .filter(|s| s.name.to_uppercase() == term.to_uppercase() || s.nickname == term)
            .cloned()
            .collect();
        Ok(Self::sorted(matches).into_iter().next())
    }

    async fn list(&self, limit: u32, offset: u64) -> Result<Vec<Student>> {
        let state = self.state.read().await;
        let students = Self::sorted(state.values().cloned().collect());
        Ok(students
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn StudentUnitOfWork>> {
        let staged = self.state.read().await.clone();
        Ok(Box::new(MockUnitOfWork {
            state: Arc::clone(&self.state),
            staged,
            fail_on_save: Arc::clone(&self.fail_on_save),
            fail_on_delete: Arc::clone(&self.fail_on_delete),
            fail_on_rollback: Arc::clone(&self.fail_on_rollback),
        }))
    }
}

/// Unit of work over a snapshot of the mock state.
struct MockUnitOfWork {
    state: SharedState,
    staged: HashMap<Uuid, Student>,
    fail_on_save: Arc<RwLock<bool>>,
    fail_on_delete: Arc<RwLock<bool>>,
    fail_on_rollback: Arc<RwLock<bool>>,
}

#[async_trait]
impl StudentUnitOfWork for MockUnitOfWork {
    async fn delete_grades_of(&mut self, student_id: Uuid) -> Result<u64> {
        if *self.fail_on_delete.read().await {
            return Err(StorageError::Unavailable("injected delete failure".into()));
        }
        let count = match self.staged.get_mut(&student_id) {
            Some(student) => {
                let count = student.grades.len() as u64;
                student.grades.clear();
                count
            }
            None => 0,
        };
        Ok(count)
    }

    async fn insert_grades(&mut self, grades: &[Grade]) -> Result<()> {
        for grade in grades {
            let student = self.staged.get_mut(&grade.student_id).ok_or_else(|| {
                StorageError::Unavailable(format!(
                    "grade references missing student {}",
                    grade.student_id
                ))
            })?;
            student.grades.push(grade.clone());
        }
        Ok(())
    }

    async fn save_student(&mut self, student: &Student) -> Result<()> {
        if *self.fail_on_save.read().await {
            return Err(StorageError::Unavailable("injected save failure".into()));
        }
        let taken = self
            .staged
            .values()
            .any(|s| s.id != student.id && s.nickname == student.nickname);
        if taken {
            return Err(StorageError::UniqueViolation {
                detail: format!("students.nickname: '{}' already taken", student.nickname),
            });
        }

        match self.staged.get_mut(&student.id) {
            Some(existing) => {
                existing.name = student.name.clone();
                existing.nickname = student.nickname.clone();
            }
            None => {
                self.staged.insert(
                    student.id,
                    Student {
                        grades: Vec::new(),
                        ..student.clone()
                    },
                );
            }
        }
        Ok(())
    }

    async fn delete_student(&mut self, student_id: Uuid) -> Result<()> {
        if *self.fail_on_delete.read().await {
            return Err(StorageError::Unavailable("injected delete failure".into()));
        }
        self.staged.remove(&student_id);
        Ok(())
    }

    async fn delete_all(&mut self) -> Result<u64> {
        if *self.fail_on_delete.read().await {
            return Err(StorageError::Unavailable("injected delete failure".into()));
        }
        let count = self.staged.len() as u64;
        self.staged.clear();
        Ok(count)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        *self.state.write().await = self.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        if *self.fail_on_rollback.read().await {
            return Err(StorageError::Unavailable(
                "injected rollback failure".into(),
            ));
        }
        // Dropping the snapshot is the rollback.
        Ok(())
    }
}
