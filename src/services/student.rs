//! Student aggregate service.

use std::sync::Arc;

use tracing::{error, info_span, Span};
use uuid::Uuid;

use crate::config::FieldLimits;
use crate::domain::{CreateStudent, Grade, Student, UpdateStudent};
use crate::interfaces::{StorageError, StudentGateway, StudentUnitOfWork};
use crate::services::error::{classify, Result, ServiceError};
use crate::validation;

/// Student records service.
///
/// Orchestrates reads and transactional writes against a [`StudentGateway`].
/// The update path replaces a student's grade set atomically: existing
/// grades are deleted and the replacements inserted inside one unit of
/// work, rolled back together on any failure.
///
/// Concurrent updates to the same student are not serialized here; the
/// storage engine's isolation decides which commit wins.
pub struct StudentService {
    gateway: Arc<dyn StudentGateway>,
    limits: FieldLimits,
    /// Operations are instrumented under this span for the service lifetime.
    span: Span,
}

impl StudentService {
    /// Create a service with default field limits.
    pub fn new(gateway: Arc<dyn StudentGateway>) -> Self {
        Self {
            gateway,
            limits: FieldLimits::default(),
            span: info_span!("student_service"),
        }
    }

    /// Override the field limits used for boundary validation.
    pub fn with_limits(mut self, limits: FieldLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Attach the span operations are instrumented under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Create a student with optional initial grades.
    #[tracing::instrument(parent = &self.span, name = "students.create", skip_all)]
    pub async fn create(&self, spec: CreateStudent) -> Result<Student> {
        validation::validate_create(&spec, &self.limits)?;

        let student = Student::draft(spec);
        let mut uow = self.gateway.begin().await.map_err(classify)?;
        let staged = Self::stage_create(uow.as_mut(), &student).await;
        self.finish(uow, staged).await?;

        self.require(student.id).await
    }

    /// List students. A zero limit selects the configured default page
    /// size; larger limits are clamped to the configured cap.
    #[tracing::instrument(parent = &self.span, name = "students.find_all", skip_all, fields(limit, offset))]
    pub async fn find_all(&self, limit: u32, offset: u64) -> Result<Vec<Student>> {
        let limit = if limit == 0 {
            self.limits.default_page_size
        } else {
            limit.min(self.limits.max_page_size)
        };

        self.gateway.list(limit, offset).await.map_err(classify)
    }

    /// Find one student. A term that parses as a UUID is looked up by
    /// identity; anything else matches name case-insensitively or nickname
    /// exactly. The two branches never fall back to each other.
    #[tracing::instrument(parent = &self.span, name = "students.find_one", skip_all, fields(%term))]
    pub async fn find_one(&self, term: &str) -> Result<Student> {
        let found = match Uuid::parse_str(term) {
            Ok(id) => self.gateway.find_by_id(id).await.map_err(classify)?,
            Err(_) => self.gateway.search(term).await.map_err(classify)?,
        };

        found.ok_or_else(|| ServiceError::NotFound {
            term: term.to_string(),
        })
    }

    /// Update scalar fields and, when the patch carries a grade list,
    /// replace the student's grade set in the same transaction.
    ///
    /// The stored aggregate is preloaded and merged with the patch, the
    /// old grades are deleted and the replacements inserted inside one
    /// unit of work, and on success the persisted state is re-read so the
    /// caller observes exactly what was committed.
    #[tracing::instrument(parent = &self.span, name = "students.update", skip_all, fields(%id))]
    pub async fn update(&self, id: Uuid, patch: UpdateStudent) -> Result<Student> {
        validation::validate_update(&patch, &self.limits)?;

        let mut merged = self.require(id).await?;
        if let Some(name) = patch.name {
            merged.name = name;
        }
        if let Some(nickname) = patch.nickname {
            merged.nickname = nickname;
        }
        let replace_grades = patch.grades.is_some();
        if let Some(specs) = patch.grades {
            merged.grades = specs
                .into_iter()
                .map(|spec| Grade::draft(id, spec))
                .collect();
        }

        let mut uow = self.gateway.begin().await.map_err(classify)?;
        let staged = Self::stage_update(uow.as_mut(), &merged, replace_grades).await;
        self.finish(uow, staged).await?;

        self.require(id).await
    }

    /// Remove a student and the grades it owns.
    #[tracing::instrument(parent = &self.span, name = "students.remove", skip_all, fields(%id))]
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let student = self.require(id).await?;

        let mut uow = self.gateway.begin().await.map_err(classify)?;
        let staged = Self::stage_remove(uow.as_mut(), student.id).await;
        self.finish(uow, staged).await
    }

    /// Remove every student and grade. Returns the removed student count.
    #[tracing::instrument(parent = &self.span, name = "students.delete_all", skip_all)]
    pub async fn delete_all(&self) -> Result<u64> {
        let mut uow = self.gateway.begin().await.map_err(classify)?;
        let staged = uow.delete_all().await;
        self.finish(uow, staged).await
    }

    async fn stage_create(
        uow: &mut dyn StudentUnitOfWork,
        student: &Student,
    ) -> std::result::Result<(), StorageError> {
        uow.save_student(student).await?;
        uow.insert_grades(&student.grades).await
    }

    async fn stage_update(
        uow: &mut dyn StudentUnitOfWork,
        merged: &Student,
        replace_grades: bool,
    ) -> std::result::Result<(), StorageError> {
        if replace_grades {
            uow.delete_grades_of(merged.id).await?;
            uow.insert_grades(&merged.grades).await?;
        }
        uow.save_student(merged).await
    }

    async fn stage_remove(
        uow: &mut dyn StudentUnitOfWork,
        id: Uuid,
    ) -> std::result::Result<(), StorageError> {
        uow.delete_grades_of(id).await?;
        uow.delete_student(id).await
    }

    /// Commit the unit of work if staging succeeded, otherwise roll back
    /// and return the classified failure. Exactly one of commit/rollback
    /// runs; if rollback itself fails the transaction is reported aborted
    /// with the classified cause attached.
    async fn finish<T>(
        &self,
        uow: Box<dyn StudentUnitOfWork>,
        staged: std::result::Result<T, StorageError>,
    ) -> Result<T> {
        match staged {
            Ok(value) => {
                uow.commit().await.map_err(classify)?;
                Ok(value)
            }
            Err(e) => {
                let cause = classify(e);
                if let Err(rollback_err) = uow.rollback().await {
                    error!(error = %rollback_err, "rollback failed; transaction state unknown");
                    return Err(ServiceError::TransactionAborted {
                        cause: Box::new(cause),
                    });
                }
                Err(cause)
            }
        }
    }

    /// Fetch the relation-loaded aggregate by identity or fail NotFound.
    async fn require(&self, id: Uuid) -> Result<Student> {
        self.gateway
            .find_by_id(id)
            .await
            .map_err(classify)?
            .ok_or_else(|| ServiceError::NotFound {
                term: id.to_string(),
            })
    }
}
