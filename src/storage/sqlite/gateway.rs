//! SQLite StudentGateway implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Cond, Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Grade, Student};
use crate::interfaces::{Result, StudentGateway, StudentUnitOfWork};
use crate::storage::schema::{Grades, Students};

/// SQLite implementation of the student gateway.
pub struct SqliteStudentStore {
    pool: SqlitePool,
}

impl SqliteStudentStore {
    /// Create a new SQLite student store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        sqlx::query(crate::storage::schema::CREATE_STUDENTS_TABLE)
            .execute(&self.pool)
            .await?;

        sqlx::query(crate::storage::schema::CREATE_GRADES_TABLE)
            .execute(&self.pool)
            .await?;

        sqlx::query(crate::storage::schema::CREATE_GRADES_STUDENT_INDEX)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn load_grades(&self, student_id: Uuid) -> Result<Vec<Grade>> {
        let query = Query::select()
            .columns([Grades::Id, Grades::StudentId, Grades::Score])
            .from(Grades::Table)
            .and_where(Expr::col(Grades::StudentId).eq(student_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter().map(grade_from_row).collect()
    }

    async fn fetch_one_student(&self, query: String) -> Result<Option<Student>> {
        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let mut student = student_from_row(&row)?;
                student.grades = self.load_grades(student.id).await?;
                Ok(Some(student))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StudentGateway for SqliteStudentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>> {
        let query = Query::select()
            .columns(STUDENT_COLUMNS)
            .from(Students::Table)
            .and_where(Expr::col(Students::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        self.fetch_one_student(query).await
    }

    async fn search(&self, term: &str) -> Result<Option<Student>> {
        let query = Query::select()
            .columns(STUDENT_COLUMNS)
            .from(Students::Table)
            .cond_where(
                Cond::any()
                    .add(
                        Expr::expr(Func::upper(Expr::col(Students::Name)))
                            .eq(term.to_uppercase()),
                    )
                    .add(Expr::col(Students::Nickname).eq(term)),
            )
            .order_by(Students::CreatedAt, Order::Asc)
            .order_by(Students::Id, Order::Asc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        self.fetch_one_student(query).await
    }

    async fn list(&self, limit: u32, offset: u64) -> Result<Vec<Student>> {
        let query = Query::select()
            .columns(STUDENT_COLUMNS)
            .from(Students::Table)
            .order_by(Students::CreatedAt, Order::Asc)
            .order_by(Students::Id, Order::Asc)
            .limit(u64::from(limit))
            .offset(offset)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut students = Vec::with_capacity(rows.len());
        for row in &rows {
            students.push(student_from_row(row)?);
        }
        if students.is_empty() {
            return Ok(students);
        }

        let ids: Vec<String> = students.iter().map(|s| s.id.to_string()).collect();
        let query = Query::select()
            .columns([Grades::Id, Grades::StudentId, Grades::Score])
            .from(Grades::Table)
            .and_where(Expr::col(Grades::StudentId).is_in(ids))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut by_student: HashMap<Uuid, Vec<Grade>> = HashMap::new();
        for row in &rows {
            let grade = grade_from_row(row)?;
            by_student.entry(grade.student_id).or_default().push(grade);
        }

        for student in &mut students {
            if let Some(grades) = by_student.remove(&student.id) {
                student.grades = grades;
            }
        }

        Ok(students)
    }

    async fn begin(&self) -> Result<Box<dyn StudentUnitOfWork>> {
        let mut conn = self.pool.acquire().await?;

        // BEGIN IMMEDIATE takes the write lock up front, so two deferred
        // transactions cannot deadlock racing to upgrade from shared to
        // exclusive.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        Ok(Box::new(SqliteUnitOfWork {
            conn: Some(conn),
            state: TxState::Active,
        }))
    }
}

const STUDENT_COLUMNS: [Students; 4] = [
    Students::Id,
    Students::Name,
    Students::Nickname,
    Students::CreatedAt,
];

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");

    Ok(Student {
        id: Uuid::parse_str(&id)?,
        name: row.get("name"),
        nickname: row.get("nickname"),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        grades: Vec::new(),
    })
}

fn grade_from_row(row: &SqliteRow) -> Result<Grade> {
    let id: String = row.get("id");
    let student_id: String = row.get("student_id");

    Ok(Grade {
        id: Uuid::parse_str(&id)?,
        student_id: Uuid::parse_str(&student_id)?,
        score: row.get("score"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// An open SQLite transaction on a pooled connection.
///
/// `commit`/`rollback` consume the handle and return the connection to the
/// pool. If the handle is dropped while still active, the connection is
/// detached from the pool and closed; SQLite discards the open transaction
/// when the connection goes away, and the pool lends a fresh one next time.
struct SqliteUnitOfWork {
    conn: Option<PoolConnection<Sqlite>>,
    state: TxState,
}

impl SqliteUnitOfWork {
    /// Statements are only valid on an Active transaction. Anything else
    /// is a programming error, not a recoverable condition.
    fn conn_mut(&mut self) -> &mut SqliteConnection {
        match (self.state, self.conn.as_mut()) {
            (TxState::Active, Some(conn)) => &mut **conn,
            (state, _) => panic!("statement issued on a {state:?} transaction"),
        }
    }
}

#[async_trait]
impl StudentUnitOfWork for SqliteUnitOfWork {
    async fn delete_grades_of(&mut self, student_id: Uuid) -> Result<u64> {
        let query = Query::delete()
            .from_table(Grades::Table)
            .and_where(Expr::col(Grades::StudentId).eq(student_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(self.conn_mut()).await?;

        Ok(result.rows_affected())
    }

    async fn insert_grades(&mut self, grades: &[Grade]) -> Result<()> {
        for grade in grades {
            let query = Query::insert()
                .into_table(Grades::Table)
                .columns([Grades::Id, Grades::StudentId, Grades::Score])
                .values_panic([
                    grade.id.to_string().into(),
                    grade.student_id.to_string().into(),
                    grade.score.into(),
                ])
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(self.conn_mut()).await?;
        }

        Ok(())
    }

    async fn save_student(&mut self, student: &Student) -> Result<()> {
        let query = Query::insert()
            .into_table(Students::Table)
            .columns(STUDENT_COLUMNS)
            .values_panic([
                student.id.to_string().into(),
                student.name.clone().into(),
                student.nickname.clone().into(),
                student.created_at.to_rfc3339().into(),
            ])
            .on_conflict(
                OnConflict::column(Students::Id)
                    .update_columns([Students::Name, Students::Nickname])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(self.conn_mut()).await?;

        Ok(())
    }

    async fn delete_student(&mut self, student_id: Uuid) -> Result<()> {
        let query = Query::delete()
            .from_table(Students::Table)
            .and_where(Expr::col(Students::Id).eq(student_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(self.conn_mut()).await?;

        Ok(())
    }

    async fn delete_all(&mut self) -> Result<u64> {
        let query = Query::delete()
            .from_table(Grades::Table)
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(self.conn_mut()).await?;

        let query = Query::delete()
            .from_table(Students::Table)
            .to_string(SqliteQueryBuilder);
        let result = sqlx::query(&query).execute(self.conn_mut()).await?;

        Ok(result.rows_affected())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        sqlx::query("COMMIT").execute(self.conn_mut()).await?;
        self.state = TxState::Committed;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        sqlx::query("ROLLBACK").execute(self.conn_mut()).await?;
        self.state = TxState::RolledBack;
        Ok(())
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if self.state == TxState::Active {
            if let Some(conn) = self.conn.take() {
                // Detach the connection so the open transaction never
                // re-enters the pool; closing it makes SQLite discard the
                // uncommitted writes.
                drop(conn.leak());
                warn!("transaction dropped while active; writes discarded");
            }
        }
    }
}
