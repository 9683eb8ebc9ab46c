//! SQLite storage backend.

mod gateway;

pub use gateway::SqliteStudentStore;
