//! Abstract interfaces consumed by the service layer.

mod gateway;

pub use gateway::{Result, StorageError, StudentGateway, StudentUnitOfWork};
