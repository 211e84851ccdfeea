//! SQLite entity store for the Lecta backend.
//!
//! This crate provides:
//! - Database initialization (schema creation, pragmas)
//! - Typed repositories for Job and Lecture entities
//! - Guarded status updates that enforce the terminal-sink invariants
//!
//! Every write commits atomically through SQLite; the per-stage columns of a
//! job can therefore be updated by concurrent workers without clobbering each
//! other's fields.

pub mod error;
pub mod init;
pub mod jobs;
pub mod lectures;

pub use error::{DbError, DbResult};
pub use init::init_database;
pub use jobs::JobRepository;
pub use lectures::LectureRepository;
