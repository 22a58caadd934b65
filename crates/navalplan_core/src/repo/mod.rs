//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from services and the order element editor.
//!
//! # Invariants
//! - Repositories are built from connections returned by `db::open_db*`.
//! - Persisted rows that cannot be mapped back to the model are reported as
//!   `InvalidData`, never silently skipped.

pub mod criterion_repo;
pub mod label_type_repo;
pub mod order_repo;

use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| format!("invalid uuid `{value}` in {column}"))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
