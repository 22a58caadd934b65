//! Schema migrations for the planning database.
//!
//! # Responsibility
//! - Register the planning schema steps (label types, criteria, order tree).
//! - Bring a connection from its recorded version up to `latest_version()`.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly 1.
//! - All pending steps run in one transaction; `PRAGMA user_version` is
//!   bumped after each step inside it.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "label_types",
        sql: include_str!("0001_label_types.sql"),
    },
    SchemaStep {
        version: 2,
        name: "criteria",
        sql: include_str!("0002_criteria.sql"),
    },
    SchemaStep {
        version: 3,
        name: "order_elements",
        sql: include_str!("0003_order_elements.sql"),
    },
];

/// Schema version a fully migrated planning database reports.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Runs every step newer than the connection's `user_version`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this build.
/// - `Sqlite` when a step fails; the transaction is rolled back.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let to_version = latest_version();
    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }

    let pending: Vec<&SchemaStep> = pending_steps(from_version).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from_version} to_version={to_version} steps={}",
        pending.len()
    );
    Ok(())
}

fn pending_steps(from_version: u32) -> impl Iterator<Item = &'static SchemaStep> {
    SCHEMA_STEPS
        .iter()
        .skip_while(move |step| step.version <= from_version)
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    Ok(version)
}
