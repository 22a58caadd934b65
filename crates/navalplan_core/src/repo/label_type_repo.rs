//! Label type repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `label_types`.
//! - Answer name uniqueness questions for label type forms.
//!
//! # Invariants
//! - The table has no unique constraint on `name`; duplicates can exist and
//!   make name lookups ambiguous (`InstanceNotFound`).
//! - `is_unique` never fails: any lookup error is logged and answered `false`.

use crate::db::{ensure_connection_ready, DbError};
use crate::model::label_type::{LabelType, LabelTypeId, LabelTypeValidationError};
use crate::repo::parse_uuid;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const LABEL_TYPE_SELECT_SQL: &str = "SELECT id, name FROM label_types";

pub type LabelTypeRepoResult<T> = Result<T, LabelTypeRepoError>;

#[derive(Debug)]
pub enum LabelTypeRepoError {
    Validation(LabelTypeValidationError),
    Db(DbError),
    NotFound(LabelTypeId),
    /// More than one label type carries the looked-up name.
    InstanceNotFound { name: String, matches: usize },
    InvalidData(String),
}

impl Display for LabelTypeRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "label type not found: {id}"),
            Self::InstanceNotFound { name, matches } => write!(
                f,
                "label type not found by name `{name}`: {matches} records share it"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted label type: {message}"),
        }
    }
}

impl Error for LabelTypeRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LabelTypeValidationError> for LabelTypeRepoError {
    fn from(value: LabelTypeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for LabelTypeRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LabelTypeRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data access for label types.
pub trait LabelTypeRepository {
    /// All label types ordered by name.
    fn get_all(&self) -> LabelTypeRepoResult<Vec<LabelType>>;
    fn find(&self, id: LabelTypeId) -> LabelTypeRepoResult<LabelType>;
    fn exists(&self, id: LabelTypeId) -> LabelTypeRepoResult<bool>;
    /// Inserts or updates by id.
    fn save(&self, label_type: &LabelType) -> LabelTypeRepoResult<()>;
    fn remove(&self, id: LabelTypeId) -> LabelTypeRepoResult<()>;
    /// Every record whose name equals `label_type.name`.
    fn find_by_name(&self, label_type: &LabelType) -> LabelTypeRepoResult<Vec<LabelType>>;
    /// The single record named like `label_type`, if any.
    ///
    /// # Errors
    /// - `InstanceNotFound` when the name matches more than one record.
    fn find_unique_by_name(&self, label_type: &LabelType)
        -> LabelTypeRepoResult<Option<LabelType>>;
    /// Whether `label_type` can keep its name without clashing with another
    /// record.
    fn is_unique(&self, label_type: &LabelType) -> bool;
    /// Whether exactly one record carries the name. Ambiguous names answer
    /// `false`.
    fn exists_by_name(&self, label_type: &LabelType) -> LabelTypeRepoResult<bool>;
}

pub struct SqliteLabelTypeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLabelTypeRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> LabelTypeRepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl LabelTypeRepository for SqliteLabelTypeRepository<'_> {
    fn get_all(&self) -> LabelTypeRepoResult<Vec<LabelType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LABEL_TYPE_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_label_type_row(row)?);
        }
        Ok(items)
    }

    fn find(&self, id: LabelTypeId) -> LabelTypeRepoResult<LabelType> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LABEL_TYPE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_label_type_row(row),
            None => Err(LabelTypeRepoError::NotFound(id)),
        }
    }

    fn exists(&self, id: LabelTypeId) -> LabelTypeRepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM label_types WHERE id = ?1;",
                [id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn save(&self, label_type: &LabelType) -> LabelTypeRepoResult<()> {
        label_type.validate()?;
        self.conn.execute(
            "INSERT INTO label_types (id, name)
             VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![label_type.id.to_string(), label_type.name.as_str()],
        )?;
        info!(
            "event=label_type_save module=repo status=ok label_type_id={}",
            label_type.id
        );
        Ok(())
    }

    fn remove(&self, id: LabelTypeId) -> LabelTypeRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM label_types WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(LabelTypeRepoError::NotFound(id));
        }
        Ok(())
    }

    fn find_by_name(&self, label_type: &LabelType) -> LabelTypeRepoResult<Vec<LabelType>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LABEL_TYPE_SELECT_SQL} WHERE name = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([label_type.name.as_str()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_label_type_row(row)?);
        }
        Ok(items)
    }

    fn find_unique_by_name(
        &self,
        label_type: &LabelType,
    ) -> LabelTypeRepoResult<Option<LabelType>> {
        let mut matches = self.find_by_name(label_type)?;
        if matches.len() > 1 {
            return Err(LabelTypeRepoError::InstanceNotFound {
                name: label_type.name.clone(),
                matches: matches.len(),
            });
        }
        Ok(matches.pop())
    }

    fn is_unique(&self, label_type: &LabelType) -> bool {
        match self.find_unique_by_name(label_type) {
            Ok(None) => true,
            Ok(Some(existing)) => existing.id == label_type.id,
            Err(err) => {
                error!(
                    "event=label_type_unique module=repo status=error label_type_id={} error={err}",
                    label_type.id
                );
                false
            }
        }
    }

    fn exists_by_name(&self, label_type: &LabelType) -> LabelTypeRepoResult<bool> {
        match self.find_unique_by_name(label_type) {
            Ok(found) => Ok(found.is_some()),
            Err(LabelTypeRepoError::InstanceNotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

fn parse_label_type_row(row: &Row<'_>) -> LabelTypeRepoResult<LabelType> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "label_types.id").map_err(LabelTypeRepoError::InvalidData)?;
    Ok(LabelType {
        id,
        name: row.get("name")?,
    })
}
