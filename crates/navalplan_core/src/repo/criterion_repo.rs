//! Criterion type and criterion persistence.
//!
//! # Invariants
//! - Criterion type names are unique (enforced by the schema).
//! - `criteria_for_type` only returns active criteria, ordered by name.

use crate::db::{ensure_connection_ready, DbError};
use crate::model::criterion::{Criterion, CriterionId, CriterionType, CriterionTypeId};
use crate::repo::{bool_to_int, parse_uuid};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CriterionRepoResult<T> = Result<T, CriterionRepoError>;

#[derive(Debug)]
pub enum CriterionRepoError {
    Db(DbError),
    BlankName,
    InvalidData(String),
}

impl Display for CriterionRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::BlankName => write!(f, "criterion names must not be blank"),
            Self::InvalidData(message) => write!(f, "invalid persisted criterion: {message}"),
        }
    }
}

impl Error for CriterionRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for CriterionRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CriterionRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub trait CriterionRepository {
    fn save_criterion_type(&self, criterion_type: &CriterionType) -> CriterionRepoResult<()>;
    fn save_criterion(&self, criterion: &Criterion) -> CriterionRepoResult<()>;
    fn list_criterion_types(&self) -> CriterionRepoResult<Vec<CriterionType>>;
    fn criterion_type_by_name(&self, name: &str) -> CriterionRepoResult<Option<CriterionType>>;
    fn criteria_for_type(&self, type_id: CriterionTypeId) -> CriterionRepoResult<Vec<Criterion>>;
    fn get_criterion(&self, id: CriterionId) -> CriterionRepoResult<Option<Criterion>>;
}

pub struct SqliteCriterionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCriterionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> CriterionRepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CriterionRepository for SqliteCriterionRepository<'_> {
    fn save_criterion_type(&self, criterion_type: &CriterionType) -> CriterionRepoResult<()> {
        if criterion_type.name.trim().is_empty() {
            return Err(CriterionRepoError::BlankName);
        }
        self.conn.execute(
            "INSERT INTO criterion_types (id, name, description)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description;",
            params![
                criterion_type.id.to_string(),
                criterion_type.name.as_str(),
                criterion_type.description.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn save_criterion(&self, criterion: &Criterion) -> CriterionRepoResult<()> {
        if criterion.name.trim().is_empty() {
            return Err(CriterionRepoError::BlankName);
        }
        self.conn.execute(
            "INSERT INTO criteria (id, criterion_type_id, name, active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                criterion_type_id = excluded.criterion_type_id,
                name = excluded.name,
                active = excluded.active;",
            params![
                criterion.id.to_string(),
                criterion.criterion_type.to_string(),
                criterion.name.as_str(),
                bool_to_int(criterion.active),
            ],
        )?;
        Ok(())
    }

    fn list_criterion_types(&self) -> CriterionRepoResult<Vec<CriterionType>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description
             FROM criterion_types
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_criterion_type_row(row)?);
        }
        Ok(items)
    }

    fn criterion_type_by_name(&self, name: &str) -> CriterionRepoResult<Option<CriterionType>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description
             FROM criterion_types
             WHERE name = ?1;",
        )?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_criterion_type_row(row)?)),
            None => Ok(None),
        }
    }

    fn criteria_for_type(&self, type_id: CriterionTypeId) -> CriterionRepoResult<Vec<Criterion>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, criterion_type_id, name, active
             FROM criteria
             WHERE criterion_type_id = ?1
               AND active = 1
             ORDER BY name ASC, id ASC;",
        )?;
        let mut rows = stmt.query([type_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_criterion_row(row)?);
        }
        Ok(items)
    }

    fn get_criterion(&self, id: CriterionId) -> CriterionRepoResult<Option<Criterion>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, criterion_type_id, name, active
             FROM criteria
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_criterion_row(row)?)),
            None => Ok(None),
        }
    }
}

fn parse_criterion_type_row(row: &Row<'_>) -> CriterionRepoResult<CriterionType> {
    let id_text: String = row.get("id")?;
    Ok(CriterionType {
        id: parse_uuid(&id_text, "criterion_types.id").map_err(CriterionRepoError::InvalidData)?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

pub(crate) fn parse_criterion_row(row: &Row<'_>) -> CriterionRepoResult<Criterion> {
    let id_text: String = row.get("id")?;
    let type_text: String = row.get("criterion_type_id")?;
    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(CriterionRepoError::InvalidData(format!(
                "invalid active value `{other}` in criteria.active"
            )));
        }
    };
    Ok(Criterion {
        id: parse_uuid(&id_text, "criteria.id").map_err(CriterionRepoError::InvalidData)?,
        criterion_type: parse_uuid(&type_text, "criteria.criterion_type_id")
            .map_err(CriterionRepoError::InvalidData)?,
        name: row.get("name")?,
        active,
    })
}
