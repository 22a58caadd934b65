//! Label type use-case service.
//!
//! # Responsibility
//! - Create/rename/remove label types through the repository.
//! - Refuse names already used by another label type.
//!
//! # Invariants
//! - Names are trimmed before any check or write.
//! - Uniqueness is decided by `LabelTypeRepository::is_unique`, so an
//!   ambiguous lookup also refuses the write.

use crate::model::label_type::{LabelType, LabelTypeId};
use crate::repo::label_type_repo::{LabelTypeRepoError, LabelTypeRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum LabelTypeServiceError {
    InvalidName,
    DuplicateName(String),
    NotFound(LabelTypeId),
    Repo(LabelTypeRepoError),
}

impl Display for LabelTypeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "label type name must not be blank"),
            Self::DuplicateName(name) => write!(f, "label type name already in use: `{name}`"),
            Self::NotFound(id) => write!(f, "label type not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LabelTypeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LabelTypeRepoError> for LabelTypeServiceError {
    fn from(value: LabelTypeRepoError) -> Self {
        match value {
            LabelTypeRepoError::NotFound(id) => Self::NotFound(id),
            LabelTypeRepoError::Validation(_) => Self::InvalidName,
            other => Self::Repo(other),
        }
    }
}

pub struct LabelTypeService<R: LabelTypeRepository> {
    repo: R,
}

impl<R: LabelTypeRepository> LabelTypeService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<LabelType>, LabelTypeServiceError> {
        self.repo.get_all().map_err(Into::into)
    }

    /// Creates a label type with a fresh id.
    pub fn create(&self, name: impl Into<String>) -> Result<LabelType, LabelTypeServiceError> {
        let label_type = LabelType::new(normalize_name(name.into())?);
        self.ensure_unique(&label_type)?;
        self.repo.save(&label_type)?;
        info!(
            "event=label_type_create module=service status=ok label_type_id={}",
            label_type.id
        );
        Ok(label_type)
    }

    pub fn rename(
        &self,
        id: LabelTypeId,
        name: impl Into<String>,
    ) -> Result<LabelType, LabelTypeServiceError> {
        let mut label_type = self.repo.find(id)?;
        label_type.name = normalize_name(name.into())?;
        self.ensure_unique(&label_type)?;
        self.repo.save(&label_type)?;
        Ok(label_type)
    }

    pub fn remove(&self, id: LabelTypeId) -> Result<(), LabelTypeServiceError> {
        self.repo.remove(id).map_err(Into::into)
    }

    /// Whether a new label type could take `name`.
    pub fn is_name_available(&self, name: &str) -> bool {
        self.repo.is_unique(&LabelType::new(name.trim()))
    }

    fn ensure_unique(&self, label_type: &LabelType) -> Result<(), LabelTypeServiceError> {
        if self.repo.is_unique(label_type) {
            return Ok(());
        }
        warn!(
            "event=label_type_duplicate module=service status=rejected label_type_id={}",
            label_type.id
        );
        Err(LabelTypeServiceError::DuplicateName(label_type.name.clone()))
    }
}

fn normalize_name(value: String) -> Result<String, LabelTypeServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LabelTypeServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}
