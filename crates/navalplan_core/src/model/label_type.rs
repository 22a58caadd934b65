//! Label type lookup entity.
//!
//! # Invariants
//! - `name` is non-blank once validated.
//! - Name uniqueness is checked by the repository, not by the record itself.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type LabelTypeId = Uuid;

/// Category used to group labels attached to order elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelType {
    pub id: LabelTypeId,
    pub name: String,
}

/// Validation failures for label type records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelTypeValidationError {
    BlankName,
}

impl Display for LabelTypeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "label type name must not be blank"),
        }
    }
}

impl Error for LabelTypeValidationError {}

impl LabelType {
    /// Creates a label type with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a label type with a caller-provided id.
    pub fn with_id(id: LabelTypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), LabelTypeValidationError> {
        if self.name.trim().is_empty() {
            return Err(LabelTypeValidationError::BlankName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelType, LabelTypeValidationError};

    #[test]
    fn blank_name_is_rejected() {
        let label_type = LabelType::new("   ");
        assert_eq!(
            label_type.validate(),
            Err(LabelTypeValidationError::BlankName)
        );
    }

    #[test]
    fn new_generates_distinct_ids() {
        let first = LabelType::new("Priority");
        let second = LabelType::new("Priority");
        assert_ne!(first.id, second.id);
        assert!(first.validate().is_ok());
    }
}
