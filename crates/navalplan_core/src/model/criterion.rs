//! Scheduling criteria used to tag hours allocations.
//!
//! A `CriterionType` is a category (skill, department, labor category) and a
//! `Criterion` is one concrete value of it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CriterionTypeId = Uuid;
pub type CriterionId = Uuid;

/// Category of criteria, e.g. `Skill` or `Department`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CriterionType {
    pub id: CriterionTypeId,
    pub name: String,
    pub description: Option<String>,
}

impl CriterionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
        }
    }
}

/// Concrete criterion value belonging to one `CriterionType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    /// Owning criterion type.
    pub criterion_type: CriterionTypeId,
    pub name: String,
    /// Inactive criteria are kept for history but not offered for selection.
    pub active: bool,
}

impl Criterion {
    pub fn new(criterion_type: &CriterionType, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            criterion_type: criterion_type.id,
            name: name.into(),
            active: true,
        }
    }

    pub fn is_of_type(&self, type_id: CriterionTypeId) -> bool {
        self.criterion_type == type_id
    }
}
