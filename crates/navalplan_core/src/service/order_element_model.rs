//! Data source bound to the order element editor.
//!
//! # Responsibility
//! - Expose the edited order element together with the criterion catalog.
//! - Load both from storage-agnostic repositories.
//!
//! # Invariants
//! - `criterions_for` only offers active criteria of the requested type.

use crate::model::criterion::{Criterion, CriterionType, CriterionTypeId};
use crate::model::order_element::{OrderElement, OrderElementId};
use crate::repo::criterion_repo::{CriterionRepoError, CriterionRepository};
use crate::repo::order_repo::{OrderRepoError, OrderRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What the editor reads and mutates.
pub trait OrderElementModel {
    fn order_element(&self) -> &OrderElement;
    fn order_element_mut(&mut self) -> &mut OrderElement;
    /// Every known criterion type, in catalog order.
    fn criterion_types(&self) -> Vec<CriterionType>;
    fn criterion_type(&self, id: CriterionTypeId) -> Option<CriterionType>;
    fn criterion_type_by_name(&self, name: &str) -> Option<CriterionType>;
    fn criterions_for(&self, criterion_type: &CriterionType) -> Vec<Criterion>;
}

/// In-memory snapshot of criterion types and their criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionCatalog {
    types: Vec<CriterionType>,
    criteria: Vec<Criterion>,
}

impl CriterionCatalog {
    pub fn new(types: Vec<CriterionType>, criteria: Vec<Criterion>) -> Self {
        Self { types, criteria }
    }

    pub fn load<R: CriterionRepository>(repo: &R) -> Result<Self, CriterionRepoError> {
        let types = repo.list_criterion_types()?;
        let mut criteria = Vec::new();
        for criterion_type in &types {
            criteria.extend(repo.criteria_for_type(criterion_type.id)?);
        }
        Ok(Self { types, criteria })
    }

    pub fn types(&self) -> &[CriterionType] {
        &self.types
    }
}

/// `OrderElementModel` over an owned element and a criterion catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogOrderElementModel {
    element: OrderElement,
    catalog: CriterionCatalog,
}

impl CatalogOrderElementModel {
    pub fn new(element: OrderElement, catalog: CriterionCatalog) -> Self {
        Self { element, catalog }
    }

    pub fn into_order_element(self) -> OrderElement {
        self.element
    }
}

impl OrderElementModel for CatalogOrderElementModel {
    fn order_element(&self) -> &OrderElement {
        &self.element
    }

    fn order_element_mut(&mut self) -> &mut OrderElement {
        &mut self.element
    }

    fn criterion_types(&self) -> Vec<CriterionType> {
        self.catalog.types.clone()
    }

    fn criterion_type(&self, id: CriterionTypeId) -> Option<CriterionType> {
        self.catalog.types.iter().find(|ty| ty.id == id).cloned()
    }

    fn criterion_type_by_name(&self, name: &str) -> Option<CriterionType> {
        self.catalog.types.iter().find(|ty| ty.name == name).cloned()
    }

    fn criterions_for(&self, criterion_type: &CriterionType) -> Vec<Criterion> {
        self.catalog
            .criteria
            .iter()
            .filter(|criterion| criterion.active && criterion.is_of_type(criterion_type.id))
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub enum ModelLoadError {
    OrderElementNotFound(OrderElementId),
    Order(OrderRepoError),
    Criterion(CriterionRepoError),
}

impl Display for ModelLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderElementNotFound(id) => write!(f, "order element not found: {id}"),
            Self::Order(err) => write!(f, "{err}"),
            Self::Criterion(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::OrderElementNotFound(_) => None,
            Self::Order(err) => Some(err),
            Self::Criterion(err) => Some(err),
        }
    }
}

impl From<OrderRepoError> for ModelLoadError {
    fn from(value: OrderRepoError) -> Self {
        Self::Order(value)
    }
}

impl From<CriterionRepoError> for ModelLoadError {
    fn from(value: CriterionRepoError) -> Self {
        Self::Criterion(value)
    }
}

/// Loads one order element and the full criterion catalog.
pub fn load_model<O: OrderRepository, C: CriterionRepository>(
    orders: &O,
    criteria: &C,
    id: OrderElementId,
) -> Result<CatalogOrderElementModel, ModelLoadError> {
    let element = orders
        .load_order_element(id)?
        .ok_or(ModelLoadError::OrderElementNotFound(id))?;
    let catalog = CriterionCatalog::load(criteria)?;
    Ok(CatalogOrderElementModel::new(element, catalog))
}
