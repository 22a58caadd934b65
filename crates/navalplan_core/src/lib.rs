//! Core domain logic for NavalPlan order planning.
//! This crate is the single source of truth for planning invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::criterion::{Criterion, CriterionId, CriterionType, CriterionTypeId};
pub use model::hours_group::{HoursGroup, HoursGroupId, HoursGroupPolicy};
pub use model::label_type::{LabelType, LabelTypeId, LabelTypeValidationError};
pub use model::order_element::{
    OrderElement, OrderElementError, OrderElementId, OrderLine, OrderLineGroup,
};
pub use repo::criterion_repo::{
    CriterionRepoError, CriterionRepoResult, CriterionRepository, SqliteCriterionRepository,
};
pub use repo::label_type_repo::{
    LabelTypeRepoError, LabelTypeRepoResult, LabelTypeRepository, SqliteLabelTypeRepository,
};
pub use repo::order_repo::{
    OrderElementSummary, OrderRepoError, OrderRepoResult, OrderRepository, SqliteOrderRepository,
};
pub use service::label_type_service::{LabelTypeService, LabelTypeServiceError};
pub use service::order_element_editor::{
    EditorError, HoursGroupRow, HoursGroupTable, OrderElementEditor, PopupState,
};
pub use service::order_element_model::{
    load_model, CatalogOrderElementModel, CriterionCatalog, ModelLoadError, OrderElementModel,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
