//! Planning domain model.
//!
//! # Responsibility
//! - Define label types, criteria and the order element hierarchy.
//! - Keep hours/percentage reconciliation rules next to the data they guard.
//!
//! # Invariants
//! - Every record is identified by a stable `Uuid`.
//! - Hours groups only live on leaf order elements (`OrderLine`).

pub mod criterion;
pub mod hours_group;
pub mod label_type;
pub mod order_element;
