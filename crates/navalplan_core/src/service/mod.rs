//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Host the order element editor that UI layers bind to.

pub mod label_type_service;
pub mod order_element_editor;
pub mod order_element_model;
