//! Domain service layer orchestrating validation and repositories.
//!
//! # Responsibility
//! - Validate and normalize caller input before persistence.
//! - Orchestrate cross-entity flows: cascades, duplication, recipe-to-list
//!   transfer, import/export.
//!
//! # Invariants
//! - Validation failures surface before any write happens.
//! - Services reach storage through the repository traits only.

pub mod item_service;
pub mod list_service;
pub mod recipe_service;
pub mod transfer_service;
