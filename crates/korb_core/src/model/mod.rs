//! Domain model for shopping lists, list items and recipes.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the enum wire vocabulary (units, categories, difficulty) in one
//!   place, shared by storage and serialization.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Deletion is represented by a `deleted_at` tombstone column; deleted
//!   rows never surface as domain values.

pub mod list;
pub mod recipe;
pub mod units;
