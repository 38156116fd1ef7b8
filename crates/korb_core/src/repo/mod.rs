//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories only operate on migrated connections (`try_new` verifies
//!   schema readiness).
//! - Soft-deleted rows are invisible to every read unless an operation says
//!   otherwise.
//! - Missing rows are data, not errors: reads return `Option`/empty vectors,
//!   mutations return `false`/`0`.

pub mod base;
pub mod item_repo;
pub mod list_repo;
pub mod recipe_repo;
