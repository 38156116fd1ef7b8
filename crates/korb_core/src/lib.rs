//! Core domain logic for Korb: shopping lists, recipes and their shared
//! SQLite persistence. This crate is the single source of truth for
//! business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::migrations::{apply_migrations, latest_version};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::list::{ItemId, List, ListId, ListItem};
pub use model::recipe::{Difficulty, IngredientId, Recipe, RecipeId, RecipeIngredient};
pub use model::units::{Category, Unit};
pub use repo::base::{DeleteMode, FindOptions, ListOrder, RepoError, RepoResult};
pub use repo::item_repo::{
    ItemSort, ListItemPatch, ListItemRepository, NewListItem, SqliteListItemRepository,
};
pub use repo::list_repo::{
    ListPatch, ListRepository, ListWithLiveCounts, NewList, SqliteListRepository,
};
pub use repo::recipe_repo::{
    NewIngredient, NewRecipe, RecipePatch, RecipeRepository, SqliteRecipeRepository,
};
pub use service::item_service::{ItemService, ItemServiceError, ItemUpdate, NewItemInput};
pub use service::list_service::{ListService, ListServiceError, ListUpdate};
pub use service::recipe_service::{RecipeService, RecipeServiceError, RecipeUpdate};
pub use service::transfer_service::{
    parse_envelope, render_export, ExportEnvelope, ImportOutcome, ImportReport, IngredientExport,
    ItemExport, ListExport, RecipeExport, TransferError, TransferService, EXPORT_VERSION,
};

/// Liveness probe for bridge integration checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Core crate version, shown in the app's diagnostics screen.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_answers_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn core_version_matches_the_package_version() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }
}
