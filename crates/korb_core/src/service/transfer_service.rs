//! JSON import and export of lists and recipes.
//!
//! # Responsibility
//! - Render lists and recipes into a versioned, camelCase JSON envelope.
//! - Parse such envelopes leniently and import their entries through the
//!   regular service validation.
//! - Report per-entity import outcomes instead of failing the whole
//!   document.
//!
//! # Invariants
//! - Imported entities get fresh ids; item checked state resets.
//! - A failed entry never aborts the remaining entries.
//! - An envelope without `version` or `exportedAt` is rejected before any
//!   write happens.

use crate::model::list::{List, ListId, ListItem};
use crate::model::recipe::{Difficulty, Recipe, RecipeId};
use crate::model::units::{Category, Unit};
use crate::repo::base::{now_utc, RepoError};
use crate::repo::item_repo::{ItemSort, ListItemRepository};
use crate::repo::list_repo::ListRepository;
use crate::repo::recipe_repo::{NewIngredient, NewRecipe, RecipeRepository};
use crate::service::item_service::{ItemService, NewItemInput};
use crate::service::list_service::{ListService, ListServiceError};
use crate::service::recipe_service::{RecipeService, RecipeServiceError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Version stamp written into every export envelope.
pub const EXPORT_VERSION: &str = "1.0.0";

/// Service error for import/export use-cases.
#[derive(Debug)]
pub enum TransferError {
    /// Export target list does not exist.
    ListNotFound(ListId),
    /// Export target recipe does not exist.
    RecipeNotFound(RecipeId),
    /// Envelope is structurally valid JSON but not an export document.
    InvalidFormat(&'static str),
    /// JSON (de)serialization failure.
    Json(serde_json::Error),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::RecipeNotFound(id) => write!(f, "recipe not found: {id}"),
            Self::InvalidFormat(details) => write!(f, "invalid export format: {details}"),
            Self::Json(err) => write!(f, "export json error: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<RepoError> for TransferError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Top-level export document.
///
/// Every field is lenient on the way in; `version` and `exportedAt` are
/// checked by [`parse_envelope`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub exported_at: String,
    #[serde(default)]
    pub lists: Vec<ListExport>,
    #[serde(default)]
    pub recipes: Vec<RecipeExport>,
}

/// One shopping list in an export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExport {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemExport>,
}

/// One list item in an export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemExport {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: String,
    #[serde(default = "default_unit")]
    pub unit: Unit,
    #[serde(default = "default_category")]
    pub category: Category,
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One recipe in an export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeExport {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_servings")]
    pub servings: i64,
    #[serde(default)]
    pub prep_time: Option<i64>,
    #[serde(default)]
    pub cook_time: Option<i64>,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub ingredients: Vec<IngredientExport>,
}

/// One recipe ingredient in an export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientExport {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: String,
    #[serde(default = "default_unit")]
    pub unit: Unit,
    #[serde(default = "default_category")]
    pub category: Category,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of importing one list or recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Entry landed under a fresh id.
    Created { id: Uuid, name: String },
    /// Entry was rejected; the rest of the document still imported.
    Failed { name: String, reason: String },
}

impl ImportOutcome {
    /// True for successfully created entries.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Per-entity outcomes of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub lists: Vec<ImportOutcome>,
    pub recipes: Vec<ImportOutcome>,
}

impl ImportReport {
    /// Number of lists that imported successfully.
    pub fn lists_imported(&self) -> usize {
        self.lists.iter().filter(|o| o.is_created()).count()
    }

    /// Number of recipes that imported successfully.
    pub fn recipes_imported(&self) -> usize {
        self.recipes.iter().filter(|o| o.is_created()).count()
    }

    /// Human-readable messages for every failed entry.
    pub fn failure_messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        for outcome in &self.lists {
            if let ImportOutcome::Failed { name, reason } = outcome {
                messages.push(format!("failed to import list {name:?}: {reason}"));
            }
        }
        for outcome in &self.recipes {
            if let ImportOutcome::Failed { name, reason } = outcome {
                messages.push(format!("failed to import recipe {name:?}: {reason}"));
            }
        }
        messages
    }
}

/// Import/export facade composed from the entity services.
pub struct TransferService<L, I, R>
where
    L: ListRepository,
    I: ListItemRepository,
    R: RecipeRepository,
{
    lists: ListService<L, I>,
    items: ItemService<I>,
    recipes: RecipeService<R, L, I>,
}

impl<L, I, R> TransferService<L, I, R>
where
    L: ListRepository,
    I: ListItemRepository,
    R: RecipeRepository,
{
    /// Creates a transfer service on top of the entity services.
    pub fn new(
        lists: ListService<L, I>,
        items: ItemService<I>,
        recipes: RecipeService<R, L, I>,
    ) -> Self {
        Self {
            lists,
            items,
            recipes,
        }
    }

    /// Exports every live list and recipe into one envelope.
    pub fn export_all(&self) -> Result<ExportEnvelope, TransferError> {
        let mut lists = Vec::new();
        for list in self.lists.get_all_lists()? {
            let items = self.items.items_of_list(list.id, ItemSort::Position)?;
            lists.push(list_to_export(&list, &items));
        }
        let recipes = self
            .recipes
            .get_all_recipes()?
            .iter()
            .map(recipe_to_export)
            .collect();
        Ok(envelope(lists, recipes))
    }

    /// Exports one list; the recipe section stays empty.
    pub fn export_list(&self, id: ListId) -> Result<ExportEnvelope, TransferError> {
        let list = self
            .lists
            .get_list(id)?
            .ok_or(TransferError::ListNotFound(id))?;
        let items = self.items.items_of_list(list.id, ItemSort::Position)?;
        Ok(envelope(vec![list_to_export(&list, &items)], Vec::new()))
    }

    /// Exports one recipe; the list section stays empty.
    pub fn export_recipe(&self, id: RecipeId) -> Result<ExportEnvelope, TransferError> {
        let recipe = self
            .recipes
            .get_recipe(id)?
            .ok_or(TransferError::RecipeNotFound(id))?;
        Ok(envelope(Vec::new(), vec![recipe_to_export(&recipe)]))
    }

    /// Imports every entry of an envelope best-effort and reports the
    /// per-entity outcomes.
    pub fn import(&self, envelope: &ExportEnvelope) -> ImportReport {
        let mut report = ImportReport::default();
        for list_export in &envelope.lists {
            match self.import_list(list_export) {
                Ok(list) => report.lists.push(ImportOutcome::Created {
                    id: list.id,
                    name: list.name,
                }),
                Err(err) => {
                    warn!(
                        "event=import_list_failed module=transfer_service name={:?} error={}",
                        list_export.name, err
                    );
                    report.lists.push(ImportOutcome::Failed {
                        name: list_export.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        for recipe_export in &envelope.recipes {
            match self.import_recipe(recipe_export) {
                Ok(recipe) => report.recipes.push(ImportOutcome::Created {
                    id: recipe.id,
                    name: recipe.name,
                }),
                Err(err) => {
                    warn!(
                        "event=import_recipe_failed module=transfer_service name={:?} error={}",
                        recipe_export.name, err
                    );
                    report.recipes.push(ImportOutcome::Failed {
                        name: recipe_export.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Parses an envelope from JSON and imports it.
    pub fn import_json(&self, input: &str) -> Result<ImportReport, TransferError> {
        let envelope = parse_envelope(input)?;
        Ok(self.import(&envelope))
    }

    fn import_list(&self, export: &ListExport) -> Result<List, ListServiceError> {
        let list = self
            .lists
            .create_list(export.name.clone(), export.description.clone())?;
        let inputs: Vec<NewItemInput> = export.items.iter().map(item_input).collect();
        self.items.add_many_items(list.id, &inputs);
        Ok(list)
    }

    fn import_recipe(&self, export: &RecipeExport) -> Result<Recipe, RecipeServiceError> {
        self.recipes.create_recipe(recipe_input(export))
    }
}

/// Renders an envelope as pretty-printed JSON.
pub fn render_export(envelope: &ExportEnvelope) -> Result<String, TransferError> {
    Ok(serde_json::to_string_pretty(envelope)?)
}

/// Parses and checks an export envelope without touching the database.
pub fn parse_envelope(input: &str) -> Result<ExportEnvelope, TransferError> {
    let envelope: ExportEnvelope = serde_json::from_str(input)?;
    if envelope.version.is_empty() {
        return Err(TransferError::InvalidFormat("missing version"));
    }
    if envelope.exported_at.is_empty() {
        return Err(TransferError::InvalidFormat("missing exportedAt"));
    }
    Ok(envelope)
}

fn envelope(lists: Vec<ListExport>, recipes: Vec<RecipeExport>) -> ExportEnvelope {
    ExportEnvelope {
        version: EXPORT_VERSION.to_string(),
        exported_at: now_utc(),
        lists,
        recipes,
    }
}

fn list_to_export(list: &List, items: &[ListItem]) -> ListExport {
    ListExport {
        name: list.name.clone(),
        description: list.description.clone(),
        items: items
            .iter()
            .map(|item| ItemExport {
                name: item.name.clone(),
                quantity: item.quantity.clone(),
                unit: item.unit,
                category: item.category,
                is_checked: item.is_checked,
                notes: item.notes.clone(),
            })
            .collect(),
    }
}

fn recipe_to_export(recipe: &Recipe) -> RecipeExport {
    RecipeExport {
        name: recipe.name.clone(),
        description: recipe.description.clone(),
        servings: recipe.servings,
        prep_time: recipe.prep_time,
        cook_time: recipe.cook_time,
        difficulty: recipe.difficulty,
        instructions: recipe.instructions.clone(),
        tags: recipe.tags.clone(),
        is_favorite: recipe.is_favorite,
        rating: recipe.rating,
        ingredients: recipe
            .ingredients
            .iter()
            .map(|ingredient| IngredientExport {
                name: ingredient.name.clone(),
                quantity: ingredient.quantity.clone(),
                unit: ingredient.unit,
                category: ingredient.category,
                is_optional: ingredient.is_optional,
                notes: ingredient.notes.clone(),
            })
            .collect(),
    }
}

/// Checked state deliberately resets on the way in.
fn item_input(export: &ItemExport) -> NewItemInput {
    NewItemInput {
        name: export.name.clone(),
        quantity: Some(export.quantity.clone()),
        unit: Some(export.unit),
        category: Some(export.category),
        notes: export.notes.clone(),
    }
}

fn recipe_input(export: &RecipeExport) -> NewRecipe {
    NewRecipe {
        name: export.name.clone(),
        description: export.description.clone(),
        servings: export.servings,
        prep_time: export.prep_time,
        cook_time: export.cook_time,
        difficulty: export.difficulty,
        instructions: export.instructions.clone(),
        tags: export.tags.clone(),
        is_favorite: export.is_favorite,
        rating: export.rating,
        ingredients: export
            .ingredients
            .iter()
            .map(|ingredient| NewIngredient {
                name: ingredient.name.clone(),
                quantity: ingredient.quantity.clone(),
                unit: ingredient.unit,
                category: ingredient.category,
                is_optional: ingredient.is_optional,
                notes: ingredient.notes.clone(),
            })
            .collect(),
    }
}

fn default_quantity() -> String {
    "1".to_string()
}

fn default_unit() -> Unit {
    Unit::Piece
}

fn default_category() -> Category {
    Category::Grains
}

fn default_servings() -> i64 {
    4
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

#[cfg(test)]
mod tests {
    use super::{parse_envelope, render_export, ExportEnvelope, TransferError, EXPORT_VERSION};
    use crate::model::units::{Category, Unit};

    #[test]
    fn envelope_without_version_is_rejected() {
        let err = parse_envelope(r#"{"exportedAt": "2024-06-01T10:00:00.000Z"}"#).unwrap_err();
        assert!(matches!(err, TransferError::InvalidFormat("missing version")));
    }

    #[test]
    fn envelope_without_export_timestamp_is_rejected() {
        let err = parse_envelope(r#"{"version": "1.0.0"}"#).unwrap_err();
        assert!(matches!(
            err,
            TransferError::InvalidFormat("missing exportedAt")
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_envelope("{not json").unwrap_err();
        assert!(matches!(err, TransferError::Json(_)));
    }

    #[test]
    fn missing_item_fields_take_defaults() {
        let input = r#"{
            "version": "1.0.0",
            "exportedAt": "2024-06-01T10:00:00.000Z",
            "lists": [{"name": "Einkauf", "items": [{"name": "Milch"}]}]
        }"#;
        let envelope = parse_envelope(input).unwrap();
        let item = &envelope.lists[0].items[0];
        assert_eq!(item.quantity, "1");
        assert_eq!(item.unit, Unit::Piece);
        assert_eq!(item.category, Category::Grains);
        assert!(!item.is_checked);
    }

    #[test]
    fn rendered_envelope_round_trips_with_camel_case_keys() {
        let envelope = ExportEnvelope {
            version: EXPORT_VERSION.to_string(),
            exported_at: "2024-06-01T10:00:00.000Z".to_string(),
            lists: Vec::new(),
            recipes: Vec::new(),
        };
        let json = render_export(&envelope).unwrap();
        assert!(json.contains("\"exportedAt\""));
        assert_eq!(parse_envelope(&json).unwrap(), envelope);
    }
}
