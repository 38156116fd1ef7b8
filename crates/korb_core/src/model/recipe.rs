//! Recipe domain model.
//!
//! # Responsibility
//! - Define the `Recipe` aggregate root and its owned ingredient lines.
//!
//! # Invariants
//! - A persisted recipe has at least one ingredient (service-enforced).
//! - `servings` is positive; `rating` is within 1..=5 when present.
//! - Ingredients are ordered by `position` and replaced wholesale on
//!   update, never diffed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::units::{Category, Unit};

/// Stable identifier of a recipe.
pub type RecipeId = Uuid;

/// Stable identifier of one ingredient line. Regenerated whenever a
/// recipe's ingredient set is replaced.
pub type IngredientId = Uuid;

/// Effort classification shown in the recipe overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Returns the wire/storage string for this difficulty.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses an exact wire/storage string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A dish definition with its ordered ingredient lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: Option<String>,
    /// Number of servings the ingredient quantities refer to.
    pub servings: i64,
    /// Preparation time in minutes.
    pub prep_time: Option<i64>,
    /// Cooking time in minutes.
    pub cook_time: Option<i64>,
    pub difficulty: Difficulty,
    pub instructions: String,
    /// Free-form tags, persisted as a JSON array in one TEXT column.
    pub tags: Vec<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorite: bool,
    /// User rating 1..=5.
    pub rating: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// One ingredient line within a recipe.
///
/// Carries no timestamps; lines live and die with their recipe's
/// ingredient set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub recipe_id: RecipeId,
    pub name: String,
    pub quantity: String,
    pub unit: Unit,
    pub category: Category,
    /// Optional ingredients are skipped when pushing a recipe onto a
    /// shopping list.
    pub is_optional: bool,
    pub notes: Option<String>,
    /// Display/serialization order, the array index at write time.
    pub position: i64,
}
