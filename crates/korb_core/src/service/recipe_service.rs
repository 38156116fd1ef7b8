//! Recipe use-case service.
//!
//! # Responsibility
//! - Validate recipe input (name, ingredient presence, servings, rating).
//! - Scale ingredient quantities for a different serving count.
//! - Transfer recipe ingredients onto a shopping list.
//!
//! # Invariants
//! - Every stored recipe has a non-blank name, at least one ingredient
//!   and a positive serving count.
//! - Ratings stay within 1..=5.
//! - Scaling never writes; the scaled recipe is a derived value.
//! - Ingredient transfer skips optional ingredients and stamps each item
//!   with the source recipe name.

use crate::model::list::{ListId, ListItem};
use crate::model::recipe::{Difficulty, Recipe, RecipeId};
use crate::repo::base::{DeleteMode, RepoError, RepoResult};
use crate::repo::item_repo::{ListItemRepository, NewListItem};
use crate::repo::list_repo::ListRepository;
use crate::repo::recipe_repo::{NewIngredient, NewRecipe, RecipePatch, RecipeRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for recipe use-cases.
#[derive(Debug)]
pub enum RecipeServiceError {
    /// Recipe name is blank after trim.
    InvalidName,
    /// Recipe would end up without ingredients.
    MissingIngredients,
    /// Serving count must be positive.
    InvalidServings(i64),
    /// Rating must sit within 1..=5.
    InvalidRating(i64),
    /// Target recipe does not exist.
    RecipeNotFound(RecipeId),
    /// Target shopping list does not exist.
    ListNotFound(ListId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for RecipeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "recipe name must not be blank"),
            Self::MissingIngredients => {
                write!(f, "recipe must have at least one ingredient")
            }
            Self::InvalidServings(value) => {
                write!(f, "servings must be positive, got {value}")
            }
            Self::InvalidRating(value) => {
                write!(f, "rating must be between 1 and 5, got {value}")
            }
            Self::RecipeNotFound(id) => write!(f, "recipe not found: {id}"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent recipe state: {details}")
            }
        }
    }
}

impl Error for RecipeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RecipeServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Partial recipe update at the service surface.
///
/// A present `description` is trimmed; blank clears the column. A present
/// `ingredients` replaces the whole ingredient set and must not be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub servings: Option<i64>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub instructions: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub rating: Option<i64>,
    pub ingredients: Option<Vec<NewIngredient>>,
}

/// Recipe service facade over the involved repositories.
///
/// The list and item repositories are only touched by the ingredient
/// transfer use-case.
pub struct RecipeService<R, L, I>
where
    R: RecipeRepository,
    L: ListRepository,
    I: ListItemRepository,
{
    recipes: R,
    lists: L,
    items: I,
}

impl<R, L, I> RecipeService<R, L, I>
where
    R: RecipeRepository,
    L: ListRepository,
    I: ListItemRepository,
{
    /// Creates a service using the provided repository implementations.
    pub fn new(recipes: R, lists: L, items: I) -> Self {
        Self {
            recipes,
            lists,
            items,
        }
    }

    /// Creates a recipe after validating the input.
    pub fn create_recipe(&self, input: NewRecipe) -> Result<Recipe, RecipeServiceError> {
        if input.name.trim().is_empty() {
            return Err(RecipeServiceError::InvalidName);
        }
        if input.ingredients.is_empty() {
            return Err(RecipeServiceError::MissingIngredients);
        }
        if input.servings <= 0 {
            return Err(RecipeServiceError::InvalidServings(input.servings));
        }
        if let Some(rating) = input.rating {
            ensure_rating_range(rating)?;
        }

        let mut sanitized = input;
        sanitized.name = sanitized.name.trim().to_string();
        sanitized.description = sanitized.description.and_then(blank_to_none);
        Ok(self.recipes.create(&sanitized)?)
    }

    /// Applies a partial update with re-validation of touched fields.
    pub fn update_recipe(
        &self,
        id: RecipeId,
        update: &RecipeUpdate,
    ) -> Result<Recipe, RecipeServiceError> {
        if let Some(servings) = update.servings {
            if servings <= 0 {
                return Err(RecipeServiceError::InvalidServings(servings));
            }
        }
        if let Some(rating) = update.rating {
            ensure_rating_range(rating)?;
        }
        if let Some(ingredients) = update.ingredients.as_ref() {
            if ingredients.is_empty() {
                return Err(RecipeServiceError::MissingIngredients);
            }
        }

        let patch = RecipePatch {
            name: match update.name.clone() {
                Some(value) => Some(normalize_recipe_name(value)?),
                None => None,
            },
            description: update.description.clone().map(blank_to_none),
            servings: update.servings,
            prep_time: update.prep_time.map(Some),
            cook_time: update.cook_time.map(Some),
            difficulty: update.difficulty,
            instructions: update.instructions.clone(),
            tags: update.tags.clone(),
            is_favorite: update.is_favorite,
            rating: update.rating.map(Some),
            ingredients: update.ingredients.clone(),
        };

        if patch.is_empty() {
            return self.get_required(id);
        }
        if !self.recipes.update(id, &patch)? {
            return Err(RecipeServiceError::RecipeNotFound(id));
        }
        self.recipes
            .get_with_ingredients(id)?
            .ok_or(RecipeServiceError::InconsistentState(
                "updated recipe missing in read-back",
            ))
    }

    /// Loads one recipe with its ingredients.
    pub fn get_recipe(&self, id: RecipeId) -> RepoResult<Option<Recipe>> {
        self.recipes.get_with_ingredients(id)
    }

    /// Lists all live recipes, most recently updated first.
    pub fn get_all_recipes(&self) -> RepoResult<Vec<Recipe>> {
        self.recipes.get_all_with_ingredients()
    }

    /// Lists live favorite recipes.
    pub fn favorite_recipes(&self) -> RepoResult<Vec<Recipe>> {
        self.recipes.find_favorites()
    }

    /// Case-insensitive substring search over recipe names.
    pub fn search_recipes(&self, query: &str) -> RepoResult<Vec<Recipe>> {
        self.recipes.search_by_name(query)
    }

    /// Flips the favorite flag and returns the fresh recipe.
    pub fn toggle_favorite(&self, id: RecipeId) -> Result<Recipe, RecipeServiceError> {
        if !self.recipes.toggle_favorite(id)? {
            return Err(RecipeServiceError::RecipeNotFound(id));
        }
        self.recipes
            .get_with_ingredients(id)?
            .ok_or(RecipeServiceError::InconsistentState(
                "toggled recipe missing in read-back",
            ))
    }

    /// Stores a rating between 1 and 5 and returns the fresh recipe.
    pub fn rate_recipe(&self, id: RecipeId, rating: i64) -> Result<Recipe, RecipeServiceError> {
        ensure_rating_range(rating)?;
        if !self.recipes.set_rating(id, rating)? {
            return Err(RecipeServiceError::RecipeNotFound(id));
        }
        self.recipes
            .get_with_ingredients(id)?
            .ok_or(RecipeServiceError::InconsistentState(
                "rated recipe missing in read-back",
            ))
    }

    /// Deletes one recipe in the requested mode.
    pub fn delete_recipe(&self, id: RecipeId, mode: DeleteMode) -> RepoResult<bool> {
        self.recipes.delete(id, mode)
    }

    /// Clears the soft-delete marker on one recipe.
    pub fn restore_recipe(&self, id: RecipeId) -> RepoResult<bool> {
        self.recipes.restore(id)
    }

    /// Returns the recipe scaled to a different serving count.
    ///
    /// Numeric quantities are multiplied and rendered with at most two
    /// decimals; free-form quantities such as `nach Geschmack` pass
    /// through untouched. Nothing is persisted.
    pub fn scale_recipe(
        &self,
        id: RecipeId,
        target_servings: i64,
    ) -> Result<Recipe, RecipeServiceError> {
        if target_servings <= 0 {
            return Err(RecipeServiceError::InvalidServings(target_servings));
        }
        let mut recipe = self.get_required(id)?;
        let multiplier = target_servings as f64 / recipe.servings as f64;
        for ingredient in &mut recipe.ingredients {
            if let Ok(value) = ingredient.quantity.trim().parse::<f64>() {
                ingredient.quantity = format_scaled_quantity(value * multiplier);
            }
        }
        recipe.servings = target_servings;
        Ok(recipe)
    }

    /// Copies the non-optional ingredients of a recipe onto a shopping
    /// list, scaled by `servings_multiplier`.
    pub fn add_ingredients_to_list(
        &self,
        recipe_id: RecipeId,
        list_id: ListId,
        servings_multiplier: f64,
    ) -> Result<Vec<ListItem>, RecipeServiceError> {
        let recipe = self.get_required(recipe_id)?;
        if self.lists.get(list_id)?.is_none() {
            return Err(RecipeServiceError::ListNotFound(list_id));
        }

        let mut added = Vec::new();
        for ingredient in recipe.ingredients.iter().filter(|i| !i.is_optional) {
            let new_item = NewListItem {
                name: ingredient.name.clone(),
                description: Some(format!("From recipe: {}", recipe.name)),
                quantity: transfer_quantity(&ingredient.quantity, servings_multiplier),
                unit: ingredient.unit,
                category: ingredient.category,
                notes: ingredient.notes.clone(),
                position: None,
            };
            added.push(self.items.create(list_id, &new_item)?);
        }
        Ok(added)
    }

    /// Copies a recipe under a new name with favorite flag and rating
    /// reset.
    pub fn duplicate_recipe(
        &self,
        id: RecipeId,
        new_name: Option<String>,
    ) -> Result<Recipe, RecipeServiceError> {
        let source = self.get_required(id)?;
        let name = match new_name {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => format!("{} (Copy)", source.name),
        };
        let input = NewRecipe {
            name,
            description: source.description.clone(),
            servings: source.servings,
            prep_time: source.prep_time,
            cook_time: source.cook_time,
            difficulty: source.difficulty,
            instructions: source.instructions.clone(),
            tags: source.tags.clone(),
            is_favorite: false,
            rating: None,
            ingredients: source
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
        };
        self.create_recipe(input)
    }

    fn get_required(&self, id: RecipeId) -> Result<Recipe, RecipeServiceError> {
        self.recipes
            .get_with_ingredients(id)?
            .ok_or(RecipeServiceError::RecipeNotFound(id))
    }
}

/// Renders a scaled quantity with at most two decimals and no trailing
/// zeros: `4.00` becomes `4`, `2.50` becomes `2.5`.
fn format_scaled_quantity(value: f64) -> String {
    let rendered = format!("{value:.2}");
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Quantity for an item created from an ingredient. Multiplication only
/// happens for numeric quantities and a multiplier other than one.
fn transfer_quantity(quantity: &str, multiplier: f64) -> String {
    if multiplier != 1.0 {
        if let Ok(value) = quantity.trim().parse::<f64>() {
            return format!("{}", value * multiplier);
        }
    }
    quantity.to_string()
}

fn ensure_rating_range(rating: i64) -> Result<(), RecipeServiceError> {
    if !(1..=5).contains(&rating) {
        return Err(RecipeServiceError::InvalidRating(rating));
    }
    Ok(())
}

fn normalize_recipe_name(value: String) -> Result<String, RecipeServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecipeServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
