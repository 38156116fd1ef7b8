//! Recipe repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for `recipes` and their owned ingredients.
//! - Keep the recipe row and its ingredient set consistent through
//!   transactional writes.
//!
//! # Invariants
//! - A recipe and its ingredients commit together or not at all; updates
//!   that carry ingredients replace the whole set with fresh ids.
//! - Ingredient hydration is batched per read, never one query per recipe.
//! - `tags` persists as a JSON array in a TEXT column.

use crate::model::recipe::{Difficulty, Recipe, RecipeId, RecipeIngredient};
use crate::model::units::{Category, Unit};
use crate::repo::base::{
    bool_to_int, ensure_schema_current, ensure_table, int_to_bool, new_entity_id, now_utc,
    parse_uuid, DeleteMode, FindOptions, ListOrder, RepoError, RepoResult, TableMapping,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::HashMap;

const RECIPE_COLUMNS: &str = "id, name, description, servings, prep_time, cook_time, \
     difficulty, instructions, tags, is_favorite, rating, created_at, updated_at";

const INGREDIENT_COLUMNS: &str =
    "id, recipe_id, name, quantity, unit, category, is_optional, notes, position";

const RECIPE_MAPPING: TableMapping<Recipe> = TableMapping {
    table: "recipes",
    select_columns: RECIPE_COLUMNS,
    parse_row: parse_recipe_row,
};

/// Input for a single ingredient row. Position comes from array order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub quantity: String,
    pub unit: Unit,
    pub category: Category,
    pub is_optional: bool,
    pub notes: Option<String>,
}

/// Input for recipe creation. Validation happens in the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub servings: i64,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub difficulty: Difficulty,
    pub instructions: String,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub rating: Option<i64>,
    pub ingredients: Vec<NewIngredient>,
}

/// Typed partial update for one recipe.
///
/// A present `ingredients` field replaces the whole ingredient set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub servings: Option<i64>,
    pub prep_time: Option<Option<i64>>,
    pub cook_time: Option<Option<i64>>,
    pub difficulty: Option<Difficulty>,
    pub instructions: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub rating: Option<Option<i64>>,
    pub ingredients: Option<Vec<NewIngredient>>,
}

impl RecipePatch {
    /// True when the patch carries no column at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.servings.is_none()
            && self.prep_time.is_none()
            && self.cook_time.is_none()
            && self.difficulty.is_none()
            && self.instructions.is_none()
            && self.tags.is_none()
            && self.is_favorite.is_none()
            && self.rating.is_none()
            && self.ingredients.is_none()
    }
}

/// Repository interface for recipe operations.
pub trait RecipeRepository {
    /// Creates one recipe with its ingredients in one transaction.
    fn create(&self, recipe: &NewRecipe) -> RepoResult<Recipe>;
    /// Loads one live recipe with its ingredients.
    fn get_with_ingredients(&self, id: RecipeId) -> RepoResult<Option<Recipe>>;
    /// Lists live recipes, most recently updated first, hydrated.
    fn get_all_with_ingredients(&self) -> RepoResult<Vec<Recipe>>;
    /// Lists live favorite recipes, most recently updated first.
    fn find_favorites(&self) -> RepoResult<Vec<Recipe>>;
    /// Case-insensitive substring search over recipe names.
    fn search_by_name(&self, query: &str) -> RepoResult<Vec<Recipe>>;
    /// Applies a partial update. Returns `false` for empty patches and
    /// missing rows.
    fn update(&self, id: RecipeId, patch: &RecipePatch) -> RepoResult<bool>;
    /// Flips the favorite flag on one recipe.
    fn toggle_favorite(&self, id: RecipeId) -> RepoResult<bool>;
    /// Sets the rating on one recipe. Range checks happen in the service.
    fn set_rating(&self, id: RecipeId, rating: i64) -> RepoResult<bool>;
    /// Deletes one recipe in the requested mode.
    fn delete(&self, id: RecipeId, mode: DeleteMode) -> RepoResult<bool>;
    /// Clears the soft-delete marker on one recipe.
    fn restore(&self, id: RecipeId) -> RepoResult<bool>;
}

/// SQLite-backed recipe repository.
pub struct SqliteRecipeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecipeRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table(
            conn,
            "recipes",
            &[
                "id",
                "name",
                "description",
                "servings",
                "prep_time",
                "cook_time",
                "difficulty",
                "instructions",
                "tags",
                "is_favorite",
                "rating",
                "created_at",
                "updated_at",
                "deleted_at",
            ],
        )?;
        ensure_table(
            conn,
            "recipe_ingredients",
            &[
                "id",
                "recipe_id",
                "name",
                "quantity",
                "unit",
                "category",
                "is_optional",
                "notes",
                "position",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl RecipeRepository for SqliteRecipeRepository<'_> {
    fn create(&self, recipe: &NewRecipe) -> RepoResult<Recipe> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let recipe_id = new_entity_id();
        let now = now_utc();
        tx.execute(
            "INSERT INTO recipes (
                id,
                name,
                description,
                servings,
                prep_time,
                cook_time,
                difficulty,
                instructions,
                tags,
                is_favorite,
                rating,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                recipe_id.to_string(),
                recipe.name,
                recipe.description,
                recipe.servings,
                recipe.prep_time,
                recipe.cook_time,
                recipe.difficulty.as_str(),
                recipe.instructions,
                tags_to_db(&recipe.tags)?,
                bool_to_int(recipe.is_favorite),
                recipe.rating,
                now,
                now,
            ],
        )?;
        let ingredients = insert_ingredients(&tx, recipe_id, &recipe.ingredients)?;
        tx.commit()?;

        Ok(Recipe {
            id: recipe_id,
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            servings: recipe.servings,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            difficulty: recipe.difficulty,
            instructions: recipe.instructions.clone(),
            tags: recipe.tags.clone(),
            ingredients,
            is_favorite: recipe.is_favorite,
            rating: recipe.rating,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    fn get_with_ingredients(&self, id: RecipeId) -> RepoResult<Option<Recipe>> {
        let Some(recipe) = RECIPE_MAPPING.find_by_id(self.conn, id)? else {
            return Ok(None);
        };
        let mut hydrated = hydrate(self.conn, vec![recipe])?;
        Ok(hydrated.pop())
    }

    fn get_all_with_ingredients(&self) -> RepoResult<Vec<Recipe>> {
        let recipes = RECIPE_MAPPING.find_all(
            self.conn,
            &FindOptions {
                order: ListOrder::UpdatedDesc,
                ..FindOptions::default()
            },
        )?;
        hydrate(self.conn, recipes)
    }

    fn find_favorites(&self) -> RepoResult<Vec<Recipe>> {
        let sql = format!(
            "SELECT {RECIPE_COLUMNS}
             FROM recipes
             WHERE deleted_at IS NULL
               AND is_favorite = 1
             ORDER BY updated_at DESC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut recipes = Vec::new();
        while let Some(row) = rows.next()? {
            recipes.push(parse_recipe_row(row)?);
        }
        hydrate(self.conn, recipes)
    }

    fn search_by_name(&self, query: &str) -> RepoResult<Vec<Recipe>> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            "SELECT {RECIPE_COLUMNS}
             FROM recipes
             WHERE deleted_at IS NULL
               AND name LIKE ?1 ESCAPE '\\'
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([pattern])?;
        let mut recipes = Vec::new();
        while let Some(row) = rows.next()? {
            recipes.push(parse_recipe_row(row)?);
        }
        hydrate(self.conn, recipes)
    }

    fn update(&self, id: RecipeId, patch: &RecipePatch) -> RepoResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = patch.name.as_ref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(description) = patch.description.as_ref() {
            assignments.push("description = ?");
            bind_values.push(nullable_text(description));
        }
        if let Some(servings) = patch.servings {
            assignments.push("servings = ?");
            bind_values.push(Value::Integer(servings));
        }
        if let Some(prep_time) = patch.prep_time.as_ref() {
            assignments.push("prep_time = ?");
            bind_values.push(nullable_integer(prep_time));
        }
        if let Some(cook_time) = patch.cook_time.as_ref() {
            assignments.push("cook_time = ?");
            bind_values.push(nullable_integer(cook_time));
        }
        if let Some(difficulty) = patch.difficulty {
            assignments.push("difficulty = ?");
            bind_values.push(Value::Text(difficulty.as_str().to_string()));
        }
        if let Some(instructions) = patch.instructions.as_ref() {
            assignments.push("instructions = ?");
            bind_values.push(Value::Text(instructions.clone()));
        }
        if let Some(tags) = patch.tags.as_ref() {
            assignments.push("tags = ?");
            bind_values.push(Value::Text(tags_to_db(tags)?));
        }
        if let Some(is_favorite) = patch.is_favorite {
            assignments.push("is_favorite = ?");
            bind_values.push(Value::Integer(bool_to_int(is_favorite)));
        }
        if let Some(rating) = patch.rating.as_ref() {
            assignments.push("rating = ?");
            bind_values.push(nullable_integer(rating));
        }
        assignments.push("updated_at = ?");
        bind_values.push(Value::Text(now_utc()));

        let sql = format!(
            "UPDATE recipes
             SET {assignments}
             WHERE id = ?
               AND deleted_at IS NULL;",
            assignments = assignments.join(", "),
        );
        bind_values.push(Value::Text(id.to_string()));
        let changed = tx.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Ok(false);
        }

        if let Some(ingredients) = patch.ingredients.as_ref() {
            tx.execute(
                "DELETE FROM recipe_ingredients WHERE recipe_id = ?1;",
                [id.to_string()],
            )?;
            insert_ingredients(&tx, id, ingredients)?;
        }

        tx.commit()?;
        Ok(true)
    }

    fn toggle_favorite(&self, id: RecipeId) -> RepoResult<bool> {
        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT is_favorite
                 FROM recipes
                 WHERE id = ?1
                   AND deleted_at IS NULL;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(flag) = current else {
            return Ok(false);
        };
        let next_flag = !int_to_bool(flag, "recipes.is_favorite")?;

        self.conn.execute(
            "UPDATE recipes
             SET is_favorite = ?2,
                 updated_at = ?3
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), bool_to_int(next_flag), now_utc()],
        )?;
        Ok(true)
    }

    fn set_rating(&self, id: RecipeId, rating: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE recipes
             SET rating = ?2,
                 updated_at = ?3
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), rating, now_utc()],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: RecipeId, mode: DeleteMode) -> RepoResult<bool> {
        RECIPE_MAPPING.delete(self.conn, id, mode)
    }

    fn restore(&self, id: RecipeId) -> RepoResult<bool> {
        RECIPE_MAPPING.restore(self.conn, id)
    }
}

fn insert_ingredients(
    conn: &Connection,
    recipe_id: RecipeId,
    ingredients: &[NewIngredient],
) -> RepoResult<Vec<RecipeIngredient>> {
    let mut created = Vec::with_capacity(ingredients.len());
    for (index, ingredient) in ingredients.iter().enumerate() {
        let row = RecipeIngredient {
            id: new_entity_id(),
            recipe_id,
            name: ingredient.name.clone(),
            quantity: ingredient.quantity.clone(),
            unit: ingredient.unit,
            category: ingredient.category,
            is_optional: ingredient.is_optional,
            notes: ingredient.notes.clone(),
            position: index as i64,
        };
        conn.execute(
            "INSERT INTO recipe_ingredients (
                id,
                recipe_id,
                name,
                quantity,
                unit,
                category,
                is_optional,
                notes,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                row.id.to_string(),
                row.recipe_id.to_string(),
                row.name,
                row.quantity,
                row.unit.as_str(),
                row.category.as_str(),
                bool_to_int(row.is_optional),
                row.notes,
                row.position,
            ],
        )?;
        created.push(row);
    }
    Ok(created)
}

/// Attaches ingredients to the given recipes with one batched query.
fn hydrate(conn: &Connection, mut recipes: Vec<Recipe>) -> RepoResult<Vec<Recipe>> {
    if recipes.is_empty() {
        return Ok(recipes);
    }

    let ids: Vec<RecipeId> = recipes.iter().map(|recipe| recipe.id).collect();
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {INGREDIENT_COLUMNS}
         FROM recipe_ingredients
         WHERE recipe_id IN ({placeholders})
         ORDER BY recipe_id ASC, position ASC;"
    );
    let bind_values: Vec<Value> = ids.iter().map(|id| Value::Text(id.to_string())).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut grouped: HashMap<RecipeId, Vec<RecipeIngredient>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let ingredient = parse_ingredient_row(row)?;
        grouped
            .entry(ingredient.recipe_id)
            .or_default()
            .push(ingredient);
    }

    for recipe in &mut recipes {
        recipe.ingredients = grouped.remove(&recipe.id).unwrap_or_default();
    }
    Ok(recipes)
}

/// Escapes LIKE wildcards so user text matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn tags_to_db(tags: &[String]) -> RepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| RepoError::InvalidData(format!("unserializable tags: {err}")))
}

fn parse_tags(value: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid tags json `{value}` in recipes.tags"))
    })
}

fn nullable_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn nullable_integer(value: &Option<i64>) -> Value {
    match value {
        Some(number) => Value::Integer(*number),
        None => Value::Null,
    }
}

fn parse_recipe_row(row: &Row<'_>) -> RepoResult<Recipe> {
    let id_text: String = row.get("id")?;
    let difficulty_text: String = row.get("difficulty")?;
    let difficulty = Difficulty::parse(&difficulty_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid difficulty `{difficulty_text}` in recipes.difficulty"
        ))
    })?;
    let tags_text: String = row.get("tags")?;

    Ok(Recipe {
        id: parse_uuid(&id_text, "recipes.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        servings: row.get("servings")?,
        prep_time: row.get("prep_time")?,
        cook_time: row.get("cook_time")?,
        difficulty,
        instructions: row.get("instructions")?,
        tags: parse_tags(&tags_text)?,
        ingredients: Vec::new(),
        is_favorite: int_to_bool(row.get("is_favorite")?, "recipes.is_favorite")?,
        rating: row.get("rating")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_ingredient_row(row: &Row<'_>) -> RepoResult<RecipeIngredient> {
    let id_text: String = row.get("id")?;
    let recipe_id_text: String = row.get("recipe_id")?;
    let unit_text: String = row.get("unit")?;
    let unit = Unit::parse(&unit_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid unit `{unit_text}` in recipe_ingredients.unit"
        ))
    })?;
    let category_text: String = row.get("category")?;
    let category = Category::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in recipe_ingredients.category"
        ))
    })?;

    Ok(RecipeIngredient {
        id: parse_uuid(&id_text, "recipe_ingredients.id")?,
        recipe_id: parse_uuid(&recipe_id_text, "recipe_ingredients.recipe_id")?,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        unit,
        category,
        is_optional: int_to_bool(row.get("is_optional")?, "recipe_ingredients.is_optional")?,
        notes: row.get("notes")?,
        position: row.get("position")?,
    })
}
