//! List item use-case service.
//!
//! # Responsibility
//! - Validate item input and apply the quantity/unit/category defaults.
//! - Parse free-text input lines into items (`parse_and_add_items`).
//! - Suggest a grocery category from German keyword vocabulary.
//!
//! # Invariants
//! - Item names are trimmed and never blank.
//! - Batch adds are best-effort: a failed line is logged and skipped, the
//!   rest of the batch still lands.
//! - Unparseable lines fall back to quantity `1`, unit `Stück` and the
//!   whole line as the name.

use crate::model::list::{ItemId, ListId, ListItem};
use crate::model::units::{Category, Unit};
use crate::repo::base::{DeleteMode, RepoError, RepoResult};
use crate::repo::item_repo::{ItemSort, ListItemPatch, ListItemRepository, NewListItem};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Matches `<number> <optional unit token> <name>`; the number accepts a
/// dot or comma decimal separator, the unit token accepts umlauts.
static ITEM_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:[.,]\d+)?)\s*([A-Za-zÄÖÜäöüß]+)?\s+(.+)$").expect("valid item line regex")
});

/// Keyword vocabulary for category suggestion, checked in order.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Fruits,
        &["apfel", "birne", "banane", "orange", "beere", "frucht", "obst"],
    ),
    (
        Category::Vegetables,
        &[
            "tomate",
            "gurke",
            "salat",
            "karotte",
            "zwiebel",
            "gemüse",
            "kartoffel",
        ],
    ),
    (
        Category::Meat,
        &["fleisch", "hack", "steak", "schnitzel", "wurst"],
    ),
    (Category::Fish, &["fisch", "lachs", "thunfisch", "forelle"]),
    (
        Category::Dairy,
        &["milch", "joghurt", "quark", "sahne", "butter"],
    ),
    (
        Category::Cheese,
        &["käse", "gouda", "mozzarella", "parmesan"],
    ),
    (
        Category::Grains,
        &["nudel", "reis", "mehl", "brot", "pasta", "getreide"],
    ),
    (
        Category::Beverages,
        &["wasser", "saft", "cola", "getränk", "tee", "kaffee"],
    ),
    (
        Category::Cleaning,
        &["reiniger", "putzmittel", "seife", "waschmittel"],
    ),
    (
        Category::PersonalCare,
        &["shampoo", "duschgel", "zahnpasta", "deo"],
    ),
];

/// Service error for item use-cases.
#[derive(Debug)]
pub enum ItemServiceError {
    /// Item name is blank after trim.
    InvalidName,
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "item name must not be blank"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent item state: {details}"),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ItemServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Item input at the service surface; absent fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItemInput {
    pub name: String,
    pub quantity: Option<String>,
    pub unit: Option<Unit>,
    pub category: Option<Category>,
    pub notes: Option<String>,
}

/// Partial item update at the service surface.
///
/// A present `notes` is trimmed; blank clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<Unit>,
    pub category: Option<Category>,
    pub notes: Option<String>,
    pub is_checked: Option<bool>,
}

/// Item service facade over a repository implementation.
pub struct ItemService<I: ListItemRepository> {
    items: I,
}

impl<I: ListItemRepository> ItemService<I> {
    /// Creates a service using the provided repository implementation.
    pub fn new(items: I) -> Self {
        Self { items }
    }

    /// Adds one item with validated name and filled-in defaults.
    pub fn add_item(
        &self,
        list_id: ListId,
        input: &NewItemInput,
    ) -> Result<ListItem, ItemServiceError> {
        let name = normalize_item_name(input.name.clone())?;
        let quantity = match input.quantity.as_ref() {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => "1".to_string(),
        };
        let new_item = NewListItem {
            name,
            description: None,
            quantity,
            unit: input.unit.unwrap_or(Unit::Piece),
            category: input.category.unwrap_or(Category::Grains),
            notes: input.notes.clone().and_then(blank_to_none),
            position: None,
        };
        self.items.create(list_id, &new_item).map_err(Into::into)
    }

    /// Adds a batch of items best-effort; failed entries are logged and
    /// skipped.
    pub fn add_many_items(&self, list_id: ListId, inputs: &[NewItemInput]) -> Vec<ListItem> {
        let mut created = Vec::new();
        for input in inputs {
            match self.add_item(list_id, input) {
                Ok(item) => created.push(item),
                Err(err) => {
                    warn!(
                        "event=item_add_skipped module=item_service list_id={} name={:?} error={}",
                        list_id, input.name, err
                    );
                }
            }
        }
        created
    }

    /// Parses free-text lines (one item per line) and adds them.
    pub fn parse_and_add_items(&self, list_id: ListId, text: &str) -> Vec<ListItem> {
        let inputs: Vec<NewItemInput> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_item_line)
            .collect();
        self.add_many_items(list_id, &inputs)
    }

    /// Applies a partial update with re-validation of touched fields.
    pub fn update_item(
        &self,
        id: ItemId,
        update: &ItemUpdate,
    ) -> Result<ListItem, ItemServiceError> {
        let patch = ListItemPatch {
            name: match update.name.clone() {
                Some(value) => Some(normalize_item_name(value)?),
                None => None,
            },
            description: None,
            quantity: update.quantity.clone(),
            unit: update.unit,
            category: update.category,
            is_checked: update.is_checked,
            notes: update.notes.clone().map(blank_to_none),
            position: None,
        };

        if patch.is_empty() {
            return self
                .items
                .get(id)?
                .ok_or(ItemServiceError::ItemNotFound(id));
        }

        if !self.items.update(id, &patch)? {
            return Err(ItemServiceError::ItemNotFound(id));
        }
        self.items
            .get(id)?
            .ok_or(ItemServiceError::InconsistentState(
                "updated item missing in read-back",
            ))
    }

    /// Flips the checked state of one item and returns the fresh row.
    pub fn toggle_item(&self, id: ItemId) -> Result<ListItem, ItemServiceError> {
        if !self.items.toggle_checked(id)? {
            return Err(ItemServiceError::ItemNotFound(id));
        }
        self.items
            .get(id)?
            .ok_or(ItemServiceError::InconsistentState(
                "toggled item missing in read-back",
            ))
    }

    /// Loads one item by id.
    pub fn get_item(&self, id: ItemId) -> RepoResult<Option<ListItem>> {
        self.items.get(id)
    }

    /// Lists the live items of one list in the requested order.
    pub fn items_of_list(&self, list_id: ListId, sort: ItemSort) -> RepoResult<Vec<ListItem>> {
        self.items.find_by_list_id(list_id, sort)
    }

    /// Deletes one item in the requested mode.
    pub fn delete_item(&self, id: ItemId, mode: DeleteMode) -> RepoResult<bool> {
        self.items.delete(id, mode)
    }

    /// Clears the soft-delete marker on one item.
    pub fn restore_item(&self, id: ItemId) -> RepoResult<bool> {
        self.items.restore(id)
    }

    /// Rewrites item positions to match the given id order.
    pub fn reorder_items(&self, list_id: ListId, ordered_ids: &[ItemId]) -> RepoResult<()> {
        self.items.reorder_items(list_id, ordered_ids)
    }
}

/// Parses one free-text line into an item input.
///
/// `"2 kg Kartoffeln"` takes quantity and unit from the line; a line
/// without a leading number becomes a single `Stück` of the whole line.
/// An unrecognized unit token stays part of the name.
pub fn parse_item_line(line: &str) -> NewItemInput {
    let trimmed = line.trim();
    if let Some(caps) = ITEM_LINE_RE.captures(trimmed) {
        let quantity = caps[1].replace(',', ".");
        let unit_token = caps.get(2).map(|m| m.as_str());
        let rest = caps[3].trim().to_string();
        let matched_unit = unit_token.and_then(match_unit_token);
        let name = match (unit_token, matched_unit) {
            (Some(token), None) => format!("{token} {rest}"),
            _ => rest,
        };
        let category = suggest_category(&name);
        return NewItemInput {
            name,
            quantity: Some(quantity),
            unit: Some(matched_unit.unwrap_or(Unit::Piece)),
            category: Some(category),
            notes: None,
        };
    }

    NewItemInput {
        name: trimmed.to_string(),
        quantity: Some("1".to_string()),
        unit: Some(Unit::Piece),
        category: Some(suggest_category(trimmed)),
        notes: None,
    }
}

/// Resolves a unit token case-insensitively: exact wire-string match
/// first, then prefix match (`pack` finds `Packung`).
pub fn match_unit_token(token: &str) -> Option<Unit> {
    let token = token.to_lowercase();
    let exact = Unit::ALL
        .into_iter()
        .find(|unit| unit.as_str().to_lowercase() == token);
    if exact.is_some() {
        return exact;
    }
    Unit::ALL
        .into_iter()
        .find(|unit| unit.as_str().to_lowercase().starts_with(&token))
}

/// Suggests a category by keyword containment, `Getreide & Nudeln` as
/// the fallback.
pub fn suggest_category(item_name: &str) -> Category {
    let name = item_name.to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|keyword| name.contains(keyword)) {
            return *category;
        }
    }
    Category::Grains
}

fn normalize_item_name(value: String) -> Result<String, ItemServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ItemServiceError::InvalidName);
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

#[cfg(test)]
mod tests {
    use super::{match_unit_token, parse_item_line, suggest_category};
    use crate::model::units::{Category, Unit};

    #[test]
    fn parse_takes_quantity_unit_and_name_from_line() {
        let parsed = parse_item_line("2 kg Kartoffeln");
        assert_eq!(parsed.name, "Kartoffeln");
        assert_eq!(parsed.quantity.as_deref(), Some("2"));
        assert_eq!(parsed.unit, Some(Unit::Kilogram));
        assert_eq!(parsed.category, Some(Category::Vegetables));
    }

    #[test]
    fn parse_accepts_comma_decimal_separator() {
        let parsed = parse_item_line("1,5 l Wasser");
        assert_eq!(parsed.quantity.as_deref(), Some("1.5"));
        assert_eq!(parsed.unit, Some(Unit::Liter));
        assert_eq!(parsed.category, Some(Category::Beverages));
    }

    #[test]
    fn parse_falls_back_to_one_piece_for_plain_names() {
        let parsed = parse_item_line("Milch");
        assert_eq!(parsed.name, "Milch");
        assert_eq!(parsed.quantity.as_deref(), Some("1"));
        assert_eq!(parsed.unit, Some(Unit::Piece));
        assert_eq!(parsed.category, Some(Category::Dairy));
    }

    #[test]
    fn parse_keeps_unrecognized_token_in_the_name() {
        let parsed = parse_item_line("2 grüne Äpfel");
        assert_eq!(parsed.name, "grüne Äpfel");
        assert_eq!(parsed.quantity.as_deref(), Some("2"));
        assert_eq!(parsed.unit, Some(Unit::Piece));
    }

    #[test]
    fn unit_token_prefers_exact_match_over_prefix() {
        assert_eq!(match_unit_token("l"), Some(Unit::Liter));
        assert_eq!(match_unit_token("kg"), Some(Unit::Kilogram));
        assert_eq!(match_unit_token("pack"), Some(Unit::Pack));
        assert_eq!(match_unit_token("stück"), Some(Unit::Piece));
        assert_eq!(match_unit_token("xyz"), None);
    }

    #[test]
    fn category_suggestion_checks_keywords_in_order() {
        assert_eq!(suggest_category("Vollmilch"), Category::Dairy);
        assert_eq!(suggest_category("Apfelsaft"), Category::Fruits);
        assert_eq!(suggest_category("Putzmittel"), Category::Cleaning);
        assert_eq!(suggest_category("Unbekanntes"), Category::Grains);
    }
}
