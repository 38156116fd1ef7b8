//! Shopping list use-case service.
//!
//! # Responsibility
//! - Validate list input and orchestrate list lifecycle flows.
//! - Cascade deletes to items and keep the counters honest on restore.
//! - Deep-copy lists with their items (`duplicate_list`).
//!
//! # Invariants
//! - List names are trimmed and never blank.
//! - `delete_list` removes the items in the same mode before the list row.
//! - Duplicated items always start unchecked; positions are preserved.

use crate::model::list::{List, ListId};
use crate::repo::base::{DeleteMode, FindOptions, ListOrder, RepoError, RepoResult};
use crate::repo::item_repo::{ItemSort, ListItemPatch, ListItemRepository, NewListItem};
use crate::repo::list_repo::{ListPatch, ListRepository, NewList};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for list use-cases.
#[derive(Debug)]
pub enum ListServiceError {
    /// List name is blank after trim.
    InvalidName,
    /// Target list does not exist.
    ListNotFound(ListId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ListServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "list name must not be blank"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent list state: {details}"),
        }
    }
}

impl Error for ListServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ListServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Partial list update at the service surface.
///
/// A present `description` is trimmed; blank clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// List service facade over repository implementations.
pub struct ListService<L: ListRepository, I: ListItemRepository> {
    lists: L,
    items: I,
}

impl<L: ListRepository, I: ListItemRepository> ListService<L, I> {
    /// Creates a service using the provided repository implementations.
    pub fn new(lists: L, items: I) -> Self {
        Self { lists, items }
    }

    /// Creates one list with a validated name.
    pub fn create_list(
        &self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<List, ListServiceError> {
        let name = normalize_list_name(name.into())?;
        let description = description.and_then(blank_to_none);
        self.lists
            .create(&NewList { name, description })
            .map_err(Into::into)
    }

    /// Applies a partial update with re-validation of touched fields.
    pub fn update_list(&self, id: ListId, update: &ListUpdate) -> Result<List, ListServiceError> {
        let patch = ListPatch {
            name: match update.name.clone() {
                Some(value) => Some(normalize_list_name(value)?),
                None => None,
            },
            description: update.description.clone().map(blank_to_none),
            total_items: None,
            completed_items: None,
        };

        if patch.is_empty() {
            return self
                .lists
                .get(id)?
                .ok_or(ListServiceError::ListNotFound(id));
        }

        if !self.lists.update(id, &patch)? {
            return Err(ListServiceError::ListNotFound(id));
        }
        self.lists
            .get(id)?
            .ok_or(ListServiceError::InconsistentState(
                "updated list missing in read-back",
            ))
    }

    /// Deletes one list and its items in the same mode.
    pub fn delete_list(&self, id: ListId, mode: DeleteMode) -> Result<bool, ListServiceError> {
        self.items.delete_by_list_id(id, mode)?;
        self.lists.delete(id, mode).map_err(Into::into)
    }

    /// Restores one soft-deleted list and refreshes its counters.
    ///
    /// Items soft-deleted by the delete cascade stay deleted; the recount
    /// settles the counters on whatever items are live.
    pub fn restore_list(&self, id: ListId) -> Result<bool, ListServiceError> {
        let restored = self.lists.restore(id)?;
        if restored {
            self.items.recount(id)?;
        }
        Ok(restored)
    }

    /// Loads one list with its stored counters.
    pub fn get_list(&self, id: ListId) -> RepoResult<Option<List>> {
        self.lists.get(id)
    }

    /// Lists all lists, most recently updated first.
    pub fn get_all_lists(&self) -> RepoResult<Vec<List>> {
        self.lists.get_all(&FindOptions {
            order: ListOrder::UpdatedDesc,
            ..FindOptions::default()
        })
    }

    /// Deep-copies one list and its items under a new name.
    pub fn duplicate_list(
        &self,
        id: ListId,
        new_name: Option<String>,
    ) -> Result<List, ListServiceError> {
        let source = self.lists.get(id)?.ok_or(ListServiceError::ListNotFound(id))?;
        let name = match new_name {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => format!("{} (Copy)", source.name),
        };

        let created = self.lists.create(&NewList {
            name,
            description: source.description.clone(),
        })?;

        let source_items = self.items.find_by_list_id(id, ItemSort::Position)?;
        let copies: Vec<NewListItem> = source_items
            .iter()
            .map(|item| NewListItem {
                name: item.name.clone(),
                description: item.description.clone(),
                quantity: item.quantity.clone(),
                unit: item.unit,
                category: item.category,
                notes: item.notes.clone(),
                position: Some(item.position),
            })
            .collect();
        self.items.create_many(created.id, &copies)?;

        self.lists
            .get(created.id)?
            .ok_or(ListServiceError::InconsistentState(
                "duplicated list missing in read-back",
            ))
    }

    /// Soft-deletes every checked item of one list.
    pub fn clear_checked_items(&self, list_id: ListId) -> RepoResult<u32> {
        self.items.delete_checked_items(list_id)
    }

    /// Unchecks every checked item of one list, item by item.
    pub fn uncheck_all_items(&self, list_id: ListId) -> Result<u32, ListServiceError> {
        let items = self.items.find_by_list_id(list_id, ItemSort::Position)?;
        let mut updated = 0;
        for item in items.iter().filter(|item| item.is_checked) {
            let patch = ListItemPatch {
                is_checked: Some(false),
                ..ListItemPatch::default()
            };
            if self.items.update(item.id, &patch)? {
                updated += 1;
            }
        }
        Ok(updated)
    }
}

fn normalize_list_name(value: String) -> Result<String, ListServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ListServiceError::InvalidName);
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
