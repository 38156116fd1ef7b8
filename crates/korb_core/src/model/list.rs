//! Shopping list domain model.
//!
//! # Responsibility
//! - Define the `List` aggregate root and its owned `ListItem` entries.
//! - Carry the denormalized item counters used for O(1) overview reads.
//!
//! # Invariants
//! - `0 <= completed_items <= total_items`; the item repository's recount
//!   is the only writer of these counters.
//! - `checked_at` is set exactly when `is_checked` is true.
//! - `position` orders items within one list; new items append at the end.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::units::{Category, Unit};

/// Stable identifier of a shopping list.
pub type ListId = Uuid;

/// Stable identifier of a single list item.
pub type ItemId = Uuid;

/// A named shopping list with cached item counters.
///
/// Timestamps are ISO-8601 UTC strings; `updated_at` advances on every
/// mutation of the list itself or of any owned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Count of live (non-deleted) items, maintained by the recount path.
    pub total_items: i64,
    /// Count of live checked items, maintained by the recount path.
    pub completed_items: i64,
}

impl List {
    /// Completion progress in percent, 0 for an empty list.
    pub fn progress(&self) -> f64 {
        if self.total_items > 0 {
            (self.completed_items as f64 / self.total_items as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// One purchasable entry within a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: ItemId,
    pub list_id: ListId,
    pub name: String,
    pub description: Option<String>,
    /// Free-form amount, defaults to `"1"`.
    pub quantity: String,
    pub unit: Unit,
    pub category: Category,
    pub is_checked: bool,
    pub notes: Option<String>,
    /// Manual ordering within the list; appended items get max + 1.
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
    /// Set when the item was last checked off; `None` while unchecked.
    pub checked_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::List;
    use uuid::Uuid;

    fn sample_list(total: i64, completed: i64) -> List {
        List {
            id: Uuid::new_v4(),
            name: "Wocheneinkauf".to_string(),
            description: None,
            created_at: "2026-01-05T08:00:00.000Z".to_string(),
            updated_at: "2026-01-05T08:00:00.000Z".to_string(),
            total_items: total,
            completed_items: completed,
        }
    }

    #[test]
    fn progress_is_zero_for_empty_list() {
        assert_eq!(sample_list(0, 0).progress(), 0.0);
    }

    #[test]
    fn progress_is_percentage_of_checked_items() {
        assert_eq!(sample_list(4, 1).progress(), 25.0);
        assert_eq!(sample_list(2, 2).progress(), 100.0);
    }

    #[test]
    fn serde_field_names_are_camel_case() {
        let json = serde_json::to_string(&sample_list(1, 0)).unwrap();
        assert!(json.contains("\"totalItems\""));
        assert!(json.contains("\"completedItems\""));
        assert!(json.contains("\"createdAt\""));
        assert!(!json.contains("total_items"));
    }
}
