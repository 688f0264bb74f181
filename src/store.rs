use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;

use crate::models::{Item, RESERVED_FIELDS};

/// Query predicate for item lookups.
///
/// There is no way to build a filter without an owner, so every read and
/// delete a store performs is scoped to one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    owner: String,
    id: Option<String>,
}

impl ItemFilter {
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether `item` satisfies this filter
    pub fn matches(&self, item: &Item) -> bool {
        item.owner == self.owner && self.id.as_deref().is_none_or(|id| item.id == id)
    }
}

/// An item that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub owner: String,
    pub fields: JsonMap<String, JsonValue>,
}

impl NewItem {
    /// Build a new item for `owner`, dropping any system fields from the payload.
    pub fn new(owner: impl Into<String>, mut fields: JsonMap<String, JsonValue>) -> Self {
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }
        Self {
            owner: owner.into(),
            fields,
        }
    }
}

/// Document store for items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Persist a new item, assigning its id and timestamps.
    async fn insert(&self, item: NewItem) -> Result<Item>;

    /// All items matching `filter`, in no guaranteed order.
    async fn find(&self, filter: &ItemFilter) -> Result<Vec<Item>>;

    /// The single item matching `filter`, if any.
    async fn find_one(&self, filter: &ItemFilter) -> Result<Option<Item>>;

    /// Remove the item matching `filter`. Returns `false` if nothing matched.
    async fn delete_one(&self, filter: &ItemFilter) -> Result<bool>;

    /// Verify the backing store is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Parse an item id, rejecting anything that is not a UUID.
pub fn parse_item_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid item id '{}'", id))
}
