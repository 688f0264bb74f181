use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Item;
use crate::store::{parse_item_id, ItemFilter, ItemStore, NewItem};

/// Process-local item store.
///
/// Holds everything in a map guarded by an async lock. Used for local
/// development (`STORE_BACKEND=memory`) and as the store in handler tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert(&self, item: NewItem) -> Result<Item> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let item = Item {
            id: id.to_string(),
            owner: item.owner,
            fields: item.fields,
            created_at: now,
            updated_at: now,
        };

        self.items.write().await.insert(id, item.clone());

        tracing::debug!("Inserted item with id: {}", id);
        Ok(item)
    }

    async fn find(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        if let Some(id) = filter.id() {
            return Ok(self.find_one(filter).await?.into_iter().collect());
        }

        let items: Vec<Item> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();

        tracing::debug!("Found {} items for owner: {}", items.len(), filter.owner());
        Ok(items)
    }

    async fn find_one(&self, filter: &ItemFilter) -> Result<Option<Item>> {
        let items = self.items.read().await;

        let found = match filter.id() {
            Some(id) => items
                .get(&parse_item_id(id)?)
                .filter(|item| filter.matches(item))
                .cloned(),
            None => items.values().find(|item| filter.matches(item)).cloned(),
        };

        Ok(found)
    }

    async fn delete_one(&self, filter: &ItemFilter) -> Result<bool> {
        let mut items = self.items.write().await;

        let key = match filter.id() {
            Some(id) => {
                let id = parse_item_id(id)?;
                items.get(&id).filter(|item| filter.matches(item)).map(|_| id)
            }
            None => items
                .iter()
                .find(|(_, item)| filter.matches(item))
                .map(|(id, _)| *id),
        };

        match key {
            Some(id) => {
                items.remove(&id);
                tracing::debug!("Deleted item with id: {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value as JsonValue};

    fn payload(value: JsonValue) -> serde_json::Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = MemoryStore::new();

        let item = store
            .insert(NewItem::new("alice", payload(json!({"name": "book"}))))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&item.id).is_ok());
        assert_eq!(item.owner, "alice");
        assert_eq!(item.fields["name"], "book");
        assert_eq!(item.created_at, item.updated_at);
    }

    #[tokio::test]
    async fn test_find_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let a1 = store.insert(NewItem::new("alice", payload(json!({"n": 1})))).await.unwrap();
        let a2 = store.insert(NewItem::new("alice", payload(json!({"n": 2})))).await.unwrap();
        store.insert(NewItem::new("bob", payload(json!({"n": 3})))).await.unwrap();

        let mut ids: Vec<String> = store
            .find(&ItemFilter::owned_by("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        ids.sort();
        let mut expected = vec![a1.id, a2.id];
        expected.sort();

        assert_eq!(ids, expected);
        assert!(store.find(&ItemFilter::owned_by("carol")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_one_requires_matching_owner() {
        let store = MemoryStore::new();
        let item = store.insert(NewItem::new("alice", payload(json!({})))).await.unwrap();

        let own = ItemFilter::owned_by("alice").with_id(item.id.clone());
        let foreign = ItemFilter::owned_by("bob").with_id(item.id.clone());

        assert_eq!(store.find_one(&own).await.unwrap(), Some(item));
        assert_eq!(store.find_one(&foreign).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_one_is_scoped_and_not_repeatable() {
        let store = MemoryStore::new();
        let item = store.insert(NewItem::new("alice", payload(json!({})))).await.unwrap();

        let own = ItemFilter::owned_by("alice").with_id(item.id.clone());
        let foreign = ItemFilter::owned_by("bob").with_id(item.id.clone());

        assert!(!store.delete_one(&foreign).await.unwrap());
        assert!(store.find_one(&own).await.unwrap().is_some());

        assert!(store.delete_one(&own).await.unwrap());
        assert!(!store.delete_one(&own).await.unwrap());
        assert!(store.find_one(&own).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_id_is_an_error() {
        let store = MemoryStore::new();
        let filter = ItemFilter::owned_by("alice").with_id("not-a-uuid");

        assert!(store.find_one(&filter).await.is_err());
        assert!(store.delete_one(&filter).await.is_err());
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryStore>();
    }
}
