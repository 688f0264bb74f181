use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

use crate::blank_fields::strip_blank_fields;
use crate::error::ApiError;
use crate::models::Item;
use crate::store::{ItemFilter, ItemStore, NewItem};

/// Owner-scoped item operations.
///
/// Every lookup goes through an [`ItemFilter`] carrying the caller's id, so an
/// item that belongs to someone else behaves exactly like one that does not
/// exist: both surface as [`ApiError::ItemNotFound`]. There is no separate
/// "forbidden" outcome.
#[derive(Clone)]
pub struct OwnedItems {
    store: Arc<dyn ItemStore>,
}

impl OwnedItems {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// All items owned by `caller`. Empty when the caller owns nothing.
    pub async fn list_owned(&self, caller: &str) -> Result<Vec<Item>, ApiError> {
        Ok(self.store.find(&ItemFilter::owned_by(caller)).await?)
    }

    pub async fn get_owned(&self, caller: &str, item_id: &str) -> Result<Item, ApiError> {
        let filter = ItemFilter::owned_by(caller).with_id(item_id);
        self.store
            .find_one(&filter)
            .await?
            .ok_or_else(|| ApiError::ItemNotFound(item_id.to_string()))
    }

    /// Persist `payload` as a new item owned by `caller`.
    ///
    /// Blank fields are dropped and any client-supplied owner is replaced.
    pub async fn create(
        &self,
        caller: &str,
        mut payload: JsonMap<String, JsonValue>,
    ) -> Result<Item, ApiError> {
        strip_blank_fields(&mut payload);
        Ok(self.store.insert(NewItem::new(caller, payload)).await?)
    }

    pub async fn delete_owned(&self, caller: &str, item_id: &str) -> Result<(), ApiError> {
        let filter = ItemFilter::owned_by(caller).with_id(item_id);
        if self.store.delete_one(&filter).await? {
            Ok(())
        } else {
            Err(ApiError::ItemNotFound(item_id.to_string()))
        }
    }
}
