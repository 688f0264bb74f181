use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Fields assigned by the service; any client-supplied values are discarded.
pub const RESERVED_FIELDS: [&str; 4] = ["id", "owner", "created_at", "updated_at"];

/// A stored item.
///
/// `fields` holds the caller's opaque payload and is flattened into the same
/// JSON object as the system fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub owner: String,
    #[serde(flatten)]
    pub fields: JsonMap<String, JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for POST /items
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateItemRequest {
    #[schema(value_type = Object)]
    pub item: JsonMap<String, JsonValue>,
}

/// Response type for a single item
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ItemResponse {
    #[schema(value_type = Object)]
    pub item: Item,
}

/// Response type for the list endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ItemListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Item>,
}
