use crate::auth::Caller;
use crate::error::{ApiError, ErrorResponse};
use crate::models::ItemResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Extension, Json};

/// GET /items/:id handler - Retrieve one of the caller's items
#[utoipa::path(
    get,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item id")
    ),
    responses(
        (status = 200, description = "Item found", body = ItemResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "No such item owned by the caller", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    match state.items().get_owned(&caller.id, &id).await {
        Ok(item) => {
            tracing::info!("Retrieved item {} for owner: {}", id, caller.id);
            Ok((StatusCode::OK, Json(ItemResponse { item })))
        }
        Err(e @ ApiError::ItemNotFound(_)) => {
            tracing::info!("Item {} not found for owner: {}", id, caller.id);
            Err(e)
        }
        Err(e) => Err(e),
    }
}
