use crate::auth::Caller;
use crate::error::{ApiError, ErrorResponse};
use crate::models::ItemListResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};

/// GET /items handler - List the caller's items
///
/// Returns every item owned by the authenticated caller, in no particular
/// order. A caller who owns nothing gets an empty list.
#[utoipa::path(
    get,
    path = routes::ITEMS,
    responses(
        (status = 200, description = "Items owned by the caller", body = ItemListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<(StatusCode, Json<ItemListResponse>), ApiError> {
    let items = state.items().list_owned(&caller.id).await?;

    tracing::info!("Listed {} items for owner: {}", items.len(), caller.id);
    Ok((StatusCode::OK, Json(ItemListResponse { items })))
}
