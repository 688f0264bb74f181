use crate::auth::Caller;
use crate::error::{ApiError, ErrorResponse};
use crate::models::{CreateItemRequest, ItemResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};

/// POST /items handler - Create an item owned by the caller
///
/// Empty-string and null fields are dropped. `id`, `owner` and the
/// timestamps are assigned server-side; values for them in the request body
/// are ignored.
#[utoipa::path(
    post,
    path = routes::ITEMS,
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Malformed JSON body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 422, description = "Body is not of the form {\"item\": {...}}", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let item = state.items().create(&caller.id, request.item).await?;

    tracing::info!("Created item {} for owner: {}", item.id, caller.id);
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}
