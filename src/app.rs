use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::auth::require_token;
use crate::handlers::{create_handler, delete_handler, get_handler, health_handler, list_handler};
use crate::routes;
use crate::state::AppState;

/// Build the application router around the given collaborators.
///
/// Every item route sits behind [`require_token`]. PATCH is not routed, so
/// it gets 405 like any other unsupported method.
pub fn build_router(state: AppState) -> Router {
    let items = Router::new()
        .route(routes::ITEMS, get(list_handler).post(create_handler))
        .route(routes::ITEM, get(get_handler).delete(delete_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .merge(items)
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
