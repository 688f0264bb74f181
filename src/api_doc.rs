use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{CreateItemRequest, ItemListResponse, ItemResponse};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-owned-items API",
        version = "1.0.0",
        description = "Owner-scoped items behind bearer-token authentication"
    ),
    paths(
        handlers::health::health_handler,
        handlers::list::list_handler,
        handlers::get::get_handler,
        handlers::create::create_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            CreateItemRequest,
            ItemResponse,
            ItemListResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "items", description = "Operations on the caller's items")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the item routes
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
