use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated principal making the current request.
///
/// Inserted into request extensions by [`require_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
}

/// Resolves a bearer token to the principal it belongs to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `Ok(None)` when the token is not recognised.
    async fn verify(&self, token: &str) -> Result<Option<Caller>>;
}

/// Verifier over a fixed token -> owner table loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Option<Caller>> {
        Ok(self.tokens.get(token).map(|owner| Caller { id: owner.clone() }))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthenticated("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("malformed Authorization header".to_string()))?;

    let (scheme, token) = value.split_once(' ').ok_or_else(|| {
        ApiError::Unauthenticated("expected Authorization: Bearer <token>".to_string())
    })?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::Unauthenticated(
            "expected Authorization: Bearer <token>".to_string(),
        ));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated("empty bearer token".to_string()));
    }

    Ok(token)
}

/// Middleware guarding the item routes.
///
/// Rejects the request with 401 before any handler runs unless the bearer
/// token resolves to a caller, which is then attached to the request.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => {
            tracing::warn!("Rejected request to {}: {:?}", request.uri().path(), e);
            return Err(e);
        }
    };

    let Some(caller) = state.verifier.verify(&token).await? else {
        tracing::warn!("Rejected request to {}: unknown bearer token", request.uri().path());
        return Err(ApiError::Unauthenticated("invalid bearer token".to_string()));
    };

    tracing::debug!("Authenticated caller: {}", caller.id);
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorResponse;
    use crate::memory::MemoryStore;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn setup_test_app() -> Router {
        let tokens = HashMap::from([("alice-token".to_string(), "alice".to_string())]);
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticTokenVerifier::new(tokens)),
        );

        Router::new()
            .route("/whoami", get(|Extension(caller): Extension<Caller>| async move { caller.id }))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
            .with_state(state)
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = HttpRequest::builder().method("GET").uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }

        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_valid_token_attaches_caller() {
        let (status, body) = call(setup_test_app(), Some("Bearer alice-token")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"alice");
    }

    #[tokio::test]
    async fn test_scheme_is_case_insensitive() {
        let (status, body) = call(setup_test_app(), Some("bearer alice-token")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"alice");
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let (status, body) = call(setup_test_app(), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.error.contains("missing Authorization header"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let (status, _) = call(setup_test_app(), Some("Bearer mallory-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_scheme_is_rejected() {
        let (status, _) = call(setup_test_app(), Some("Basic alice-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(setup_test_app(), Some("alice-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let (status, _) = call(setup_test_app(), Some("Bearer   ")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_static_verifier() {
        let verifier = StaticTokenVerifier::new(HashMap::from([(
            "t".to_string(),
            "owner-1".to_string(),
        )]));

        assert_eq!(
            verifier.verify("t").await.unwrap(),
            Some(Caller { id: "owner-1".to_string() })
        );
        assert_eq!(verifier.verify("other").await.unwrap(), None);
    }
}
