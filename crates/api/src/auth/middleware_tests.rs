//! Unit tests for authentication middleware
//!
//! Tests cover:
//! - Bearer token extraction and verification through the middleware
//! - Rejection of missing, malformed, and wrong-secret tokens

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::jwt::JwtManager;
    use super::super::middleware::*;
    use axum::{
        body::Body,
        extract::Extension,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn auth_state() -> AuthState {
        AuthState {
            jwt_manager: JwtManager::new("test-jwt-secret-key-for-testing-only", 24),
        }
    }

    /// Echo handler that proves the AuthUser extension was injected
    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        user.account_id.to_string()
    }

    fn app(state: AuthState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state, require_auth))
    }

    #[tokio::test]
    async fn valid_token_passes_and_injects_user() {
        let state = auth_state();
        let account_id = Uuid::new_v4();
        let token = state.jwt_manager.issue(account_id, None).unwrap();

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], account_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let response = app(auth_state())
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let response = app(auth_state())
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("Authorization", "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_secret_token_is_unauthorized() {
        let other = JwtManager::new("a-different-secret-entirely", 24);
        let token = other.issue(Uuid::new_v4(), None).unwrap();

        let response = app(auth_state())
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
