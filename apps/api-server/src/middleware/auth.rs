//! Bearer token authentication extractor.

use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use std::future::{Ready, ready};
use std::sync::Arc;

use postflow_core::ports::{AuthError, TokenClaims, TokenService};
use postflow_shared::ErrorResponse;

/// Authenticated caller identity extractor.
///
/// Every post route takes one of these; the user id it carries is the
/// owner all post lookups are scoped to.
/// ```ignore
/// async fn list(identity: Identity) -> impl Responder {
///     format!("posts of {}", identity.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: uuid::Uuid,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
        }
    }
}

/// Error type for authentication failures.
#[derive(Debug)]
pub struct AuthenticationError(pub AuthError);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        let error = match &self.0 {
            AuthError::TokenExpired => ErrorResponse::new(401, "Token Expired")
                .with_detail("Your authentication token has expired. Please login again."),
            AuthError::InvalidToken(msg) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(msg.clone())
            }
            AuthError::MissingAuth => ErrorResponse::new(401, "Authentication Required")
                .with_detail("Please provide a valid Bearer token in the Authorization header."),
        };

        HttpResponse::build(self.status_code())
            .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
            .json(error)
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(token_service) = req.app_data::<web::Data<Arc<dyn TokenService>>>() else {
            tracing::error!("TokenService not found in app data");
            return ready(Err(AuthenticationError(AuthError::InvalidToken(
                "Server configuration error".to_string(),
            ))));
        };

        let result = bearer_token(req)
            .and_then(|token| token_service.validate_token(token))
            .map(Identity::from)
            .map_err(AuthenticationError);

        if let Err(e) = &result {
            tracing::debug!(error = %e, path = %req.path(), "Rejected request");
        }

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    use postflow_infra::{JwtConfig, JwtTokenService};

    fn jwt() -> Arc<JwtTokenService> {
        Arc::new(JwtTokenService::new(JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        }))
    }

    fn token_service() -> Arc<dyn TokenService> {
        jwt()
    }

    #[actix_web::test]
    async fn test_valid_bearer_token_yields_identity() {
        let jwt = jwt();
        let user_id = uuid::Uuid::new_v4();
        let token = jwt.issue_token(user_id, "mark@example.com").unwrap();
        let service: Arc<dyn TokenService> = jwt;

        let req = TestRequest::default()
            .app_data(web::Data::new(service))
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        let identity = Identity::extract(&req).await.unwrap();
        assert_eq!(identity.user_id, user_id);
    }

    #[actix_web::test]
    async fn test_missing_header_is_missing_auth() {
        let req = TestRequest::default()
            .app_data(web::Data::new(token_service()))
            .to_http_request();

        let err = Identity::extract(&req).await.unwrap_err();
        assert!(matches!(err.0, AuthError::MissingAuth));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let req = TestRequest::default()
            .app_data(web::Data::new(token_service()))
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();

        let err = Identity::extract(&req).await.unwrap_err();
        assert!(matches!(err.0, AuthError::InvalidToken(_)));
    }

    #[actix_web::test]
    async fn test_garbage_token_is_rejected() {
        let req = TestRequest::default()
            .app_data(web::Data::new(token_service()))
            .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
            .to_http_request();

        assert!(Identity::extract(&req).await.is_err());
    }
}
