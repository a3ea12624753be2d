use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, SubjectId, TokenVerifier};
use crate::error::ApiError;

/// Authenticated caller, injected into request extensions by `jwt_auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject: SubjectId,
}

/// Verifies the bearer token and injects the caller's subject into the request.
/// Any failure ends the request with 401 before a handler (or the store) runs.
pub async fn jwt_auth_middleware(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subject = resolve_subject(verifier.as_ref(), request.headers()).await?;

    request.extensions_mut().insert(AuthUser { subject });
    Ok(next.run(request).await)
}

/// Resolve the caller's subject from the Authorization header
pub async fn resolve_subject(verifier: &dyn TokenVerifier, headers: &HeaderMap) -> Result<SubjectId, AuthError> {
    let token = extract_bearer_token(headers)?;
    verifier.verify(token).await
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingCredential)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("Invalid Authorization header format"))?;

    let (scheme, token) = auth_str
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader("Authorization header must use Bearer token format"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader("Authorization header must use Bearer token format"));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader("Empty JWT token"));
    }
    Ok(token)
}
