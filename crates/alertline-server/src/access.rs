//! Route gates: resolve the caller's token to a [`Principal`] and enforce
//! roles before a handler runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use alertline_shared::constants::TOKEN_COOKIE_NAME;
use alertline_shared::Role;

use crate::credentials::{AuthError, CredentialService, Principal};
use crate::error::ApiError;

/// Pull the raw token from the `token` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(TOKEN_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Resolve the request headers to a principal.
pub fn authenticate(
    credentials: &CredentialService,
    headers: &HeaderMap,
) -> Result<Principal, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = credentials.verify_token(&token)?;
    Ok(Principal::from(&claims))
}

/// Gate: reject requests without a valid token and attach the principal to
/// the request extensions.
pub async fn require_token(
    State(credentials): State<CredentialService>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authenticate(&credentials, req.headers()).map_err(|e| {
        debug!(path = %req.uri().path(), error = %e, "Token gate rejected request");
        e
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Gate: the attached principal must be an admin. Must run after
/// [`require_token`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .copied()
        .ok_or(AuthError::MissingToken)?;

    ensure_role(&principal, Role::Admin)?;
    Ok(next.run(req).await)
}

pub fn ensure_role(principal: &Principal, role: Role) -> Result<(), ApiError> {
    if principal.role != role {
        warn!(id = %principal.id, role = %principal.role, required = %role, "Role check failed");
        return Err(ApiError::Forbidden(format!("Requires {role} role")));
    }
    Ok(())
}

/// Wrap the methods of `route` in the token gate. The route's 405 fallback
/// stays ungated, so an unsupported method is still reported as such.
pub fn token_route<S>(route: MethodRouter<S>, credentials: &CredentialService) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(
        credentials.clone(),
        require_token,
    ))
}

/// Like [`token_route`], and the principal must also be an admin.
pub fn admin_route<S>(route: MethodRouter<S>, credentials: &CredentialService) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    token_route(route.route_layer(middleware::from_fn(require_admin)), credentials)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}
