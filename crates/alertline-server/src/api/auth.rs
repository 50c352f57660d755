use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use alertline_shared::constants::TOKEN_COOKIE_NAME;
use alertline_shared::validation::{require_text, validate_credentials};
use alertline_shared::{GeoPoint, Role};
use alertline_store::{NewUser, StoreError, User};

use crate::access::{admin_route, authenticate};
use crate::credentials::Principal;
use crate::error::ApiError;

use super::{json_body, AppState, EntityId, NearQuery};

pub(super) fn router(state: &AppState) -> Router<AppState> {
    let creds = &state.credentials;

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/users", admin_route(get(list_users), creds))
        .route("/users/around", get(users_around))
        .route("/users/{id}/role", admin_route(put(change_role), creds))
        .route(
            "/users/{id}",
            get(get_user).merge(admin_route(delete(delete_user), creds)),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
    phone_number: Option<String>,
    location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginRequest {
    #[serde(alias = "phoneNumber")]
    phone: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleRequest {
    role: String,
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req = json_body(body)?;
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let phone_number = req.phone_number.unwrap_or_default();
    validate_credentials(&username, &password, &phone_number)?;

    let phone_number = phone_number.trim().to_string();
    if state.db.lock().await.find_user_by_phone(&phone_number)?.is_some() {
        return Err(ApiError::Conflict("Phone number already registered".into()));
    }

    let password_hash = state.credentials.hash_password(password).await?;
    let user = state.db.lock().await.create_user(&NewUser {
        username: username.trim().to_string(),
        phone_number,
        password_hash,
        location: req.location,
    })?;

    info!(id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": user })),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let req = json_body(body)?;
    let phone_number = require_text("phone", req.phone.as_deref())?.to_string();
    let password = require_text("password", req.password.as_deref())?.to_string();

    let rejected = || ApiError::Unauthorized("Invalid phone number or password".into());

    let user = state
        .db
        .lock()
        .await
        .find_user_by_phone(&phone_number)?
        .ok_or_else(rejected)?;

    if !state
        .credentials
        .verify_password(password, user.password_hash.clone())
        .await?
    {
        return Err(rejected());
    }

    let token = state.credentials.issue_token(user.id, user.role)?;
    let cookie = Cookie::build((TOKEN_COOKIE_NAME, token.clone()))
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/");

    info!(id = %user.id, role = %user.role, "User logged in");
    Ok((
        jar.add(cookie),
        Json(json!({ "message": "Login successful", "user": user, "token": token })),
    ))
}

/// Check the caller's token in the handler itself and echo its claims.
async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let principal = authenticate(&state.credentials, &headers)?;
    Ok(Json(json!({ "message": "Token valid", "user": principal })))
}

async fn get_user(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<User>, ApiError> {
    let user = state
        .db
        .lock()
        .await
        .get_user(id)
        .map_err(|e| ApiError::from_store("User", e))?;
    Ok(Json(user))
}

async fn users_around(
    State(state): State<AppState>,
    query: Result<Query<NearQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let (center, radius) = NearQuery::from_request(query)?;
    let users = state.db.lock().await.users_near(&center, radius)?;
    Ok(Json(users))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.db.lock().await.list_users()?;
    Ok(Json(users))
}

async fn change_role(
    State(state): State<AppState>,
    principal: Principal,
    EntityId(id): EntityId,
    body: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = json_body(body)?;
    let role: Role = req.role.trim().parse()?;

    let user = state
        .db
        .lock()
        .await
        .set_user_role(id, role)
        .map_err(|e| ApiError::from_store("User", e))?;

    info!(id = %user.id, role = %role, by = %principal.id, "Role changed");
    Ok(Json(json!({ "message": "Role updated", "user": user })))
}

async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    EntityId(id): EntityId,
) -> Result<Json<Value>, ApiError> {
    if !state.db.lock().await.delete_user(id)? {
        return Err(ApiError::from_store("User", StoreError::NotFound));
    }

    info!(id = %id, by = %principal.id, "User deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
