//! HTTP surface: router assembly, shared extractors, and the server loop.

mod alerts;
mod auth;
mod reports;

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, FromRequestParts, Path, Query,
    },
    http::{header, request::Parts, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use alertline_shared::constants::DEFAULT_SEARCH_RADIUS_METERS;
use alertline_shared::{GeoPoint, ValidationError};
use alertline_store::Database;

use crate::config::ServerConfig;
use crate::credentials::CredentialService;
use crate::error::ApiError;
use crate::image_store::ImageStore;

/// Room for multipart boundaries and text fields on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub credentials: CredentialService,
    pub images: Arc<ImageStore>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let body_limit = state.images.max_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth::router(&state))
        .nest("/api/reports", reports::router(&state))
        .route("/api/reportsLocation", get(reports::report_locations))
        .nest("/api/alerts", alerts::router(&state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Shared extractors
// ---------------------------------------------------------------------------

/// A UUID path segment. Malformed ids are a 400 with a JSON body instead of
/// axum's plain-text rejection.
pub(crate) struct EntityId(pub Uuid);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Uuid::parse_str(&raw)
            .map(EntityId)
            .map_err(|_| ApiError::BadRequest(format!("Malformed id '{raw}'")))
    }
}

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// `?longitude=&latitude=&radius=` for the proximity endpoints.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NearQuery {
    longitude: f64,
    latitude: f64,
    radius: Option<f64>,
}

impl NearQuery {
    pub(crate) fn from_request(
        query: Result<Query<NearQuery>, QueryRejection>,
    ) -> Result<(GeoPoint, f64), ApiError> {
        let Query(q) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let center = GeoPoint::new(q.longitude, q.latitude)?;
        let radius = q.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_METERS);
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ValidationError::InvalidLocation(format!(
                "radius must be a positive number of meters, got {radius}"
            ))
            .into());
        }
        Ok((center, radius))
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
            }
        })
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use alertline_shared::Role;

    pub const BOUNDARY: &str = "alertline-test-boundary";

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
        _uploads: TempDir,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let uploads = TempDir::new().unwrap();
            let mut config = ServerConfig::with_secret("router-test-secret");
            config.bcrypt_cost = 4;
            config.upload_dir = uploads.path().join("uploads");

            let state = AppState {
                db: Arc::new(Mutex::new(Database::open_in_memory().unwrap())),
                credentials: CredentialService::from_config(&config),
                images: Arc::new(
                    ImageStore::new(config.upload_dir.clone(), config.max_upload_size)
                        .await
                        .unwrap(),
                ),
                config: Arc::new(config),
            };

            Self {
                router: build_router(state.clone()),
                state,
                _uploads: uploads,
            }
        }

        pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(req).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send(request(Method::GET, uri, token, Body::empty(), None))
                .await
        }

        pub async fn json(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Value,
        ) -> (StatusCode, Value) {
            self.send(request(
                method,
                uri,
                token,
                Body::from(body.to_string()),
                Some("application/json"),
            ))
            .await
        }

        /// Register a user over HTTP, optionally promote it in the store,
        /// then log in. Returns `(id, token)`.
        pub async fn login_as(&self, username: &str, phone: &str, role: Role) -> (Uuid, String) {
            let (status, body) = self
                .json(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    json!({ "username": username, "password": "secret1", "phoneNumber": phone }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            let id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();

            if role == Role::Admin {
                self.state.db.lock().await.set_user_role(id, Role::Admin).unwrap();
            }

            let (status, body) = self
                .json(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    json!({ "phone": phone, "password": "secret1" }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            (id, body["token"].as_str().unwrap().to_string())
        }
    }

    pub fn request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Body,
        content_type: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(body).unwrap()
    }

    /// Encode text fields plus an optional `(file name, content type, bytes)`
    /// image part as `multipart/form-data`.
    pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &str, &[u8])>) -> Body {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }
}
