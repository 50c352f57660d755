use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use alertline_shared::validation::require_text;
use alertline_shared::IncidentType;
use alertline_store::{Alert, AlertPatch, NewAlert, StoreError};

use crate::access::admin_route;
use crate::credentials::Principal;
use crate::error::ApiError;

use super::{json_body, AppState, EntityId};

pub(super) fn router(state: &AppState) -> Router<AppState> {
    let creds = &state.credentials;

    Router::new()
        .route("/", get(list_alerts).merge(admin_route(post(create_alert), creds)))
        .route("/{id}", admin_route(put(update_alert).delete(delete_alert), creds))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AlertRequest {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    incident_type: Option<String>,
    location: Option<String>,
}

fn optional_text(field: &'static str, value: Option<String>) -> Result<Option<String>, ApiError> {
    value
        .as_deref()
        .map(|v| require_text(field, Some(v)).map(str::to_string))
        .transpose()
        .map_err(ApiError::from)
}

async fn list_alerts(State(state): State<AppState>) -> Result<Json<Vec<Alert>>, ApiError> {
    let alerts = state.db.lock().await.list_alerts()?;
    Ok(Json(alerts))
}

async fn create_alert(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let req = json_body(body)?;
    let new = NewAlert {
        title: require_text("title", req.title.as_deref())?.to_string(),
        description: require_text("description", req.description.as_deref())?.to_string(),
        incident_type: require_text("type", req.incident_type.as_deref())?.parse()?,
        location: require_text("location", req.location.as_deref())?.to_string(),
        created_by: principal.id,
    };

    let alert = state.db.lock().await.create_alert(&new)?;

    info!(id = %alert.id, kind = %alert.incident_type, by = %principal.id, "Alert created");
    Ok((StatusCode::CREATED, Json(alert)))
}

async fn update_alert(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    body: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<Json<Alert>, ApiError> {
    let req = json_body(body)?;
    let patch = AlertPatch {
        title: optional_text("title", req.title)?,
        description: optional_text("description", req.description)?,
        incident_type: optional_text("type", req.incident_type)?
            .map(|t| t.parse::<IncidentType>())
            .transpose()?,
        location: optional_text("location", req.location)?,
    };

    let alert = state
        .db
        .lock()
        .await
        .update_alert(id, &patch)
        .map_err(|e| ApiError::from_store("Alert", e))?;

    info!(id = %id, "Alert updated");
    Ok(Json(alert))
}

async fn delete_alert(
    State(state): State<AppState>,
    principal: Principal,
    EntityId(id): EntityId,
) -> Result<Json<Value>, ApiError> {
    if !state.db.lock().await.delete_alert(id)? {
        return Err(ApiError::from_store("Alert", StoreError::NotFound));
    }

    info!(id = %id, by = %principal.id, "Alert deleted");
    Ok(Json(json!({ "message": "Alert deleted" })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    use alertline_shared::Role;

    use crate::api::test_support::{request, TestApp};

    fn flood_alert() -> serde_json::Value {
        json!({
            "title": "Flash flood warning",
            "description": "Move to higher ground immediately",
            "type": "flood",
            "location": "Butwal, ward 7",
        })
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let app = TestApp::new().await;
        let (_, user) = app.login_as("bob", "9800000002", Role::User).await;

        let (status, _) = app.json(Method::POST, "/api/alerts", None, flood_alert()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .json(Method::POST, "/api/alerts", Some(&user), flood_alert())
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.get("/api/alerts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_token_forbidden_regardless_of_body() {
        let app = TestApp::new().await;
        let (_, user) = app.login_as("bob", "9800000002", Role::User).await;

        let (status, _) = app
            .send(request(
                Method::POST,
                "/api/alerts",
                Some(&user),
                "not json at all".into(),
                Some("text/plain"),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .json(Method::POST, "/api/alerts", Some(&user), json!({ "type": "tsunami" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .json(
                Method::PUT,
                &format!("/api/alerts/{}", Uuid::new_v4()),
                Some(&user),
                json!({ "title": "   " }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = TestApp::new().await;
        let (_, admin) = app.login_as("admin", "9800000000", Role::Admin).await;

        let mut missing_title = flood_alert();
        missing_title["title"] = json!("   ");
        let (status, body) = app
            .json(Method::POST, "/api/alerts", Some(&admin), missing_title)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "title is required");

        let mut bad_type = flood_alert();
        bad_type["type"] = json!("tsunami");
        let (status, _) = app
            .json(Method::POST, "/api/alerts", Some(&admin), bad_type)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_alert_lifecycle() {
        let app = TestApp::new().await;
        let (admin_id, admin) = app.login_as("admin", "9800000000", Role::Admin).await;

        let (status, body) = app
            .json(Method::POST, "/api/alerts", Some(&admin), flood_alert())
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["createdBy"], admin_id.to_string());
        let id = body["id"].as_str().unwrap().to_string();

        let mut second = flood_alert();
        second["title"] = json!("Landslide risk on highway");
        second["type"] = json!("landslide");
        app.json(Method::POST, "/api/alerts", Some(&admin), second)
            .await;

        let (_, body) = app.get("/api/alerts", None).await;
        let titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Landslide risk on highway", "Flash flood warning"]);

        let uri = format!("/api/alerts/{id}");
        let (status, body) = app
            .json(Method::PUT, &uri, Some(&admin), json!({ "location": "Butwal, ward 9" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], "Butwal, ward 9");
        assert_eq!(body["title"], "Flash flood warning");

        let (status, _) = app
            .json(Method::PUT, &uri, Some(&admin), json!({ "type": "storm" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.json(Method::DELETE, &uri, Some(&admin), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.json(Method::DELETE, &uri, Some(&admin), json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json(
                Method::PUT,
                &format!("/api/alerts/{}", Uuid::new_v4()),
                Some(&admin),
                json!({ "title": "Nothing here" }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
