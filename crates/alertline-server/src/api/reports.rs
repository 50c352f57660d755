use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Query, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use alertline_shared::relative_time::humanize_since;
use alertline_shared::validation::{parse_location, require_text, validate_description};
use alertline_shared::{GeoPoint, IncidentType, ReportStatus, Role};
use alertline_store::{NewReport, Report, ReportPatch};

use crate::access::{admin_route, authenticate, ensure_role, token_route};
use crate::credentials::Principal;
use crate::error::ApiError;

use super::{json_body, AppState, EntityId, NearQuery};

pub(super) fn router(state: &AppState) -> Router<AppState> {
    let creds = &state.credentials;

    // Verification checks the role itself so a missing report is reported
    // before the caller's role.
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/near", get(reports_near))
        .route("/verify/{id}", token_route(put(verify_report), creds))
        .route("/{id}/status", admin_route(put(change_status), creds))
        .route(
            "/{id}",
            get(get_report).merge(admin_route(put(update_report).delete(delete_report), creds)),
        )
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

struct ImageUpload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

#[derive(Default)]
struct ReportForm {
    incident_type: Option<String>,
    description: Option<String>,
    location: Option<String>,
    image: Option<ImageUpload>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ReportForm, ApiError> {
    let mut form = ReportForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "type" => form.incident_type = Some(field.text().await.map_err(multipart_error)?),
            "description" => form.description = Some(field.text().await.map_err(multipart_error)?),
            "location" => form.location = Some(field.text().await.map_err(multipart_error)?),
            "image" => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was picked.
                if data.is_empty() && file_name.as_deref().unwrap_or("").is_empty() {
                    continue;
                }
                form.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = read_form(multipart).await?;

    let incident_type: IncidentType =
        require_text("type", form.incident_type.as_deref())?.parse()?;
    let description = require_text("description", form.description.as_deref())?.to_string();
    validate_description(&description)?;
    let location = parse_location(require_text("location", form.location.as_deref())?)?;

    let image_url = match &form.image {
        Some(upload) => Some(
            state
                .images
                .store_image(
                    &upload.data,
                    upload.file_name.as_deref(),
                    upload.content_type.as_deref(),
                )
                .await?,
        ),
        None => None,
    };

    let user_id = authenticate(&state.credentials, &headers)
        .ok()
        .map(|p| p.id);

    let created = state.db.lock().await.create_report(&NewReport {
        incident_type,
        description,
        location,
        image_url: image_url.clone(),
        user_id,
    });

    let report = match created {
        Ok(report) => report,
        Err(e) => {
            if let Some(url) = &image_url {
                if let Err(cleanup) = state.images.delete_image(url).await {
                    warn!(url = %url, error = %cleanup, "Failed to remove orphaned image");
                }
            }
            return Err(e.into());
        }
    };

    info!(
        id = %report.id,
        kind = %report.incident_type,
        anonymous = user_id.is_none(),
        "Report created"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Report created successfully", "report": report })),
    ))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<Report>>, ApiError> {
    let reports = state.db.lock().await.list_reports()?;
    Ok(Json(reports))
}

async fn get_report(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .db
        .lock()
        .await
        .get_report(id)
        .map_err(|e| ApiError::from_store("Report", e))?;
    Ok(Json(report))
}

async fn reports_near(
    State(state): State<AppState>,
    query: Result<Query<NearQuery>, QueryRejection>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let (center, radius) = NearQuery::from_request(query)?;
    let reports = state.db.lock().await.reports_near(&center, radius)?;
    Ok(Json(reports))
}

/// A report flattened for map markers.
#[derive(Debug, Serialize)]
pub(super) struct ReportMarker {
    id: Uuid,
    title: String,
    #[serde(rename = "type")]
    incident_type: IncidentType,
    lat: f64,
    lng: f64,
    time: String,
}

pub(super) async fn report_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReportMarker>>, ApiError> {
    let locations = state.db.lock().await.list_report_locations()?;
    let now = Utc::now();

    let markers = locations
        .into_iter()
        .map(|loc| ReportMarker {
            id: loc.id,
            title: format!("{} reported", loc.incident_type.label()),
            incident_type: loc.incident_type,
            lat: loc.location.latitude(),
            lng: loc.location.longitude(),
            time: humanize_since(loc.created_at, now),
        })
        .collect();

    Ok(Json(markers))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

async fn verify_report(
    State(state): State<AppState>,
    principal: Principal,
    EntityId(id): EntityId,
) -> Result<Json<Value>, ApiError> {
    let db = state.db.lock().await;
    db.get_report(id)
        .map_err(|e| ApiError::from_store("Report", e))?;
    ensure_role(&principal, Role::Admin)?;

    let report = db
        .verify_report(id, principal.id)
        .map_err(|e| ApiError::from_store("Report", e))?;
    drop(db);

    info!(id = %id, by = %principal.id, "Report verified");
    Ok(Json(json!({ "message": "Report verified", "report": report })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusRequest {
    status: Option<String>,
}

async fn change_status(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = json_body(body)?;
    let status: ReportStatus = require_text("status", req.status.as_deref())?.parse()?;

    let report = state
        .db
        .lock()
        .await
        .set_report_status(id, status)
        .map_err(|e| ApiError::from_store("Report", e))?;

    info!(id = %id, status = %status, "Report status changed");
    Ok(Json(json!({ "message": "Report status updated", "report": report })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateReportRequest {
    #[serde(rename = "type")]
    incident_type: Option<String>,
    description: Option<String>,
    status: Option<String>,
    location: Option<GeoPoint>,
}

impl UpdateReportRequest {
    fn into_patch(self) -> Result<ReportPatch, ApiError> {
        let incident_type = self
            .incident_type
            .as_deref()
            .map(|t| t.trim().parse::<IncidentType>())
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| s.trim().parse::<ReportStatus>())
            .transpose()?;
        if let Some(description) = &self.description {
            validate_description(description.trim())?;
        }

        Ok(ReportPatch {
            incident_type,
            description: self.description.map(|d| d.trim().to_string()),
            status,
            location: self.location,
        })
    }
}

async fn update_report(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    body: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let patch = json_body(body)?.into_patch()?;

    let report = state
        .db
        .lock()
        .await
        .update_report(id, &patch)
        .map_err(|e| ApiError::from_store("Report", e))?;

    info!(id = %id, "Report updated");
    Ok(Json(json!({ "message": "Report updated successfully", "report": report })))
}

async fn delete_report(
    State(state): State<AppState>,
    principal: Principal,
    EntityId(id): EntityId,
) -> Result<Json<Value>, ApiError> {
    let report = state
        .db
        .lock()
        .await
        .delete_report(id)
        .map_err(|e| ApiError::from_store("Report", e))?;

    if let Some(url) = &report.image_url {
        if let Err(e) = state.images.delete_image(url).await {
            warn!(id = %id, url = %url, error = %e, "Report deleted but image removal failed");
        }
    }

    info!(id = %id, by = %principal.id, "Report deleted");
    Ok(Json(json!({ "message": "Report deleted successfully" })))
}
