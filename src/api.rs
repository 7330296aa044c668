use actix_web::http::{header, StatusCode};
use actix_web::{get, post, web, HttpRequest, HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::feed::FeedSource;
use crate::geocode::GeocodeClient;
use crate::models::sighting::{AgeBucket, NewSighting, ReportedTime, Sighting};
use crate::store::SightingStore;
use crate::sync::{SyncError, SyncJob, SyncOptions};
use crate::uploads::{FileVaultClient, ImageHostClient};

/// Shared handler state. The store and feed are trait objects so handlers can
/// be exercised against in-memory doubles.
pub struct AppState {
    pub config: AppConfig,
    pub sync_options: SyncOptions,
    pub store: Arc<dyn SightingStore>,
    pub feed: Arc<dyn FeedSource>,
    pub geocoder: GeocodeClient,
    pub images: ImageHostClient,
    pub vault: FileVaultClient,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("Sighting not found")]
    NotFound,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Sync(SyncError::Feed(_)) => StatusCode::BAD_GATEWAY,
            Self::Sync(SyncError::Transform(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Sync(e) => json!({
                "success": false,
                "error": "Failed to sync data",
                "details": e.to_string(),
            }),
            other => json!({ "success": false, "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// A sighting as returned to clients, with its marker age bucket attached.
#[derive(Debug, Serialize)]
pub struct SightingView {
    #[serde(flatten)]
    pub sighting: Sighting,
    pub age: AgeBucket,
}

impl SightingView {
    fn new(sighting: Sighting, now: DateTime<Utc>) -> Self {
        let age = AgeBucket::for_age(sighting.time_date, now);
        Self { sighting, age }
    }
}

fn is_authorized(req: &HttpRequest, token: &str) -> bool {
    let expected = format!("Bearer {}", token);
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

/// Triggers a sync run. Gated by the shared-secret bearer token; a mismatch
/// is refused before any sweep, fetch, or insert happens.
#[get("/api/sync")]
async fn run_sync(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if !is_authorized(&req, &state.config.sync_token) {
        return Err(ApiError::Unauthorized);
    }

    info!("Starting sync run");
    let job = SyncJob::new(
        Arc::clone(&state.store),
        Arc::clone(&state.feed),
        state.sync_options,
    );
    let summary = job.run().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": summary.message(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct SubmitSighting {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub uniform: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time_date: ReportedTime,
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Direct submission: host the photo if one was attached, fill in a blank
/// location via reverse geocoding, resolve the reported-time offset, insert.
#[post("/api/sightings")]
async fn submit_sighting(
    state: web::Data<AppState>,
    body: web::Json<SubmitSighting>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let image_url = match body.image_base64.as_deref().filter(|d| !d.is_empty()) {
        Some(data) => Some(state.images.upload(data).await?),
        None => None,
    };

    let location = if body.location.trim().is_empty() {
        state.geocoder.location_name(body.lat, body.lng).await
    } else {
        body.location.clone()
    };

    let now = Utc::now();
    let sighting = state
        .store
        .insert(NewSighting {
            lat: body.lat,
            lng: body.lng,
            description: body.description,
            size: body.size,
            activity: body.activity,
            uniform: body.uniform,
            equipment: body.equipment,
            location,
            time_date: body.time_date.resolve(now),
            image_url,
        })
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "sighting": SightingView::new(sighting, now),
    })))
}

/// Everything inside the retention window, newest first.
#[get("/api/sightings")]
async fn list_sightings(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let cutoff = now - state.sync_options.retention;
    let rows = state.store.list_since(cutoff).await?;
    let views: Vec<SightingView> = rows
        .into_iter()
        .map(|s| SightingView::new(s, now))
        .collect();
    Ok(HttpResponse::Ok().json(views))
}

#[get("/api/sightings/{id}")]
async fn get_sighting(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let sighting = state.store.get(id).await?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(SightingView::new(sighting, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct ImageUploadRequest {
    pub base64_data: Option<String>,
}

#[post("/api/uploads/image")]
async fn upload_image(
    state: web::Data<AppState>,
    body: web::Json<ImageUploadRequest>,
) -> Result<HttpResponse, ApiError> {
    let data = body
        .base64_data
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing image data".to_string()))?;
    let image_url = state.images.upload(data).await?;
    Ok(HttpResponse::Ok().json(json!({ "image_url": image_url })))
}

#[derive(Debug, Deserialize)]
pub struct VaultCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct FileUploadRequest {
    pub filename: String,
    pub base64_data: String,
    pub credentials: VaultCredentials,
}

#[post("/api/uploads/file")]
async fn upload_file(
    state: web::Data<AppState>,
    body: web::Json<FileUploadRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.filename.is_empty() || body.base64_data.is_empty() {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    }
    if body.credentials.email.is_empty() || body.credentials.password.is_empty() {
        return Err(ApiError::BadRequest("Missing vault credentials".to_string()));
    }

    let uploaded = state
        .vault
        .upload(
            &body.filename,
            &body.base64_data,
            &body.credentials.email,
            &body.credentials.password,
        )
        .await?;
    Ok(HttpResponse::Ok().json(uploaded))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(run_sync)
        .service(submit_sighting)
        .service(list_sightings)
        .service(get_sighting)
        .service(upload_image)
        .service(upload_file);
}
