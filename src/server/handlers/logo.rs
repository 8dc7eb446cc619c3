//! Logo session API handlers.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::export::{BlurLevel, EXPORT_FILE_NAME};
use crate::pipeline::{CropOutcome, Pipeline};
use crate::render::crop::CropRegion;
use crate::source::SourceImage;

use super::super::state::{AppState, LogoSession};
use super::{ApiError, error_response};

/// Response from upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// Request body for the color endpoint: a hex value or an eyedropper pick.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ColorRequest {
    Hex { hex: String },
    Pick { x: u32, y: u32 },
}

/// Query parameters for preview endpoint.
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub blur: Option<u8>,
}

/// Request body for export endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub blur_level: Option<BlurLevel>,
}

/// Look up a session and keep it alive.
async fn pipeline_for(state: &AppState, id: &str) -> Result<Pipeline, ApiError> {
    let session_id = Uuid::parse_str(id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid session ID"))?;

    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Session not found or expired"))?;
    session.touch();
    Ok(session.pipeline.clone())
}

/// POST /api/logo/upload - Upload a photo and start a session.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut image_data: Option<(Vec<u8>, String)> = None;
    let mut filename = String::from("unknown");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("image") {
            filename = field.file_name().unwrap_or("unknown").to_string();
            let mime = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());
            let bytes = field.bytes().await.map_err(|e| {
                error_response(StatusCode::BAD_REQUEST, format!("Failed to read image: {}", e))
            })?;
            image_data = Some((bytes.to_vec(), mime));
            break;
        }
    }

    let (bytes, mime) =
        image_data.ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "No image field found"))?;

    // Decoding is CPU-bound
    let source = tokio::task::spawn_blocking(move || SourceImage::from_bytes(&bytes, &mime))
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Task error: {}", e)))??;

    let (width, height) = (source.width(), source.height());
    let pipeline = Pipeline::new(state.compositor.clone());
    pipeline.set_source(source).await;

    let session_id = Uuid::new_v4();
    state
        .sessions
        .write()
        .await
        .insert(session_id, LogoSession::new(pipeline));
    log::info!("session {} created for {} ({}x{})", session_id, filename, width, height);

    Ok(Json(UploadResponse {
        id: session_id.to_string(),
        filename,
        width,
        height,
    }))
}

/// POST /api/logo/:id/crop - Crop the photo and derive the border color.
pub async fn crop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(region): Json<CropRegion>,
) -> Result<Json<CropOutcome>, ApiError> {
    let pipeline = pipeline_for(&state, &id).await?;
    Ok(Json(pipeline.crop(region).await?))
}

/// GET /api/logo/:id/cropped - The cropped image as PNG.
pub async fn cropped(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = pipeline_for(&state, &id).await?;
    let png = pipeline
        .session()
        .read()
        .await
        .cropped
        .as_ref()
        .map(|c| c.png.clone())
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Image has not been cropped"))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// PUT /api/logo/:id/color - Override the border color.
pub async fn color(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ColorRequest>,
) -> Result<Json<Value>, ApiError> {
    let pipeline = pipeline_for(&state, &id).await?;
    let sample = match req {
        ColorRequest::Hex { hex } => pipeline.set_color_hex(&hex).await?,
        ColorRequest::Pick { x, y } => pipeline.pick_color(x, y).await?,
    };
    Ok(Json(json!({ "color": sample })))
}

/// GET /api/logo/:id/preview - Snapshot PNG for printing.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = pipeline_for(&state, &id).await?;
    if let Some(blur) = query.blur {
        pipeline.set_blur(BlurLevel::new(blur)?).await;
    }
    let png = pipeline.preview().await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// POST /api/logo/:id/export - Download the logo as PrintCopy.pdf.
pub async fn export(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = pipeline_for(&state, &id).await?;
    if let Some(level) = req.blur_level {
        pipeline.set_blur(level).await;
    }

    let artifact = pipeline.export().await.map_err(|e| {
        log::error!("export failed for session {}: {}", id, e);
        ApiError::from(e)
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        artifact.pdf,
    ))
}
