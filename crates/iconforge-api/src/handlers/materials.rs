//! Material API handlers

use std::str::FromStr;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use iconforge_images::ResampleAlgorithm;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    models::{png_data_uri, MaterialResponse, PreviewQuery, PreviewResponse},
    state::AppState,
};

/// Preview sizes the API serves.
pub const PREVIEW_SIZES: [u32; 2] = [32, 48];

/// Preview size used when the query omits one.
pub const DEFAULT_PREVIEW_SIZE: u32 = 48;

/// Filename used when the multipart part carries none.
const DEFAULT_FILENAME: &str = "upload.png";

/// Multipart body of an upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Source image (PNG, JPEG or WebP)
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Upload a source image and turn it into a material
#[utoipa::path(
    post,
    path = "/api/v1/materials/upload",
    tag = "materials",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Material created", body = MaterialResponse),
        (status = 400, description = "Upload rejected", body = crate::models::ProblemDetails),
        (status = 500, description = "Processing failed", body = crate::models::ProblemDetails)
    )
)]
pub async fn upload_material(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MaterialResponse>)> {
    let max_bytes = state.forge.validator().config().max_upload_size_bytes;
    let rejected = |err| ApiError::from_multipart(err, max_bytes);

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or(DEFAULT_FILENAME).to_string();
            let bytes = field.bytes().await.map_err(rejected)?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Multipart field 'file' is required".to_string()))?;

    let record = state.forge.upload(bytes, &filename).await?;
    let png = state.forge.material_bytes(&record.material_id).await?;
    info!("Material {} created from {}", record.material_id, record.filename);

    Ok((
        StatusCode::CREATED,
        Json(MaterialResponse::from_record(
            &record,
            &png,
            state.forge.expires_in(&record),
        )),
    ))
}

/// Fetch a material
#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material", body = MaterialResponse),
        (status = 404, description = "Unknown or expired material", body = crate::models::ProblemDetails)
    )
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MaterialResponse>> {
    let record = state.forge.material(&id).await?;
    let png = state.forge.material_bytes(&id).await?;
    Ok(Json(MaterialResponse::from_record(
        &record,
        &png,
        state.forge.expires_in(&record),
    )))
}

/// Delete a material and its previews
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 204, description = "Material deleted or already gone")
    )
)]
pub async fn delete_material(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.forge.delete(&id).await {
        info!("Material {} deleted", id);
    }
    StatusCode::NO_CONTENT
}

/// Resized preview of a material
#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}/preview",
    tag = "materials",
    params(("id" = String, Path, description = "Material id"), PreviewQuery),
    responses(
        (status = 200, description = "Preview", body = PreviewResponse),
        (status = 400, description = "Invalid algorithm or size", body = crate::models::ProblemDetails),
        (status = 404, description = "Unknown or expired material", body = crate::models::ProblemDetails)
    )
)]
pub async fn get_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let algorithm = parse_algorithm(query.algo.as_deref(), "algo")?;
    let size = parse_preview_size(query.size.as_deref())?;

    let png = state.forge.preview(&id, algorithm, size).await?;
    Ok(Json(PreviewResponse {
        material_id: id,
        algorithm: algorithm.to_string(),
        size,
        image_base64: png_data_uri(&png),
    }))
}

/// Parse a required algorithm parameter.
pub(crate) fn parse_algorithm(value: Option<&str>, name: &str) -> ApiResult<ResampleAlgorithm> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Parameter '{}' is required", name)))?;
    Ok(ResampleAlgorithm::from_str(value)?)
}

fn parse_preview_size(value: Option<&str>) -> ApiResult<u32> {
    let size = match value {
        None => DEFAULT_PREVIEW_SIZE,
        Some(raw) => raw.trim().parse().unwrap_or(0),
    };
    if PREVIEW_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(ApiError::BadRequest(
            "Preview size must be either 32 or 48 pixels".to_string(),
        ))
    }
}
