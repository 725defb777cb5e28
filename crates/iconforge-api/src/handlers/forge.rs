//! Icon forging handler

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    handlers::materials::parse_algorithm,
    state::AppState,
};

/// Multipart body of a forge request
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ForgeForm {
    /// Material identifier
    source_id: String,
    /// Resample algorithm for the 48 and 32 frames
    mid_algo: String,
    /// 16x16 PNG icon
    #[schema(value_type = String, format = Binary)]
    tiny_icon: Vec<u8>,
}

#[derive(Default)]
struct ForgeParts {
    source_id: Option<String>,
    mid_algo: Option<String>,
    tiny_icon: Option<Vec<u8>>,
}

async fn read_parts(multipart: &mut Multipart, max_bytes: usize) -> ApiResult<ForgeParts> {
    let rejected = |err| ApiError::from_multipart(err, max_bytes);
    let mut parts = ForgeParts::default();
    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        match field.name() {
            Some("source_id") => {
                parts.source_id = Some(field.text().await.map_err(rejected)?.trim().to_string())
            }
            Some("mid_algo") => parts.mid_algo = Some(field.text().await.map_err(rejected)?),
            Some("tiny_icon") => {
                parts.tiny_icon = Some(field.bytes().await.map_err(rejected)?.to_vec())
            }
            _ => {}
        }
    }
    Ok(parts)
}

/// Pack a material, two derived previews and a supplied 16px frame into an ICO
#[utoipa::path(
    post,
    path = "/api/v1/forge",
    tag = "forge",
    request_body(content = ForgeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "ICO file", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 400, description = "Invalid frame or algorithm", body = crate::models::ProblemDetails),
        (status = 404, description = "Unknown or expired material", body = crate::models::ProblemDetails)
    )
)]
pub async fn forge_icon(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let max_bytes = state.forge.validator().config().max_upload_size_bytes;
    let parts = read_parts(&mut multipart, max_bytes).await?;

    let source_id = parts
        .source_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Parameter 'source_id' is required".to_string()))?;
    let mid_algo = parse_algorithm(parts.mid_algo.as_deref(), "mid_algo")?;
    let tiny_icon = parts
        .tiny_icon
        .ok_or_else(|| ApiError::BadRequest("Parameter 'tiny_icon' is required".to_string()))?;

    let ico = state.forge.forge_icon(&source_id, mid_algo, tiny_icon).await?;
    info!("Serving {}.ico ({} bytes)", source_id, ico.len());

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.ico\"", source_id),
        ),
    ];
    Ok((headers, ico))
}
