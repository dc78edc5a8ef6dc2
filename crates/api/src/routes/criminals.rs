//! Criminal record route handlers (`/api/criminals`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crime_track_core::CriminalId;

use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::{Criminal, CriminalSearch, CriminalUpdate};
use crate::services::{CriminalError, CriminalService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCriminalRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Parse a path id; anything unparseable cannot name a record.
fn record_id(raw: &str) -> Result<CriminalId, AppError> {
    raw.parse()
        .map_err(|_| CriminalError::NotFound.into())
}

/// `GET /api/criminals?keyword=`
pub async fn index(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Criminal>>, AppError> {
    let search = CriminalSearch::from_keyword(query.keyword.as_deref());
    let criminals = CriminalService::new(&state).list(search.as_ref()).await?;
    Ok(Json(criminals))
}

/// `POST /api/criminals`
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateCriminalRequest>,
) -> Result<(StatusCode, Json<Criminal>), AppError> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Criminal name is required!".to_string()))?;

    let criminal = CriminalService::new(&state).create(&name).await?;
    tracing::debug!(user_id = %user.id, criminal_id = %criminal.id, "Record created by user");

    Ok((StatusCode::CREATED, Json(criminal)))
}

/// `GET /api/criminals/{id}` - public.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Criminal>, AppError> {
    let criminal = CriminalService::new(&state).get(record_id(&id)?).await?;
    Ok(Json(criminal))
}

/// `PUT /api/criminals/{id}`
pub async fn update(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CriminalUpdate>,
) -> Result<Json<Criminal>, AppError> {
    let criminal = CriminalService::new(&state)
        .update(record_id(&id)?, update)
        .await?;
    Ok(Json(criminal))
}

/// `DELETE /api/criminals/{id}`
pub async fn delete(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    CriminalService::new(&state).delete(record_id(&id)?).await?;
    Ok(Json(MessageResponse {
        message: "Criminal deleted successfully!",
    }))
}

/// `PUT /api/criminals/{id}/image`
pub async fn upload_image(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ImageRequest>,
) -> Result<Json<Criminal>, AppError> {
    let id = record_id(&id)?;
    let image = body
        .image
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Image is required".to_string()))?;

    let criminal = CriminalService::new(&state)
        .replace_image(id, &image)
        .await?;
    Ok(Json(criminal))
}
