use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{SpaceFilter, SpaceResponse},
    services::{self, SPACE_PART},
};
use crate::{
    auth::jwt::AuthUser, error::AppError, images::form::JsonWithFile, response::ApiResponse,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/spaces", get(list_spaces))
        .route("/spaces/:id", get(get_space))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/spaces", axum::routing::post(create_space))
        .route(
            "/spaces/:id",
            axum::routing::put(update_space).delete(delete_space),
        )
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn list_spaces(
    State(state): State<AppState>,
    Query(filter): Query<SpaceFilter>,
) -> Result<Json<ApiResponse<Vec<SpaceResponse>>>, AppError> {
    let spaces = services::list(&state, filter.space_type).await?;
    Ok(Json(ApiResponse::of("Spaces retrieved", spaces)))
}

#[instrument(skip(state))]
pub async fn get_space(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SpaceResponse>>, AppError> {
    let space = services::get(&state, id).await?;
    Ok(Json(ApiResponse::of("Space retrieved", space)))
}

#[instrument(skip(state, mp))]
pub async fn create_space(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<SpaceResponse>>), AppError> {
    let form = JsonWithFile::read(mp, SPACE_PART).await?;
    let space = services::create(&state, &principal, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::of("Space created", space)),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_space(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<ApiResponse<SpaceResponse>>, AppError> {
    let form = JsonWithFile::read(mp, SPACE_PART).await?;
    let space = services::update(&state, &principal, id, form).await?;
    Ok(Json(ApiResponse::of("Space updated", space)))
}

#[instrument(skip(state))]
pub async fn delete_space(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete(&state, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
