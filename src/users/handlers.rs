use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::UserResponse,
    services::{self, USER_PART},
};
use crate::{
    auth::jwt::AuthUser, error::AppError, images::form::JsonWithFile, response::ApiResponse,
    state::AppState,
};

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).put(update_me))
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/users/:id/image",
            post(upload_user_image).delete(delete_user_image),
        )
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = services::me(&state, &principal).await?;
    Ok(Json(ApiResponse::of("User retrieved", user)))
}

#[instrument(skip(state, mp))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    mp: Multipart,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let form = JsonWithFile::read(mp, USER_PART).await?;
    let user = services::update_me(&state, &principal, form).await?;
    Ok(Json(ApiResponse::of("Profile updated", user)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let users = services::list(&state, &principal).await?;
    Ok(Json(ApiResponse::of("Users retrieved", users)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = services::get(&state, &principal, id).await?;
    Ok(Json(ApiResponse::of("User retrieved", user)))
}

#[instrument(skip(state, mp))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let form = JsonWithFile::read(mp, USER_PART).await?;
    let user = services::update(&state, &principal, id, form).await?;
    Ok(Json(ApiResponse::of("User updated", user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete(&state, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, mp))]
pub async fn upload_user_image(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let form = JsonWithFile::read(mp, USER_PART).await?;
    let user = services::set_image(&state, &principal, id, form).await?;
    Ok(Json(ApiResponse::of("Image uploaded", user)))
}

#[instrument(skip(state))]
pub async fn delete_user_image(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = services::remove_image(&state, &principal, id).await?;
    Ok(Json(ApiResponse::of("Image deleted", user)))
}
