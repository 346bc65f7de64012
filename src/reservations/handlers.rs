use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateReservationRequest, ReservationResponse},
    services,
};
use crate::{auth::jwt::AuthUser, error::AppError, response::ApiResponse, state::AppState};

pub fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_all).post(create))
        .route("/reservations/me", get(list_mine))
        .route("/reservations/:id", get(get_one).delete(delete))
        .route("/reservations/:id/cancel", patch(cancel))
}

fn to_responses(rows: Vec<super::repo_types::ReservationDetails>) -> Vec<ReservationResponse> {
    rows.into_iter().map(ReservationResponse::from).collect()
}

#[instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<Vec<ReservationResponse>>>, AppError> {
    let rows = services::list_all(state.reservations.as_ref(), &principal).await?;
    Ok(Json(ApiResponse::of("Reservations retrieved", to_responses(rows))))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<Vec<ReservationResponse>>>, AppError> {
    let rows = services::list_mine(state.reservations.as_ref(), &principal).await?;
    Ok(Json(ApiResponse::of("Your reservations", to_responses(rows))))
}

#[instrument(skip(state))]
pub async fn get_one(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let row = services::get(state.reservations.as_ref(), &principal, id).await?;
    Ok(Json(ApiResponse::of("Reservation retrieved", row.into())))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationResponse>>), AppError> {
    let today = OffsetDateTime::now_utc().date();
    let row = services::create(
        state.reservations.as_ref(),
        state.notifier.as_ref(),
        &principal,
        &payload,
        today,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::of("Reservation created", row.into())),
    ))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let row = services::cancel(
        state.reservations.as_ref(),
        state.notifier.as_ref(),
        &principal,
        id,
    )
    .await?;
    Ok(Json(ApiResponse::of("Reservation cancelled", row.into())))
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    services::delete(state.reservations.as_ref(), &principal, id).await?;
    Ok(Json(ApiResponse::message("Reservation deleted")))
}
