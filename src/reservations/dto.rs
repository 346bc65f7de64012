use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{ReservationDetails, ReservationStatus, TimeSlot};
use crate::error::AppError;

/// Body of `POST /reservations`. Fields are optional so that a missing value
/// is reported as a validation error instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub reservation_date: Option<Date>,
    pub time_slot: Option<TimeSlot>,
    pub space_id: Option<Uuid>,
}

/// A request that passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidReservationRequest {
    pub reservation_date: Date,
    pub time_slot: TimeSlot,
    pub space_id: Uuid,
}

impl CreateReservationRequest {
    pub fn validate(&self, today: Date) -> Result<ValidReservationRequest, AppError> {
        let reservation_date = self
            .reservation_date
            .ok_or_else(|| AppError::Validation("reservation_date: Reservation date is required".into()))?;
        let time_slot = self
            .time_slot
            .ok_or_else(|| AppError::Validation("time_slot: Time slot is required".into()))?;
        let space_id = self
            .space_id
            .ok_or_else(|| AppError::Validation("space_id: Space id is required".into()))?;
        if reservation_date < today {
            return Err(AppError::Validation(
                "reservation_date: Reservation date cannot be in the past".into(),
            ));
        }
        Ok(ValidReservationRequest {
            reservation_date,
            time_slot,
            space_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub reservation_date: Date,
    pub time_slot: TimeSlot,
    pub status: ReservationStatus,
    pub email_sent: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_id: Uuid,
    pub username: String,
    pub space_id: Uuid,
    pub space_name: String,
}

impl From<ReservationDetails> for ReservationResponse {
    fn from(d: ReservationDetails) -> Self {
        let r = d.reservation;
        Self {
            id: r.id,
            reservation_date: r.reservation_date,
            time_slot: r.time_slot,
            status: r.status,
            email_sent: r.email_sent,
            created_at: r.created_at,
            user_id: r.user_id,
            username: d.username,
            space_id: r.space_id,
            space_name: d.space_name,
        }
    }
}
