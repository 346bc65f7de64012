use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::policy::{authorize, Action, Principal},
    error::AppError,
};

/// Reservable portion of a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "time_slot", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    FullDay,
}

impl TimeSlot {
    #[cfg(test)]
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::FullDay];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Morning => "MORNING",
            TimeSlot::Afternoon => "AFTERNOON",
            TimeSlot::FullDay => "FULL_DAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "reservation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub reservation_date: Date,
    pub time_slot: TimeSlot,
    pub status: ReservationStatus,
    pub email_sent: bool,
    pub created_at: OffsetDateTime,
    pub user_id: Uuid,
    pub space_id: Uuid,
}

impl Reservation {
    /// ACTIVE -> CANCELLED. Owner or admin only; never back to ACTIVE.
    pub fn cancel(&mut self, by: &Principal) -> Result<(), AppError> {
        authorize(by, Action::CancelReservation, Some(self.user_id))?;
        match self.status {
            ReservationStatus::Active => {
                self.status = ReservationStatus::Cancelled;
                Ok(())
            }
            ReservationStatus::Cancelled => Err(AppError::InvalidState(
                "This reservation is already cancelled".into(),
            )),
            ReservationStatus::Completed => Err(AppError::InvalidState(
                "A completed reservation cannot be cancelled".into(),
            )),
        }
    }
}

/// Reservation joined with its owner and space, as returned to clients.
#[derive(Debug, Clone, FromRow)]
pub struct ReservationDetails {
    #[sqlx(flatten)]
    pub reservation: Reservation,
    pub username: String,
    pub user_email: String,
    pub space_name: String,
}

/// Owner fields needed to book and notify.
#[derive(Debug, Clone, FromRow)]
pub struct Booker {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub reservation_date: Date,
    pub time_slot: TimeSlot,
    pub user_id: Uuid,
    pub space_id: Uuid,
}
