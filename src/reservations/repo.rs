use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::repo_types::{Booker, NewReservation, Reservation, ReservationDetails};
use crate::error::{is_db_code, AppError, EXCLUSION_VIOLATION};

/// Persistence seam for the reservation workflow.
#[async_trait]
pub trait ReservationRepo: Send + Sync {
    async fn list_all(&self) -> anyhow::Result<Vec<ReservationDetails>>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ReservationDetails>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ReservationDetails>>;
    /// ACTIVE reservations only.
    async fn find_active(&self, space_id: Uuid, date: Date) -> anyhow::Result<Vec<Reservation>>;
    async fn find_booker(&self, user_id: Uuid) -> anyhow::Result<Option<Booker>>;
    async fn find_space_name(&self, space_id: Uuid) -> anyhow::Result<Option<String>>;
    /// Fails with `AppError::Conflict` when an overlapping ACTIVE reservation
    /// was committed first.
    async fn insert(&self, new: &NewReservation) -> Result<Reservation, AppError>;
    /// ACTIVE -> CANCELLED; `false` when the row was not ACTIVE any more.
    async fn cancel(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn mark_email_sent(&self, id: Uuid) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.reservation_date, r.time_slot, r.status, r.email_sent, r.created_at,
           r.user_id, r.space_id,
           u.username, u.email AS user_email, s.name AS space_name
      FROM reservations r
      JOIN users u ON u.id = r.user_id
      JOIN spaces s ON s.id = r.space_id
"#;

const RESERVATION_COLUMNS: &str =
    "id, reservation_date, time_slot, status, email_sent, created_at, user_id, space_id";

#[derive(Clone)]
pub struct PgReservationRepo {
    db: PgPool,
}

impl PgReservationRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReservationRepo for PgReservationRepo {
    async fn list_all(&self) -> anyhow::Result<Vec<ReservationDetails>> {
        let rows = sqlx::query_as::<_, ReservationDetails>(&format!(
            "{DETAILS_SELECT} ORDER BY r.created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list reservations")?;
        Ok(rows)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ReservationDetails>> {
        let rows = sqlx::query_as::<_, ReservationDetails>(&format!(
            "{DETAILS_SELECT} WHERE r.user_id = $1 ORDER BY r.reservation_date ASC, r.created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list reservations by user")?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ReservationDetails>> {
        let row = sqlx::query_as::<_, ReservationDetails>(&format!("{DETAILS_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find reservation")?;
        Ok(row)
    }

    async fn find_active(&self, space_id: Uuid, date: Date) -> anyhow::Result<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
              FROM reservations
             WHERE space_id = $1 AND reservation_date = $2 AND status = 'ACTIVE'
            "#
        ))
        .bind(space_id)
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("find active reservations")?;
        Ok(rows)
    }

    async fn find_booker(&self, user_id: Uuid) -> anyhow::Result<Option<Booker>> {
        let row = sqlx::query_as::<_, Booker>("SELECT id, username, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("find booker")?;
        Ok(row)
    }

    async fn find_space_name(&self, space_id: Uuid) -> anyhow::Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM spaces WHERE id = $1")
            .bind(space_id)
            .fetch_optional(&self.db)
            .await
            .context("find space name")?;
        Ok(name)
    }

    async fn insert(&self, new: &NewReservation) -> Result<Reservation, AppError> {
        let res = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            INSERT INTO reservations (id, reservation_date, time_slot, user_id, space_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.reservation_date)
        .bind(new.time_slot)
        .bind(new.user_id)
        .bind(new.space_id)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(r) => Ok(r),
            Err(e) if is_db_code(&e, EXCLUSION_VIOLATION) => Err(AppError::booking_conflict()),
            Err(e) => Err(AppError::Internal(anyhow::Error::new(e).context("insert reservation"))),
        }
    }

    async fn cancel(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE reservations SET status = 'CANCELLED' WHERE id = $1 AND status = 'ACTIVE'",
        )
        .bind(id)
        .execute(&self.db)
        .await
        .context("cancel reservation")?;
        Ok(res.rows_affected() > 0)
    }

    async fn mark_email_sent(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE reservations SET email_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("mark email sent")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete reservation")?;
        Ok(res.rows_affected() > 0)
    }
}
