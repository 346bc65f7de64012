use std::{collections::HashMap, sync::Arc, sync::Mutex};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::Barrier;
use uuid::Uuid;

use super::{
    repo::ReservationRepo,
    repo_types::{Booker, NewReservation, Reservation, ReservationDetails, ReservationStatus},
};
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, Booker>,
    spaces: HashMap<Uuid, String>,
    reservations: Vec<Reservation>,
    delete_after_read: Option<Uuid>,
}

/// In-memory stand-in for Postgres. `insert` applies the same overlap guard
/// as the exclusion constraint, under one lock.
#[derive(Default)]
pub struct MemoryReservationRepo {
    tables: Mutex<Tables>,
    /// When set, `find_active` waits here after reading, so concurrent
    /// bookings all see the same (stale) snapshot before inserting.
    read_gate: Option<Arc<Barrier>>,
}

impl MemoryReservationRepo {
    pub fn with_read_gate(parties: usize) -> Self {
        Self {
            read_gate: Some(Arc::new(Barrier::new(parties))),
            ..Self::default()
        }
    }

    pub fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().users.insert(
            id,
            Booker {
                id,
                username: username.into(),
                email: format!("{username}@example.com"),
            },
        );
        id
    }

    pub fn add_space(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().spaces.insert(id, name.into());
        id
    }

    /// The next `find_by_id(id)` returns the row, then drops it, as if an
    /// admin deleted it concurrently.
    pub fn delete_after_next_read(&self, id: Uuid) {
        self.tables.lock().unwrap().delete_after_read = Some(id);
    }

    pub fn status_of(&self, id: Uuid) -> Option<ReservationStatus> {
        self.tables
            .lock()
            .unwrap()
            .reservations
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }

    pub fn active_count(&self) -> usize {
        self.tables
            .lock()
            .unwrap()
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Active)
            .count()
    }

    fn details(t: &Tables, r: &Reservation) -> ReservationDetails {
        let user = &t.users[&r.user_id];
        ReservationDetails {
            reservation: r.clone(),
            username: user.username.clone(),
            user_email: user.email.clone(),
            space_name: t.spaces[&r.space_id].clone(),
        }
    }
}

#[async_trait]
impl ReservationRepo for MemoryReservationRepo {
    async fn list_all(&self) -> anyhow::Result<Vec<ReservationDetails>> {
        let t = self.tables.lock().unwrap();
        Ok(t.reservations.iter().rev().map(|r| Self::details(&t, r)).collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ReservationDetails>> {
        let t = self.tables.lock().unwrap();
        Ok(t.reservations
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| Self::details(&t, r))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ReservationDetails>> {
        let mut t = self.tables.lock().unwrap();
        let found = t
            .reservations
            .iter()
            .find(|r| r.id == id)
            .map(|r| Self::details(&t, r));
        if t.delete_after_read == Some(id) {
            t.delete_after_read = None;
            t.reservations.retain(|r| r.id != id);
        }
        Ok(found)
    }

    async fn find_active(&self, space_id: Uuid, date: Date) -> anyhow::Result<Vec<Reservation>> {
        let rows: Vec<Reservation> = {
            let t = self.tables.lock().unwrap();
            t.reservations
                .iter()
                .filter(|r| {
                    r.space_id == space_id
                        && r.reservation_date == date
                        && r.status == ReservationStatus::Active
                })
                .cloned()
                .collect()
        };
        if let Some(gate) = &self.read_gate {
            gate.wait().await;
        }
        Ok(rows)
    }

    async fn find_booker(&self, user_id: Uuid) -> anyhow::Result<Option<Booker>> {
        Ok(self.tables.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn find_space_name(&self, space_id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self.tables.lock().unwrap().spaces.get(&space_id).cloned())
    }

    async fn insert(&self, new: &NewReservation) -> Result<Reservation, AppError> {
        let mut t = self.tables.lock().unwrap();
        let clash = t.reservations.iter().any(|r| {
            r.status == ReservationStatus::Active
                && r.space_id == new.space_id
                && r.reservation_date == new.reservation_date
                && r.time_slot.overlaps(new.time_slot)
        });
        if clash {
            return Err(AppError::booking_conflict());
        }
        let row = Reservation {
            id: Uuid::new_v4(),
            reservation_date: new.reservation_date,
            time_slot: new.time_slot,
            status: ReservationStatus::Active,
            email_sent: false,
            created_at: OffsetDateTime::now_utc(),
            user_id: new.user_id,
            space_id: new.space_id,
        };
        t.reservations.push(row.clone());
        Ok(row)
    }

    async fn cancel(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        match t
            .reservations
            .iter_mut()
            .find(|r| r.id == id && r.status == ReservationStatus::Active)
        {
            Some(r) => {
                r.status = ReservationStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_email_sent(&self, id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(r) = t.reservations.iter_mut().find(|r| r.id == id) {
            r.email_sent = true;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.reservations.len();
        t.reservations.retain(|r| r.id != id);
        Ok(t.reservations.len() < before)
    }
}
