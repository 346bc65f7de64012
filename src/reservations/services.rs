use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    availability::is_available,
    dto::CreateReservationRequest,
    repo::ReservationRepo,
    repo_types::{NewReservation, ReservationDetails},
};
use crate::{
    auth::policy::{authorize, Action, Principal},
    email::{Notifier, ReservationNotice},
    error::AppError,
};

fn notice_for(d: &ReservationDetails) -> ReservationNotice {
    ReservationNotice {
        recipient: d.user_email.clone(),
        username: d.username.clone(),
        space_name: d.space_name.clone(),
        date: d.reservation.reservation_date,
        slot: d.reservation.time_slot,
    }
}

pub async fn list_all(
    repo: &dyn ReservationRepo,
    principal: &Principal,
) -> Result<Vec<ReservationDetails>, AppError> {
    authorize(principal, Action::ListAllReservations, None)?;
    Ok(repo.list_all().await?)
}

pub async fn list_mine(
    repo: &dyn ReservationRepo,
    principal: &Principal,
) -> Result<Vec<ReservationDetails>, AppError> {
    Ok(repo.list_by_user(principal.id).await?)
}

pub async fn get(
    repo: &dyn ReservationRepo,
    principal: &Principal,
    id: Uuid,
) -> Result<ReservationDetails, AppError> {
    let details = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Reservation", id))?;
    authorize(principal, Action::ViewReservation, Some(details.reservation.user_id))?;
    Ok(details)
}

/// Books a slot for the principal.
///
/// The availability check rejects the common case early; the repository's
/// insert is still the authority when two requests race past the check.
pub async fn create(
    repo: &dyn ReservationRepo,
    notifier: &dyn Notifier,
    principal: &Principal,
    req: &CreateReservationRequest,
    today: Date,
) -> Result<ReservationDetails, AppError> {
    let req = req.validate(today)?;

    let booker = repo
        .find_booker(principal.id)
        .await?
        .ok_or_else(|| AppError::not_found("User", principal.id))?;
    let space_name = repo
        .find_space_name(req.space_id)
        .await?
        .ok_or_else(|| AppError::not_found("Space", req.space_id))?;

    let booked = repo.find_active(req.space_id, req.reservation_date).await?;
    if !is_available(req.time_slot, booked.iter().map(|r| r.time_slot)) {
        warn!(space_id = %req.space_id, date = %req.reservation_date, slot = ?req.time_slot,
            "slot already booked");
        return Err(AppError::booking_conflict());
    }

    let mut reservation = repo
        .insert(&NewReservation {
            reservation_date: req.reservation_date,
            time_slot: req.time_slot,
            user_id: booker.id,
            space_id: req.space_id,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::Conflict(_)) {
                warn!(space_id = %req.space_id, date = %req.reservation_date, slot = ?req.time_slot,
                    "concurrent booking rejected by database");
            }
        })?;
    info!(reservation_id = %reservation.id, user_id = %booker.id, space_id = %req.space_id,
        "reservation created");

    let notice = ReservationNotice {
        recipient: booker.email.clone(),
        username: booker.username.clone(),
        space_name: space_name.clone(),
        date: reservation.reservation_date,
        slot: reservation.time_slot,
    };
    match notifier.reservation_confirmed(&notice).await {
        Ok(()) => match repo.mark_email_sent(reservation.id).await {
            Ok(()) => reservation.email_sent = true,
            Err(e) => warn!(error = %e, reservation_id = %reservation.id, "could not flag email as sent"),
        },
        Err(e) => warn!(error = %e, reservation_id = %reservation.id, "confirmation email failed"),
    }

    Ok(ReservationDetails {
        reservation,
        username: booker.username,
        user_email: booker.email,
        space_name,
    })
}

pub async fn cancel(
    repo: &dyn ReservationRepo,
    notifier: &dyn Notifier,
    principal: &Principal,
    id: Uuid,
) -> Result<ReservationDetails, AppError> {
    let mut details = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Reservation", id))?;

    details.reservation.cancel(principal)?;
    if !repo.cancel(id).await? {
        if repo.find_by_id(id).await?.is_none() {
            return Err(AppError::not_found("Reservation", id));
        }
        return Err(AppError::InvalidState(
            "This reservation is already cancelled".into(),
        ));
    }
    info!(reservation_id = %id, by = %principal.id, "reservation cancelled");

    if let Err(e) = notifier.reservation_cancelled(&notice_for(&details)).await {
        warn!(error = %e, reservation_id = %id, "cancellation email failed");
    }
    Ok(details)
}

/// Hard delete regardless of status. Admin only.
pub async fn delete(
    repo: &dyn ReservationRepo,
    principal: &Principal,
    id: Uuid,
) -> Result<(), AppError> {
    authorize(principal, Action::DeleteReservation, None)?;
    if !repo.delete(id).await? {
        return Err(AppError::not_found("Reservation", id));
    }
    info!(reservation_id = %id, by = %principal.id, "reservation deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::date;

    use super::*;
    use crate::{
        email::testing::RecordingNotifier,
        reservations::{
            memory::MemoryReservationRepo,
            repo_types::{ReservationStatus, TimeSlot},
        },
        users::repo_types::Role,
    };

    const TODAY: Date = date!(2025 - 05 - 20);

    fn user(id: Uuid) -> Principal {
        Principal { id, role: Role::User }
    }

    fn request(space_id: Uuid, date: Date, slot: TimeSlot) -> CreateReservationRequest {
        CreateReservationRequest {
            reservation_date: Some(date),
            time_slot: Some(slot),
            space_id: Some(space_id),
        }
    }

    #[tokio::test]
    async fn afternoon_booking_scenario() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let s = repo.add_space("Sala Hopper");
        let day = date!(2025 - 06 - 01);

        create(&repo, &mail, &u, &request(s, day, TimeSlot::Afternoon), TODAY)
            .await
            .expect("afternoon is free");

        create(&repo, &mail, &u, &request(s, day, TimeSlot::Morning), TODAY)
            .await
            .expect("morning does not overlap afternoon");

        let err = create(&repo, &mail, &u, &request(s, day, TimeSlot::FullDay), TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        create(&repo, &mail, &u, &request(s, date!(2025 - 06 - 02), TimeSlot::FullDay), TODAY)
            .await
            .expect("another date is unaffected");

        assert_eq!(repo.active_count(), 3);
    }

    #[tokio::test]
    async fn confirmation_sets_email_flag() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let s = repo.add_space("Mesa 1");

        let d = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap();
        assert!(d.reservation.email_sent);
        assert_eq!(mail.sent(), vec!["confirmed:ana@example.com:Mesa 1".to_string()]);

        let stored = repo.find_by_id(d.reservation.id).await.unwrap().unwrap();
        assert!(stored.reservation.email_sent);
    }

    #[tokio::test]
    async fn failed_notification_keeps_reservation() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        mail.set_failing(true);
        let u = user(repo.add_user("ana"));
        let s = repo.add_space("Mesa 1");

        let d = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::FullDay), TODAY)
            .await
            .expect("mail failure must not fail the booking");
        assert!(!d.reservation.email_sent);
        assert_eq!(repo.status_of(d.reservation.id), Some(ReservationStatus::Active));
    }

    #[tokio::test]
    async fn unknown_space_or_user_is_not_found() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));

        let err = create(&repo, &mail, &u, &request(Uuid::new_v4(), TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "Space", .. }));

        let s = repo.add_space("Mesa 1");
        let ghost = user(Uuid::new_v4());
        let err = create(&repo, &mail, &ghost, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "User", .. }));
    }

    #[tokio::test]
    async fn past_date_is_rejected_before_lookup() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(Uuid::new_v4());
        let err = create(&repo, &mail, &u, &request(Uuid::new_v4(), date!(2025 - 05 - 19), TimeSlot::Morning), TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn cancelled_slot_can_be_booked_again() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let s = repo.add_space("Mesa 1");

        let first = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::FullDay), TODAY)
            .await
            .unwrap();
        cancel(&repo, &mail, &u, first.reservation.id).await.unwrap();
        create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .expect("cancelled reservations do not block");
    }

    #[tokio::test]
    async fn cancel_scenario() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let v = user(repo.add_user("bea"));
        let s = repo.add_space("Sala Hopper");

        let d = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap();
        let id = d.reservation.id;

        let err = cancel(&repo, &mail, &v, id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(repo.status_of(id), Some(ReservationStatus::Active));

        let done = cancel(&repo, &mail, &u, id).await.unwrap();
        assert_eq!(done.reservation.status, ReservationStatus::Cancelled);
        assert_eq!(repo.status_of(id), Some(ReservationStatus::Cancelled));
        assert!(mail.sent().contains(&"cancelled:ana@example.com:Sala Hopper".to_string()));

        let err = cancel(&repo, &mail, &u, id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn cancel_of_a_row_deleted_mid_request_is_not_found() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let s = repo.add_space("Sala Hopper");
        let d = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap();
        let id = d.reservation.id;

        repo.delete_after_next_read(id);
        let err = cancel(&repo, &mail, &u, id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "Reservation", .. }));
        assert!(!mail.sent().iter().any(|m| m.starts_with("cancelled:")));
    }

    #[tokio::test]
    async fn admin_lists_and_deletes_any_reservation() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let admin = Principal { id: Uuid::new_v4(), role: Role::Admin };
        let s = repo.add_space("Sala Hopper");

        let d = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap();

        assert!(matches!(list_all(&repo, &u).await, Err(AppError::Forbidden(_))));
        assert_eq!(list_all(&repo, &admin).await.unwrap().len(), 1);
        assert_eq!(list_mine(&repo, &u).await.unwrap().len(), 1);

        assert!(matches!(delete(&repo, &u, d.reservation.id).await, Err(AppError::Forbidden(_))));
        delete(&repo, &admin, d.reservation.id).await.unwrap();
        assert!(matches!(
            delete(&repo, &admin, d.reservation.id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn only_owner_or_admin_can_view() {
        let repo = MemoryReservationRepo::default();
        let mail = RecordingNotifier::default();
        let u = user(repo.add_user("ana"));
        let v = user(repo.add_user("bea"));
        let s = repo.add_space("Sala Hopper");
        let d = create(&repo, &mail, &u, &request(s, TODAY, TimeSlot::Morning), TODAY)
            .await
            .unwrap();

        assert!(get(&repo, &u, d.reservation.id).await.is_ok());
        assert!(matches!(get(&repo, &v, d.reservation.id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(get(&repo, &u, Uuid::new_v4()).await, Err(AppError::NotFound { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_bookings_exactly_one_wins() {
        // Both requests pass the availability check before either inserts.
        let repo = Arc::new(MemoryReservationRepo::with_read_gate(2));
        let mail = Arc::new(RecordingNotifier::default());
        let a = user(repo.add_user("ana"));
        let b = user(repo.add_user("bea"));
        let s = repo.add_space("Sala Hopper");
        let day = date!(2025 - 06 - 01);

        let spawn = |who: Principal| {
            let repo = repo.clone();
            let mail = mail.clone();
            tokio::spawn(async move {
                create(repo.as_ref(), mail.as_ref(), &who, &request(s, day, TimeSlot::Morning), TODAY).await
            })
        };
        let (r1, r2) = tokio::join!(spawn(a), spawn(b));
        let results = [r1.unwrap(), r2.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(repo.active_count(), 1);
    }
}
