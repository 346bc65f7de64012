//! Outbound notifications. Delivery is best-effort: callers log failures and
//! carry on, nothing is rolled back because a mail could not be sent.

pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use time::Date;
use tracing::info;

use crate::reservations::repo_types::TimeSlot;

/// Everything a reservation email needs to know.
#[derive(Debug, Clone)]
pub struct ReservationNotice {
    pub recipient: String,
    pub username: String,
    pub space_name: String,
    pub date: Date,
    pub slot: TimeSlot,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn registration(&self, recipient: &str, username: &str) -> anyhow::Result<()>;
    async fn reservation_confirmed(&self, notice: &ReservationNotice) -> anyhow::Result<()>;
    async fn reservation_cancelled(&self, notice: &ReservationNotice) -> anyhow::Result<()>;
}

/// Used when no SMTP relay is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn registration(&self, recipient: &str, username: &str) -> anyhow::Result<()> {
        info!(%recipient, %username, "registration email (smtp disabled)");
        Ok(())
    }

    async fn reservation_confirmed(&self, n: &ReservationNotice) -> anyhow::Result<()> {
        info!(recipient = %n.recipient, space = %n.space_name, date = %n.date, slot = ?n.slot,
            "reservation confirmation email (smtp disabled)");
        Ok(())
    }

    async fn reservation_cancelled(&self, n: &ReservationNotice) -> anyhow::Result<()> {
        info!(recipient = %n.recipient, space = %n.space_name, date = %n.date, slot = ?n.slot,
            "reservation cancellation email (smtp disabled)");
        Ok(())
    }
}
