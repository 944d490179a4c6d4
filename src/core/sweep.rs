use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::CoreError;
use crate::core::lifecycle;

/// Runs the expiry evaluation for every event whose invite has expired
/// and returns how many events actually transitioned.
///
/// A single event failing does not abort the batch; the failure is logged
/// and the scan moves on. Re-running the sweep immediately is a no-op:
/// events it removed are simply absent the second time around, and an
/// event a concurrent pass got to first does not count towards the total.
pub async fn sweep_expired_invites(pool: &PgPool) -> Result<u64, CoreError> {
    let today = Utc::now().date_naive();

    let expired: Vec<Uuid> =
        sqlx::query_scalar("SELECT event_id FROM invites WHERE expires_at <= $1")
            .bind(today)
            .fetch_all(pool)
            .await?;

    let mut affected = 0;
    for event_id in expired {
        match lifecycle::evaluate_expiry(pool, event_id).await {
            Ok(outcome) => {
                if is_transition(&outcome) {
                    affected += 1;
                }
            }
            Err(err) => {
                log::warn!("sweep: skipping event {event_id}: {err}");
            }
        }
    }

    Ok(affected)
}

/// An evaluation that found the event already gone changed nothing.
fn is_transition(outcome: &Option<lifecycle::EventOutcome>) -> bool {
    outcome.is_some()
}

/// Periodic sweep loop, spawned from main alongside the HTTP server.
pub async fn run_periodic(pool: PgPool, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        match sweep_expired_invites(&pool).await {
            Ok(0) => {}
            Ok(n) => log::info!("expiry sweep processed {n} event(s)"),
            Err(err) => log::error!("expiry sweep failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::EventOutcome;
    use crate::models::event::EventStatus;

    #[test]
    fn already_removed_events_are_not_transitions() {
        assert!(!is_transition(&None));
        assert!(is_transition(&Some(EventOutcome::Removed)));
        assert!(is_transition(&Some(EventOutcome::Retained(
            EventStatus::Confirmed
        ))));
    }
}
