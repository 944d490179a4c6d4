use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::error::CoreError;
use crate::core::{consensus, quota, validate};
use crate::models::event::EventStatus;
use crate::models::invite::Invite;

/// Terminal action applied when an event fails to resolve: a live
/// response cancels, the expiry path deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionAction {
    Cancel,
    Delete,
}

/// Verdict of the post-response evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDecision {
    /// Everyone has responded: attempt to confirm, cancel on failure.
    Resolve,
    /// Quorum is unreachable even if every remaining invitee confirms.
    Cancel,
    /// Still awaiting responses.
    Wait,
}

/// What the resolution procedure will do to the event row, decided
/// before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionVerdict {
    /// Quorum met and a date found: confirm for that date and advance
    /// the invite expiry to it.
    Confirm(NaiveDate),
    Cancel,
    Delete,
}

/// Maps the quota and consensus results onto a verdict. Consensus only
/// matters once enough invitees confirmed; below quorum the fallback
/// action applies no matter what the votes say.
pub fn resolution_verdict(
    confirm_count: i64,
    pass_limit: i32,
    consensus: Option<NaiveDate>,
    action: ResolutionAction,
) -> ResolutionVerdict {
    if confirm_count >= i64::from(pass_limit) {
        if let Some(date) = consensus {
            return ResolutionVerdict::Confirm(date);
        }
    }
    match action {
        ResolutionAction::Cancel => ResolutionVerdict::Cancel,
        ResolutionAction::Delete => ResolutionVerdict::Delete,
    }
}

/// Net effect of a lifecycle evaluation on the event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Retained(EventStatus),
    Removed,
}

/// An invitee's answer to the shared invite, as handed to
/// [`record_response`].
#[derive(Debug)]
pub struct ResponseSubmission {
    pub attending: bool,
    pub dates: Vec<NaiveDate>,
    pub ideas: HashMap<Uuid, Vec<String>>,
}

/// Decides what to do once a response has been recorded.
pub fn decide_after_response(stats: &quota::QuotaStats) -> ResponseDecision {
    let responded = stats.confirm_count + stats.decline_count;
    let pending = i64::from(stats.expected_total) - responded;

    if pending <= 0 {
        ResponseDecision::Resolve
    } else if pending + stats.confirm_count < i64::from(stats.pass_limit) {
        ResponseDecision::Cancel
    } else {
        ResponseDecision::Wait
    }
}

/// Records an invitee's answer and runs the post-response evaluation.
///
/// The answer itself (vote dates, ideas, response row) commits in one
/// transaction; the evaluation then runs in its own. A user who already
/// answered gets the current status back with nothing written. The
/// creator is auto-confirmed at creation and may not answer again.
pub async fn record_response(
    pool: &PgPool,
    token: &str,
    user_id: Uuid,
    submission: &ResponseSubmission,
) -> Result<EventStatus, CoreError> {
    let mut tx = pool.begin().await?;

    let invite = sqlx::query_as::<_, Invite>(
        "SELECT id, event_id, creator_id, token, expires_at FROM invites WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CoreError::NotFound)?;

    // Row lock serializes concurrent answers for the same event.
    let event = sqlx::query_as::<_, EventWindow>(
        "SELECT status, start_date, end_date FROM events WHERE id = $1 FOR UPDATE",
    )
    .bind(invite.event_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CoreError::NotFound)?;

    if event.status != EventStatus::Pending {
        return Ok(event.status);
    }

    if user_id == invite.creator_id {
        return Err(CoreError::validation("user", "creator may not respond"));
    }

    let existing: Option<Option<i16>> =
        sqlx::query_scalar("SELECT res FROM responses WHERE invite_id = $1 AND user_id = $2")
            .bind(invite.id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    // Already answered: idempotent no-op.
    if let Some(Some(_)) = existing {
        return Ok(event.status);
    }

    if submission.attending {
        let today = Utc::now().date_naive();
        validate::validate_vote_dates(&submission.dates, event.start_date, event.end_date, today)?;

        let topic_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM activity_topics WHERE event_id = $1")
                .bind(invite.event_id)
                .fetch_all(&mut *tx)
                .await?;

        if submission.ideas.keys().any(|id| !topic_ids.contains(id)) {
            return Err(CoreError::validation("ideas", "invalid option"));
        }

        for date in &submission.dates {
            sqlx::query(
                r#"
                INSERT INTO event_dates (event_id, user_id, date)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(invite.event_id)
            .bind(user_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
        }

        for (topic_id, raw) in &submission.ideas {
            for idea in validate::clean_ideas(raw) {
                sqlx::query("INSERT INTO activity_ideas (topic_id, user_id, idea) VALUES ($1, $2, $3)")
                    .bind(topic_id)
                    .bind(user_id)
                    .bind(&idea)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    let res: i16 = if submission.attending { 1 } else { 0 };
    sqlx::query(
        r#"
        INSERT INTO responses (invite_id, user_id, res)
        VALUES ($1, $2, $3)
        ON CONFLICT (invite_id, user_id) DO UPDATE SET res = EXCLUDED.res
        "#,
    )
    .bind(invite.id)
    .bind(user_id)
    .bind(res)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    match evaluate_after_response(pool, invite.event_id).await? {
        EventOutcome::Retained(status) => Ok(status),
        // A concurrent sweep removed the event between commit and
        // evaluation; surface it as gone.
        EventOutcome::Removed => Err(CoreError::NotFound),
    }
}

/// Post-response evaluation: re-reads the quota under a row lock and
/// applies the resulting transition, if any.
pub async fn evaluate_after_response(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<EventOutcome, CoreError> {
    let mut tx = pool.begin().await?;

    let status = match lock_event(&mut tx, event_id).await? {
        Some(status) => status,
        None => return Ok(EventOutcome::Removed),
    };

    // Confirmed and cancelled are terminal; re-running the evaluation
    // must not move them.
    if status != EventStatus::Pending {
        return Ok(EventOutcome::Retained(status));
    }

    let stats = quota::evaluate(&mut tx, event_id).await?;
    let outcome = match decide_after_response(&stats) {
        ResponseDecision::Wait => EventOutcome::Retained(EventStatus::Pending),
        ResponseDecision::Cancel => {
            set_status(&mut tx, event_id, EventStatus::Cancelled).await?;
            log::info!("event {event_id} cancelled: quorum unreachable");
            EventOutcome::Retained(EventStatus::Cancelled)
        }
        ResponseDecision::Resolve => {
            resolve(&mut tx, event_id, &stats, ResolutionAction::Cancel).await?
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Expiry evaluation, reached from the sweep or a stale dashboard read.
///
/// A pending event past its response deadline gets one last chance to
/// confirm, deleting on failure. A confirmed event whose chosen date has
/// arrived is removed outright along with all dependent rows. Safe to
/// invoke for an event already deleted; that case is a no-op and returns
/// `None` rather than an outcome.
pub async fn evaluate_expiry(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Option<EventOutcome>, CoreError> {
    let mut tx = pool.begin().await?;

    if lock_event(&mut tx, event_id).await?.is_none() {
        return Ok(None);
    }

    let stats = quota::evaluate(&mut tx, event_id).await?;
    let outcome = if stats.chosen_date.is_none() {
        resolve(&mut tx, event_id, &stats, ResolutionAction::Delete).await?
    } else {
        delete_event(&mut tx, event_id).await?;
        log::info!("event {event_id} deleted: chosen date passed");
        EventOutcome::Removed
    };

    tx.commit().await?;
    Ok(Some(outcome))
}

/// Common resolution procedure for both the everyone-responded and the
/// expiry paths. With quorum met it consults the date consensus; a found
/// date confirms the event and advances the invite expiry to that date in
/// the same transaction, so the sweep picks the event up again for
/// post-occurrence cleanup. Without quorum (or without consensus) the
/// parameterized action applies.
async fn resolve(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    stats: &quota::QuotaStats,
    action: ResolutionAction,
) -> Result<EventOutcome, CoreError> {
    // Votes are only worth fetching once quorum is met.
    let consensus = if stats.confirm_count >= i64::from(stats.pass_limit) {
        let votes: Vec<NaiveDate> =
            sqlx::query_scalar("SELECT date FROM event_dates WHERE event_id = $1")
                .bind(event_id)
                .fetch_all(&mut **tx)
                .await?;
        consensus::resolve_date(&votes, stats.pass_limit)
    } else {
        None
    };

    match resolution_verdict(stats.confirm_count, stats.pass_limit, consensus, action) {
        ResolutionVerdict::Confirm(chosen) => {
            sqlx::query("UPDATE events SET status = $1, chosen_date = $2 WHERE id = $3")
                .bind(EventStatus::Confirmed)
                .bind(chosen)
                .bind(event_id)
                .execute(&mut **tx)
                .await?;

            sqlx::query("UPDATE invites SET expires_at = $1 WHERE event_id = $2")
                .bind(chosen)
                .bind(event_id)
                .execute(&mut **tx)
                .await?;

            log::info!("event {event_id} confirmed for {chosen}");
            Ok(EventOutcome::Retained(EventStatus::Confirmed))
        }
        ResolutionVerdict::Cancel => {
            set_status(tx, event_id, EventStatus::Cancelled).await?;
            log::info!("event {event_id} cancelled: no agreed date");
            Ok(EventOutcome::Retained(EventStatus::Cancelled))
        }
        ResolutionVerdict::Delete => {
            delete_event(tx, event_id).await?;
            log::info!("event {event_id} deleted: expired unresolved");
            Ok(EventOutcome::Removed)
        }
    }
}

/// Locks the event row for the duration of the transaction and returns
/// its status, or `None` if the event no longer exists.
async fn lock_event(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<Option<EventStatus>, CoreError> {
    let status: Option<EventStatus> =
        sqlx::query_scalar("SELECT status FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(status)
}

async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    status: EventStatus,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE events SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Cascades through invites, responses, votes, topics, ideas and
/// confirmed activities via the foreign keys.
async fn delete_event(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<(), CoreError> {
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct EventWindow {
    status: EventStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::QuotaStats;

    fn stats(confirm: i64, decline: i64, pass_limit: i32, expected_total: i32) -> QuotaStats {
        QuotaStats {
            confirm_count: confirm,
            decline_count: decline,
            pass_limit,
            expected_total,
            chosen_date: None,
        }
    }

    #[test]
    fn waits_while_quorum_still_reachable() {
        // Creator plus one confirmation, one invitee yet to answer.
        let s = stats(2, 0, 2, 3);
        assert_eq!(decide_after_response(&s), ResponseDecision::Wait);
    }

    #[test]
    fn resolves_once_everyone_responded() {
        let s = stats(2, 1, 2, 3);
        assert_eq!(decide_after_response(&s), ResponseDecision::Resolve);

        // Both invitees declined: still resolves, and the resolution
        // procedure cancels because confirm < pass_limit.
        let s = stats(1, 2, 2, 3);
        assert_eq!(decide_after_response(&s), ResponseDecision::Resolve);
    }

    #[test]
    fn cancels_when_quorum_unreachable() {
        // One decline in, one pending: 1 confirmed + 1 pending < 3 needed.
        let s = stats(1, 1, 3, 3);
        assert_eq!(decide_after_response(&s), ResponseDecision::Cancel);
    }

    #[test]
    fn cancel_verdict_is_monotonic() {
        // Once unreachable, additional declines keep the same verdict.
        let s = stats(1, 2, 3, 4);
        assert_eq!(decide_after_response(&s), ResponseDecision::Cancel);
        let s = stats(1, 3, 3, 5);
        assert_eq!(decide_after_response(&s), ResponseDecision::Cancel);
    }

    #[test]
    fn over_enrollment_counts_as_everyone_responded() {
        // More answers than expected_total: pending goes non-positive and
        // the event resolves; late responses are never rejected.
        let s = stats(4, 1, 2, 3);
        assert_eq!(decide_after_response(&s), ResponseDecision::Resolve);
    }

    #[test]
    fn evaluation_is_idempotent_on_unchanged_stats() {
        let s = stats(2, 0, 2, 3);
        assert_eq!(decide_after_response(&s), decide_after_response(&s));
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    #[test]
    fn quorum_and_consensus_confirm_for_the_agreed_date() {
        // The confirmed date is exactly the consensus date, whichever
        // fallback action was in play.
        let chosen = day(5);
        assert_eq!(
            resolution_verdict(2, 2, Some(chosen), ResolutionAction::Cancel),
            ResolutionVerdict::Confirm(chosen)
        );
        assert_eq!(
            resolution_verdict(3, 2, Some(chosen), ResolutionAction::Delete),
            ResolutionVerdict::Confirm(chosen)
        );
    }

    #[test]
    fn quorum_without_consensus_applies_the_fallback_action() {
        assert_eq!(
            resolution_verdict(2, 2, None, ResolutionAction::Cancel),
            ResolutionVerdict::Cancel
        );
        assert_eq!(
            resolution_verdict(2, 2, None, ResolutionAction::Delete),
            ResolutionVerdict::Delete
        );
    }

    #[test]
    fn below_quorum_the_votes_are_irrelevant() {
        // Even a unanimous date cannot confirm an event short of quorum.
        assert_eq!(
            resolution_verdict(1, 2, Some(day(5)), ResolutionAction::Cancel),
            ResolutionVerdict::Cancel
        );
        assert_eq!(
            resolution_verdict(0, 3, Some(day(5)), ResolutionAction::Delete),
            ResolutionVerdict::Delete
        );
    }
}
