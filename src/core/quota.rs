use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::error::CoreError;

/// Response tallies for an event, read through its single invite.
/// Responses still pending (res IS NULL) count toward neither side.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuotaStats {
    pub confirm_count: i64,
    pub decline_count: i64,
    pub pass_limit: i32,
    pub expected_total: i32,
    pub chosen_date: Option<NaiveDate>,
}

/// Computes confirm/decline counts for an event. Pure read, no mutation.
pub async fn evaluate(conn: &mut PgConnection, event_id: Uuid) -> Result<QuotaStats, CoreError> {
    let stats = sqlx::query_as::<_, QuotaStats>(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN r.res = 1 THEN 1 ELSE 0 END), 0) AS confirm_count,
            COALESCE(SUM(CASE WHEN r.res = 0 THEN 1 ELSE 0 END), 0) AS decline_count,
            e.pass_limit, e.expected_total, e.chosen_date
        FROM events e
        JOIN invites i ON e.id = i.event_id
        LEFT JOIN responses r ON i.id = r.invite_id
        WHERE e.id = $1
        GROUP BY e.pass_limit, e.expected_total, e.chosen_date
        "#,
    )
    .bind(event_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(CoreError::NotFound)?;

    Ok(stats)
}
