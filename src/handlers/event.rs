use crate::{
    core,
    handlers::{map_core_error, viewer_id},
    models::event::{
        AttendeeInfo, ConfirmedActivity, CreateEventRequest, CreateEventResponse, EventStatus,
        EventSummary, ScheduledPlan,
    },
};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_event(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    body: web::Json<CreateEventRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let creator_id = viewer_id(&req)?;

    let focus_id = sqlx::query_scalar::<_, i16>(
        "SELECT id FROM event_focuses WHERE focus_label = $1",
    )
    .bind(&body.focus)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorBadRequest("focus: invalid option"))?;

    let setting_id = sqlx::query_scalar::<_, i16>(
        "SELECT id FROM event_settings WHERE setting_label = $1",
    )
    .bind(&body.setting)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorBadRequest("setting: invalid option"))?;

    let today = Utc::now().date_naive();
    core::validate::validate_window(body.start_date, body.end_date, today)
        .map_err(map_core_error)?;

    if body.pass_limit < 1 {
        return Err(actix_web::error::ErrorBadRequest(
            "min-participants: invalid number",
        ));
    }
    if body.expected_total < body.pass_limit {
        return Err(actix_web::error::ErrorBadRequest(
            "max-participants: invalid number",
        ));
    }

    let mut topics: Vec<(String, Vec<String>)> = Vec::new();
    for topic in &body.topics {
        let label = topic.label.trim();
        if label.is_empty() {
            continue;
        }
        let ideas = core::validate::clean_ideas(&topic.ideas);
        if ideas.is_empty() {
            return Err(actix_web::error::ErrorBadRequest(
                "topics: min 1 option per activity",
            ));
        }
        topics.push((label.to_string(), ideas));
    }
    if topics.is_empty() {
        return Err(actix_web::error::ErrorBadRequest("topics: min 1 activity"));
    }
    if topics.len() > core::validate::MAX_TOPICS {
        return Err(actix_web::error::ErrorBadRequest("topics: max 5 activities"));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    let event_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO events (creator_id, focus_id, setting_id, start_date, end_date, pass_limit, expected_total)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(creator_id)
    .bind(focus_id)
    .bind(setting_id)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(body.pass_limit)
    .bind(body.expected_total)
    .fetch_one(&mut *tx)
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to create event"))?;

    for (label, ideas) in &topics {
        let topic_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO activity_topics (event_id, topic) VALUES ($1, $2) RETURNING id",
        )
        .bind(event_id)
        .bind(label)
        .fetch_one(&mut *tx)
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to create topic"))?;

        for idea in ideas {
            sqlx::query("INSERT INTO activity_ideas (topic_id, user_id, idea) VALUES ($1, $2, $3)")
                .bind(topic_id)
                .bind(creator_id)
                .bind(idea)
                .execute(&mut *tx)
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to save idea"))?;
        }
    }

    // Shared invite link, open for a week
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = today + chrono::Duration::days(7);

    let invite_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO invites (event_id, creator_id, token, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(event_id)
    .bind(creator_id)
    .bind(&token)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to create invite"))?;

    // Creator auto-confirms; their quorum credit is implicit in the
    // consensus threshold, so no date votes are stored for them.
    sqlx::query("INSERT INTO responses (invite_id, user_id, res) VALUES ($1, $2, 1)")
        .bind(invite_id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to save response"))?;

    tx.commit()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    Ok(HttpResponse::Created().json(CreateEventResponse { event_id, token }))
}

#[derive(Debug, sqlx::FromRow)]
struct DashboardRow {
    id: Uuid,
    creator_id: Uuid,
    status: EventStatus,
    expected_total: i32,
    chosen_date: Option<NaiveDate>,
    token: String,
    expires_at: NaiveDate,
}

pub async fn list_events(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = viewer_id(&req)?;
    let today = Utc::now().date_naive();

    let rows = sqlx::query_as::<_, DashboardRow>(
        r#"
        SELECT DISTINCT e.id, e.creator_id, e.status, e.expected_total, e.chosen_date,
               i.token, i.expires_at, e.created_at
        FROM events e
        JOIN invites i ON e.id = i.event_id
        LEFT JOIN responses r ON i.id = r.invite_id
        WHERE e.creator_id = $1 OR r.user_id = $1
        ORDER BY e.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to fetch events"))?;

    let mut plans = Vec::new();
    for row in rows {
        // Stale invite observed on read: run the expiry path instead of
        // listing the event.
        if row.expires_at <= today {
            if let Err(err) = core::lifecycle::evaluate_expiry(pool.get_ref(), row.id).await {
                log::warn!("dashboard: expiry evaluation failed for {}: {err}", row.id);
            }
            continue;
        }

        let responses: Vec<(Option<i16>, Uuid)> =
            sqlx::query_as("SELECT r.res, r.user_id FROM responses r JOIN invites i ON r.invite_id = i.id WHERE i.event_id = $1")
                .bind(row.id)
                .fetch_all(pool.get_ref())
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to fetch responses"))?;

        let response_count = responses.iter().filter(|(res, _)| res.is_some()).count() as i64;
        let user_res = responses
            .iter()
            .find(|(_, uid)| *uid == user_id)
            .and_then(|(res, _)| *res);

        let countdown = match row.status {
            EventStatus::Pending => (row.expires_at - today).num_days(),
            EventStatus::Confirmed => row
                .chosen_date
                .map(|chosen| (chosen - today).num_days())
                .unwrap_or(0),
            EventStatus::Cancelled => 0,
        };

        plans.push(EventSummary {
            id: row.id,
            creator_id: row.creator_id,
            token: row.token,
            status: row.status,
            invitees: row.expected_total,
            responses: response_count,
            user_res,
            chosen_date: row.chosen_date,
            countdown,
        });
    }

    Ok(HttpResponse::Ok().json(plans))
}

pub async fn get_event(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = viewer_id(&req)?;
    let event_id = path.into_inner();
    let today = Utc::now().date_naive();

    let row = sqlx::query_as::<_, DashboardRow>(
        r#"
        SELECT e.id, e.creator_id, e.status, e.expected_total, e.chosen_date,
               i.token, i.expires_at
        FROM events e
        JOIN invites i ON e.id = i.event_id
        WHERE e.id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorNotFound("Event not found"))?;

    if row.expires_at <= today {
        use crate::core::lifecycle::EventOutcome;
        match core::lifecycle::evaluate_expiry(pool.get_ref(), event_id)
            .await
            .map_err(map_core_error)?
        {
            None | Some(EventOutcome::Removed) => {
                return Err(actix_web::error::ErrorNotFound("Event not found"))
            }
            Some(EventOutcome::Retained(_)) => {}
        }
    }

    let mut conn = pool
        .acquire()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;
    let stats = core::quota::evaluate(&mut conn, event_id)
        .await
        .map_err(map_core_error)?;

    let user_res: Option<i16> = sqlx::query_scalar(
        r#"
        SELECT r.res FROM responses r
        JOIN invites i ON r.invite_id = i.id
        WHERE i.event_id = $1 AND r.user_id = $2
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .flatten();

    // Re-read status: the expiry path above may have confirmed the event
    let status: EventStatus = sqlx::query_scalar("SELECT status FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Event not found"))?;

    let countdown = match status {
        EventStatus::Pending => (row.expires_at - today).num_days(),
        EventStatus::Confirmed => stats
            .chosen_date
            .map(|chosen| (chosen - today).num_days())
            .unwrap_or(0),
        EventStatus::Cancelled => 0,
    };

    Ok(HttpResponse::Ok().json(EventSummary {
        id: row.id,
        creator_id: row.creator_id,
        token: row.token,
        status,
        invitees: stats.expected_total,
        responses: stats.confirm_count + stats.decline_count,
        user_res,
        chosen_date: stats.chosen_date,
        countdown,
    }))
}

#[derive(Debug, sqlx::FromRow)]
struct ScheduledRow {
    id: Uuid,
    status: EventStatus,
    chosen_date: Option<NaiveDate>,
    focus_label: String,
    setting_label: String,
}

pub async fn get_scheduled(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let token = path.into_inner();

    let event = sqlx::query_as::<_, ScheduledRow>(
        r#"
        SELECT e.id, e.status, e.chosen_date, f.focus_label, s.setting_label
        FROM invites i
        JOIN events e ON i.event_id = e.id
        JOIN event_focuses f ON e.focus_id = f.id
        JOIN event_settings s ON e.setting_id = s.id
        WHERE i.token = $1
        "#,
    )
    .bind(&token)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorNotFound("Event not found"))?;

    if event.status != EventStatus::Confirmed {
        return Err(actix_web::error::ErrorConflict("Event not confirmed"));
    }
    let chosen_date = event
        .chosen_date
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Confirmed without date"))?;

    // First scheduled view after confirmation picks the activities; the
    // row lock keeps two concurrent readers from picking twice.
    let mut tx = pool
        .begin()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event.id)
        .execute(&mut *tx)
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    let mut activities = sqlx::query_as::<_, ConfirmedActivity>(
        "SELECT topic_label, activity_label FROM confirmed_activities WHERE event_id = $1",
    )
    .bind(event.id)
    .fetch_all(&mut *tx)
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    if activities.is_empty() {
        let mut rng = StdRng::from_entropy();
        core::activity::choose_activities(&mut *tx, event.id, &mut rng)
            .await
            .map_err(map_core_error)?;

        activities = sqlx::query_as::<_, ConfirmedActivity>(
            "SELECT topic_label, activity_label FROM confirmed_activities WHERE event_id = $1",
        )
        .bind(event.id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;
    }

    tx.commit()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    let attendees = sqlx::query_as::<_, AttendeeInfo>(
        r#"
        SELECT u.id AS user_id, u.username
        FROM responses r
        JOIN invites i ON r.invite_id = i.id
        JOIN users u ON r.user_id = u.id
        WHERE i.event_id = $1 AND r.res = 1
        "#,
    )
    .bind(event.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to fetch attendees"))?;

    Ok(HttpResponse::Ok().json(ScheduledPlan {
        event_id: event.id,
        focus: event.focus_label,
        setting: event.setting_label,
        chosen_date,
        activities,
        attendees,
    }))
}
