use crate::{
    core::{self, lifecycle::ResponseSubmission},
    handlers::{map_core_error, viewer_id},
    models::{
        event::{EventStatus, TopicInfo},
        invite::{Invite, ResponseIdea, ResponseSummary, RsvpContext, RsvpOutcome, RsvpRequest},
    },
};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct RsvpEventRow {
    id: Uuid,
    status: EventStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    focus_label: String,
    setting_label: String,
    username: String,
}

pub async fn get_rsvp(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = viewer_id(&req)?;
    let token = path.into_inner();

    let invite = sqlx::query_as::<_, Invite>(
        "SELECT id, event_id, creator_id, token, expires_at FROM invites WHERE token = $1",
    )
    .bind(&token)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorNotFound("Invalid or expired invite"))?;

    let event = sqlx::query_as::<_, RsvpEventRow>(
        r#"
        SELECT e.id, e.status, e.start_date, e.end_date,
               f.focus_label, s.setting_label, u.username
        FROM events e
        JOIN event_focuses f ON e.focus_id = f.id
        JOIN event_settings s ON e.setting_id = s.id
        JOIN users u ON e.creator_id = u.id
        WHERE e.id = $1
        "#,
    )
    .bind(invite.event_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorNotFound("Event not found"))?;

    if event.status == EventStatus::Cancelled {
        return Err(actix_web::error::ErrorGone("Event cancelled"));
    }

    // First visit registers a pending response; answered rows are left
    // untouched.
    if event.status == EventStatus::Pending {
        sqlx::query(
            r#"
            INSERT INTO responses (invite_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (invite_id, user_id) DO NOTHING
            "#,
        )
        .bind(invite.id)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to save response"))?;
    }

    let topics = sqlx::query_as::<_, TopicInfo>(
        "SELECT id, topic FROM activity_topics WHERE event_id = $1 ORDER BY id",
    )
    .bind(invite.event_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to fetch topics"))?;

    let user_res: Option<i16> =
        sqlx::query_scalar("SELECT res FROM responses WHERE invite_id = $1 AND user_id = $2")
            .bind(invite.id)
            .bind(user_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
            .flatten();

    Ok(HttpResponse::Ok().json(RsvpContext {
        event_id: event.id,
        creator_username: event.username,
        focus: event.focus_label,
        setting: event.setting_label,
        status: event.status,
        start_date: event.start_date,
        end_date: event.end_date,
        expires_at: invite.expires_at,
        topics,
        user_res,
        is_creator: user_id == invite.creator_id,
    }))
}

pub async fn post_rsvp(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<RsvpRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = viewer_id(&req)?;
    let token = path.into_inner();
    let body = body.into_inner();

    let submission = ResponseSubmission {
        attending: body.attending,
        dates: body.dates,
        ideas: body.ideas,
    };

    let status = core::lifecycle::record_response(pool.get_ref(), &token, user_id, &submission)
        .await
        .map_err(map_core_error)?;

    Ok(HttpResponse::Ok().json(RsvpOutcome { status }))
}

/// The viewer's own recorded answer: their yes/no, the dates they voted
/// for, and their idea (or a placeholder) for each activity topic.
pub async fn get_my_response(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = viewer_id(&req)?;
    let token = path.into_inner();

    let res: Option<i16> = sqlx::query_scalar(
        r#"
        SELECT r.res
        FROM responses r
        JOIN invites i ON r.invite_id = i.id
        WHERE i.token = $1 AND r.user_id = $2
        "#,
    )
    .bind(&token)
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorNotFound("Response not found"))?;

    let (event_id, start_date, end_date): (Uuid, NaiveDate, NaiveDate) = sqlx::query_as(
        r#"
        SELECT e.id, e.start_date, e.end_date
        FROM invites i
        JOIN events e ON i.event_id = e.id
        WHERE i.token = $1
        "#,
    )
    .bind(&token)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?
    .ok_or_else(|| actix_web::error::ErrorNotFound("Event not found"))?;

    let dates: Vec<NaiveDate> = sqlx::query_scalar(
        "SELECT date FROM event_dates WHERE event_id = $1 AND user_id = $2 ORDER BY date",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Database error"))?;

    let ideas: Vec<(String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT at.topic, ai.idea
        FROM activity_topics at
        LEFT JOIN activity_ideas ai ON at.id = ai.topic_id AND ai.user_id = $1
        WHERE at.event_id = $2
        ORDER BY at.id
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to fetch ideas"))?;

    let activities = ideas
        .into_iter()
        .map(|(topic, idea)| ResponseIdea {
            topic,
            idea: idea_or_placeholder(idea),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ResponseSummary {
        res,
        start_date,
        end_date,
        dates,
        activities,
    }))
}

/// Topics the viewer suggested nothing for still show up in the summary.
fn idea_or_placeholder(idea: Option<String>) -> String {
    idea.unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_without_a_suggestion_show_a_placeholder() {
        assert_eq!(idea_or_placeholder(None), "-");
        assert_eq!(idea_or_placeholder(Some("bowling".to_string())), "bowling");
    }
}
