use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub label: String,
    #[serde(default)]
    pub ideas: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub focus: String,
    pub setting: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pass_limit: i32,
    pub expected_total: i32,
    pub topics: Vec<TopicRequest>,
}

#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub event_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub token: String,
    pub status: EventStatus,
    pub invitees: i32,
    pub responses: i64,
    pub user_res: Option<i16>,
    pub chosen_date: Option<NaiveDate>,
    pub countdown: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TopicInfo {
    pub id: Uuid,
    pub topic: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ConfirmedActivity {
    pub topic_label: String,
    pub activity_label: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AttendeeInfo {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduledPlan {
    pub event_id: Uuid,
    pub focus: String,
    pub setting: String,
    pub chosen_date: NaiveDate,
    pub activities: Vec<ConfirmedActivity>,
    pub attendees: Vec<AttendeeInfo>,
}
