use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::models::event::{EventStatus, TopicInfo};

#[derive(Debug, Clone, FromRow)]
pub struct Invite {
    pub id: Uuid,
    pub event_id: Uuid,
    pub creator_id: Uuid,
    pub token: String,
    pub expires_at: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RsvpRequest {
    pub attending: bool,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    /// Ideas keyed by topic id, capped at two per topic.
    #[serde(default)]
    pub ideas: HashMap<Uuid, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct RsvpContext {
    pub event_id: Uuid,
    pub creator_username: String,
    pub focus: String,
    pub setting: String,
    pub status: EventStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub expires_at: NaiveDate,
    pub topics: Vec<TopicInfo>,
    pub user_res: Option<i16>,
    pub is_creator: bool,
}

#[derive(Debug, Serialize)]
pub struct RsvpOutcome {
    pub status: EventStatus,
}

#[derive(Debug, Serialize)]
pub struct ResponseIdea {
    pub topic: String,
    pub idea: String,
}

/// What an invitee sees when revisiting an invite they already answered.
#[derive(Debug, Serialize)]
pub struct ResponseSummary {
    pub res: Option<i16>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub activities: Vec<ResponseIdea>,
}
