//! Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::EventType;

/// One append-only audit entry, with a glimpse of the application it is about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_application_id: Option<Uuid>,
    pub event_type: EventType,
    pub description: String,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    /// `None` once the application has been deleted
    pub job_application: Option<ApplicationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub company: String,
    pub role_title: String,
}

/// An entry about to be written alongside the change it describes
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDraft {
    pub user_id: Uuid,
    pub job_application_id: Option<Uuid>,
    pub event_type: EventType,
    pub description: String,
    pub metadata: Option<Value>,
}

/// Query string of `GET /activity`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActivityQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub job_application_id: Option<Uuid>,
    pub event_type: Option<EventType>,
}

/// Row shape of `GET /dashboard/activity`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: Uuid,
    pub event_type: EventType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub job_application: Option<ApplicationSummary>,
}

impl From<ActivityEntry> for RecentActivity {
    fn from(entry: ActivityEntry) -> Self {
        Self {
            id: entry.id,
            event_type: entry.event_type,
            description: entry.description,
            created_at: entry.created_at,
            job_application: entry.job_application,
        }
    }
}
