//! Dashboard aggregates

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::enums::ApplicationStatus;

/// The columns the dashboard needs from each application in scope
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationFacts {
    pub status: ApplicationStatus,
    pub archived: bool,
    pub applied_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub kpis: Kpis,
    pub by_status: BTreeMap<String, u64>,
    pub timeline: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total: u64,
    pub applied_this_week: u64,
    pub interviews: u64,
    pub offers: u64,
}

/// Applications created on one UTC day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub count: u64,
}
