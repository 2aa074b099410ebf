//! Job application models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{ApplicationStatus, EmploymentType, Priority, SortOrder, WorkMode};
use super::validate::{check_len, check_link, check_optional_len, check_salary, non_blank};

/// An applicant's tracked application
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_posting_id: Option<Uuid>,
    pub applicant_name: String,
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    pub employment_type: EmploymentType,
    pub status: ApplicationStatus,
    pub priority: Priority,
    pub applied_date: Option<DateTime<Utc>>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
    pub salary_target: Option<i32>,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /applications`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    pub employment_type: EmploymentType,
    pub status: Option<ApplicationStatus>,
    pub priority: Option<Priority>,
    pub applied_date: Option<DateTime<Utc>>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
    pub salary_target: Option<i32>,
    pub link: Option<String>,
    pub notes: Option<String>,
}

impl CreateApplicationRequest {
    pub fn validate(&self) -> Result<(), String> {
        non_blank("company", &self.company)?;
        check_len("company", &self.company, 200)?;
        non_blank("roleTitle", &self.role_title)?;
        check_len("roleTitle", &self.role_title, 200)?;
        check_optional_len("location", self.location.as_deref(), 200)?;
        check_optional_len("notes", self.notes.as_deref(), 5000)?;
        check_salary(self.salary_target)?;
        match self.link.as_deref() {
            Some(link) if !link.is_empty() => check_link(link),
            _ => Ok(()),
        }
    }

    pub fn into_new(self, user_id: Uuid, applicant_name: String, now: DateTime<Utc>) -> NewApplication {
        NewApplication {
            user_id,
            job_posting_id: None,
            applicant_name,
            company: self.company.trim().to_string(),
            role_title: self.role_title.trim().to_string(),
            location: self.location,
            work_mode: self.work_mode,
            employment_type: self.employment_type,
            status: self.status.unwrap_or(ApplicationStatus::Wishlist),
            priority: self.priority.unwrap_or(Priority::Medium),
            applied_date: Some(self.applied_date.unwrap_or(now)),
            next_follow_up_date: self.next_follow_up_date,
            salary_target: self.salary_target,
            link: self.link.filter(|link| !link.is_empty()),
            notes: self.notes,
        }
    }
}

/// Validated application ready for insertion
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: Uuid,
    pub job_posting_id: Option<Uuid>,
    pub applicant_name: String,
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    pub employment_type: EmploymentType,
    pub status: ApplicationStatus,
    pub priority: Priority,
    pub applied_date: Option<DateTime<Utc>>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
    pub salary_target: Option<i32>,
    pub link: Option<String>,
    pub notes: Option<String>,
}

/// Body of `PATCH /applications/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    pub company: Option<String>,
    pub role_title: Option<String>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub location: Option<Option<String>>,
    pub work_mode: Option<WorkMode>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<ApplicationStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub applied_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub next_follow_up_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub salary_target: Option<Option<i32>>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub notes: Option<Option<String>>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && !self.touches_other_than_status()
    }

    /// Whether any field besides `status` is present
    pub fn touches_other_than_status(&self) -> bool {
        self.company.is_some()
            || self.role_title.is_some()
            || self.location.is_some()
            || self.work_mode.is_some()
            || self.employment_type.is_some()
            || self.priority.is_some()
            || self.applied_date.is_some()
            || self.next_follow_up_date.is_some()
            || self.salary_target.is_some()
            || self.link.is_some()
            || self.notes.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(company) = &self.company {
            non_blank("company", company)?;
            check_len("company", company, 200)?;
        }
        if let Some(role_title) = &self.role_title {
            non_blank("roleTitle", role_title)?;
            check_len("roleTitle", role_title, 200)?;
        }
        if let Some(Some(location)) = &self.location {
            check_len("location", location, 200)?;
        }
        if let Some(Some(notes)) = &self.notes {
            check_len("notes", notes, 5000)?;
        }
        if let Some(salary) = self.salary_target {
            check_salary(salary)?;
        }
        match &self.link {
            Some(Some(link)) if !link.is_empty() => check_link(link),
            _ => Ok(()),
        }
    }

    /// Apply the patch in place without touching `updated_at`
    pub fn apply_to(&self, application: &mut JobApplication) {
        if let Some(company) = &self.company {
            application.company = company.trim().to_string();
        }
        if let Some(role_title) = &self.role_title {
            application.role_title = role_title.trim().to_string();
        }
        if let Some(location) = &self.location {
            application.location = location.clone();
        }
        if let Some(work_mode) = self.work_mode {
            application.work_mode = work_mode;
        }
        if let Some(employment_type) = self.employment_type {
            application.employment_type = employment_type;
        }
        if let Some(status) = self.status {
            application.status = status;
        }
        if let Some(priority) = self.priority {
            application.priority = priority;
        }
        if let Some(applied_date) = self.applied_date {
            application.applied_date = applied_date;
        }
        if let Some(next_follow_up_date) = self.next_follow_up_date {
            application.next_follow_up_date = next_follow_up_date;
        }
        if let Some(salary_target) = self.salary_target {
            application.salary_target = salary_target;
        }
        if let Some(link) = &self.link {
            application.link = link.clone().filter(|link| !link.is_empty());
        }
        if let Some(notes) = &self.notes {
            application.notes = notes.clone();
        }
    }
}

/// Query string of `GET /applications`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApplicationsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<ApplicationStatus>,
    pub work_mode: Option<WorkMode>,
    pub employment_type: Option<EmploymentType>,
    pub priority: Option<Priority>,
    pub archived: Option<bool>,
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_by: ApplicationSort,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationSort {
    #[default]
    UpdatedAt,
    CreatedAt,
    AppliedDate,
    Company,
    Status,
}
