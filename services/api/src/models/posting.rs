//! Job posting models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{EmploymentType, PostingStatus, SortOrder, WorkMode};
use super::validate::{check_len, check_optional_len, check_salary, non_blank};

/// Job posting published by a recruiter
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    pub employment_type: EmploymentType,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_range: Option<String>,
    pub status: PostingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /job-postings`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostingRequest {
    /// Defaults to the recruiter's own company
    pub company: Option<String>,
    pub role_title: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    pub employment_type: EmploymentType,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_range: Option<String>,
    pub status: Option<PostingStatus>,
}

impl CreatePostingRequest {
    pub fn validate(&self) -> Result<(), String> {
        non_blank("roleTitle", &self.role_title)?;
        check_len("roleTitle", &self.role_title, 200)?;
        check_optional_len("location", self.location.as_deref(), 200)?;
        check_optional_len("description", self.description.as_deref(), 5000)?;
        check_optional_len("requirements", self.requirements.as_deref(), 5000)?;
        check_optional_len("salaryRange", self.salary_range.as_deref(), 100)
    }
}

/// Validated posting ready for insertion
#[derive(Debug, Clone)]
pub struct NewPosting {
    pub recruiter_id: Uuid,
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    pub employment_type: EmploymentType,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_range: Option<String>,
    pub status: PostingStatus,
}

/// Body of `PUT /job-postings/:id`; absent fields are left alone, `null` clears
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingPatch {
    pub role_title: Option<String>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub location: Option<Option<String>>,
    pub work_mode: Option<WorkMode>,
    pub employment_type: Option<EmploymentType>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub requirements: Option<Option<String>>,
    #[serde(default, deserialize_with = "common::nullable::deserialize")]
    pub salary_range: Option<Option<String>>,
    pub status: Option<PostingStatus>,
}

impl PostingPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(role_title) = &self.role_title {
            non_blank("roleTitle", role_title)?;
            check_len("roleTitle", role_title, 200)?;
        }
        check_optional_len("location", self.location.clone().flatten().as_deref(), 200)?;
        check_optional_len(
            "description",
            self.description.clone().flatten().as_deref(),
            5000,
        )?;
        check_optional_len(
            "requirements",
            self.requirements.clone().flatten().as_deref(),
            5000,
        )?;
        check_optional_len(
            "salaryRange",
            self.salary_range.clone().flatten().as_deref(),
            100,
        )
    }

    /// Apply the patch in place without touching timestamps
    pub fn apply_to(&self, posting: &mut JobPosting) {
        if let Some(role_title) = &self.role_title {
            posting.role_title = role_title.clone();
        }
        if let Some(location) = &self.location {
            posting.location = location.clone();
        }
        if let Some(work_mode) = self.work_mode {
            posting.work_mode = work_mode;
        }
        if let Some(employment_type) = self.employment_type {
            posting.employment_type = employment_type;
        }
        if let Some(description) = &self.description {
            posting.description = description.clone();
        }
        if let Some(requirements) = &self.requirements {
            posting.requirements = requirements.clone();
        }
        if let Some(salary_range) = &self.salary_range {
            posting.salary_range = salary_range.clone();
        }
        if let Some(status) = self.status {
            posting.status = status;
        }
    }
}

/// Query string of `GET /job-postings`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostingsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub company: Option<String>,
    pub work_mode: Option<WorkMode>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<PostingStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: PostingSort,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostingSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Company,
    RoleTitle,
}

/// Body of `POST /job-postings/:id/apply`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub notes: Option<String>,
    pub salary_target: Option<i32>,
}

impl ApplyRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_optional_len("notes", self.notes.as_deref(), 5000)?;
        check_salary(self.salary_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting() -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: Uuid::new_v4(),
            recruiter_id: Uuid::new_v4(),
            company: "META".to_string(),
            role_title: "Backend Engineer".to_string(),
            location: Some("Menlo Park".to_string()),
            work_mode: WorkMode::Hybrid,
            employment_type: EmploymentType::Fulltime,
            description: None,
            requirements: None,
            salary_range: Some("$150k".to_string()),
            status: PostingStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: PostingPatch =
            serde_json::from_str(r#"{"location": null, "status": "closed"}"#).unwrap();
        let mut posting = posting();
        patch.apply_to(&mut posting);

        assert_eq!(posting.location, None);
        assert_eq!(posting.salary_range.as_deref(), Some("$150k"));
        assert_eq!(posting.status, PostingStatus::Closed);
    }

    #[test]
    fn create_request_rejects_blank_title() {
        let request: CreatePostingRequest = serde_json::from_str(
            r#"{"roleTitle": "  ", "workMode": "remote", "employmentType": "contract"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn list_query_defaults() {
        let query: ListPostingsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.sort_by, PostingSort::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
    }
}
