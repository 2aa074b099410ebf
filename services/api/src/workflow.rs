//! Application status workflow
//!
//! Every mutation of a job application is an audited one: the new row and
//! its activity entry are written as one unit by the store. Any status may
//! move to any other; what the workflow decides is who may make the change
//! and which entry describes it.

use auth::models::Role;
use chrono::Utc;
use common::DatabaseError;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{
    ActivityDraft, ApplicationPatch, ApplicationStatus, ApplyRequest, CreateApplicationRequest,
    EventType, JobApplication, NewApplication, PostingStatus, Priority,
};
use crate::store::{ApplicationStore, JobPostingStore};

fn entry(
    caller: &AuthUser,
    application: &JobApplication,
    event_type: EventType,
    description: String,
) -> ActivityDraft {
    ActivityDraft {
        user_id: caller.id,
        job_application_id: Some(application.id),
        event_type,
        description,
        metadata: None,
    }
}

/// The single entry a PATCH produces. A status change subsumes any other
/// field change made in the same request.
fn describe_update(
    caller: &AuthUser,
    before: &JobApplication,
    after: &JobApplication,
) -> ActivityDraft {
    if before.status != after.status {
        ActivityDraft {
            metadata: Some(json!({
                "oldStatus": before.status,
                "newStatus": after.status,
            })),
            ..entry(
                caller,
                after,
                EventType::StatusChanged,
                format!("Changed status from {} to {}", before.status, after.status),
            )
        }
    } else {
        entry(
            caller,
            after,
            EventType::Updated,
            format!(
                "Updated application for {} at {}",
                after.role_title, after.company
            ),
        )
    }
}

/// Decide whether `caller` may apply `patch` to `current`
fn authorize_update(
    caller: &AuthUser,
    current: &JobApplication,
    patch: &ApplicationPatch,
    allow_recruiter_status_edit: bool,
) -> Result<(), ApiError> {
    if caller.is_admin {
        return Ok(());
    }

    match caller.role {
        Role::Applicant if current.user_id == caller.id => Ok(()),
        Role::Recruiter
            if allow_recruiter_status_edit
                && caller.company.as_deref() == Some(current.company.as_str()) =>
        {
            if patch.touches_other_than_status() {
                Err(ApiError::Forbidden(
                    "Recruiters may only change the status of an application".to_string(),
                ))
            } else {
                Ok(())
            }
        }
        _ => Err(ApiError::Forbidden("Access denied".to_string())),
    }
}

/// `POST /applications`: an applicant tracks an application of their own
pub async fn create_application<S: ApplicationStore>(
    store: &S,
    caller: &AuthUser,
    request: CreateApplicationRequest,
) -> ApiResult<JobApplication> {
    caller.require_role(Role::Applicant)?;
    request.validate().map_err(ApiError::InvalidInput)?;

    let new = request.into_new(caller.id, caller.name.clone(), Utc::now());
    let application = store
        .insert_application(new, |row| {
            entry(
                caller,
                row,
                EventType::Created,
                format!("Created application for {} at {}", row.role_title, row.company),
            )
        })
        .await?;

    info!("User {} created application {}", caller.id, application.id);
    Ok(application)
}

/// `POST /job-postings/:id/apply`
pub async fn apply_to_posting<S: ApplicationStore + JobPostingStore>(
    store: &S,
    caller: &AuthUser,
    posting_id: Uuid,
    request: ApplyRequest,
) -> ApiResult<JobApplication> {
    caller.require_role(Role::Applicant)?;
    request.validate().map_err(ApiError::InvalidInput)?;

    let posting = store
        .find_posting(posting_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job posting"))?;

    if posting.status != PostingStatus::Open {
        return Err(ApiError::InvalidState(
            "This job posting is no longer accepting applications".to_string(),
        ));
    }

    let new = NewApplication {
        user_id: caller.id,
        job_posting_id: Some(posting.id),
        applicant_name: caller.name.clone(),
        company: posting.company.clone(),
        role_title: posting.role_title.clone(),
        location: posting.location.clone(),
        work_mode: posting.work_mode,
        employment_type: posting.employment_type,
        status: ApplicationStatus::Applied,
        priority: Priority::Medium,
        applied_date: Some(Utc::now()),
        next_follow_up_date: None,
        salary_target: request.salary_target,
        link: None,
        notes: request.notes,
    };

    let application = store
        .insert_application(new, |row| {
            entry(
                caller,
                row,
                EventType::Created,
                format!("Applied to {} at {}", row.role_title, row.company),
            )
        })
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(_) => {
                ApiError::Conflict("You have already applied to this job posting".to_string())
            }
            other => other.into(),
        })?;

    info!(
        "User {} applied to posting {} as application {}",
        caller.id, posting.id, application.id
    );
    Ok(application)
}

/// `PATCH /applications/:id`
pub async fn update_application<S: ApplicationStore>(
    store: &S,
    caller: &AuthUser,
    id: Uuid,
    patch: ApplicationPatch,
    allow_recruiter_status_edit: bool,
) -> ApiResult<JobApplication> {
    patch.validate().map_err(ApiError::InvalidInput)?;
    if patch.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".to_string()));
    }

    let outcome = store
        .edit_application(id, |current| {
            authorize_update(caller, current, &patch, allow_recruiter_status_edit)?;

            let mut next = current.clone();
            patch.apply_to(&mut next);
            let draft = describe_update(caller, current, &next);
            Ok::<_, ApiError>((next, draft))
        })
        .await?;

    let application = outcome.ok_or_else(|| ApiError::not_found("Job application"))??;
    info!("User {} updated application {}", caller.id, application.id);
    Ok(application)
}

/// `POST /applications/:id/archive`
pub async fn archive_application<S: ApplicationStore>(
    store: &S,
    caller: &AuthUser,
    id: Uuid,
) -> ApiResult<JobApplication> {
    set_archived(store, caller, id, true).await
}

/// `POST /applications/:id/restore`
pub async fn restore_application<S: ApplicationStore>(
    store: &S,
    caller: &AuthUser,
    id: Uuid,
) -> ApiResult<JobApplication> {
    set_archived(store, caller, id, false).await
}

async fn set_archived<S: ApplicationStore>(
    store: &S,
    caller: &AuthUser,
    id: Uuid,
    archived: bool,
) -> ApiResult<JobApplication> {
    let outcome = store
        .edit_application(id, |current| -> Result<_, ApiError> {
            caller.check_owner(current)?;

            if current.archived == archived {
                let message = if archived {
                    "Application is already archived"
                } else {
                    "Application is not archived"
                };
                return Err(ApiError::InvalidState(message.to_string()));
            }

            let mut next = current.clone();
            next.archived = archived;
            let (event_type, verb) = if archived {
                (EventType::Archived, "Archived")
            } else {
                (EventType::Restored, "Restored")
            };
            let draft = entry(
                caller,
                &next,
                event_type,
                format!("{} application for {} at {}", verb, next.role_title, next.company),
            );
            Ok((next, draft))
        })
        .await?;

    let application = outcome.ok_or_else(|| ApiError::not_found("Job application"))??;
    info!(
        "User {} {} application {}",
        caller.id,
        if archived { "archived" } else { "restored" },
        application.id
    );
    Ok(application)
}

/// `DELETE /applications/:id`: only archived applications can be removed
pub async fn delete_application<S: ApplicationStore>(
    store: &S,
    caller: &AuthUser,
    id: Uuid,
) -> ApiResult<()> {
    let outcome = store
        .delete_application(id, |current| -> Result<(), ApiError> {
            caller.check_owner(current)?;
            if !current.archived {
                return Err(ApiError::InvalidState(
                    "Only archived applications can be deleted".to_string(),
                ));
            }
            Ok(())
        })
        .await?;

    outcome.ok_or_else(|| ApiError::not_found("Job application"))??;
    info!("User {} deleted application {}", caller.id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmploymentType, NewPosting, WorkMode};
    use crate::store::filter::{ActivityFilter, Scope};
    use crate::store::{ActivityStore, MemoryStore};
    use common::PageRequest;

    fn applicant() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "john.doe@email.com".to_string(),
            name: "John Doe".to_string(),
            role: Role::Applicant,
            company: None,
            is_admin: false,
        }
    }

    fn recruiter(company: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "recruiter@meta.com".to_string(),
            name: "Meta Recruiter".to_string(),
            role: Role::Recruiter,
            company: Some(company.to_string()),
            is_admin: false,
        }
    }

    fn request() -> CreateApplicationRequest {
        serde_json::from_value(json!({
            "company": "META",
            "roleTitle": "Platform Engineer",
            "workMode": "remote",
            "employmentType": "fulltime",
            "status": "applied",
        }))
        .unwrap()
    }

    fn patch(value: serde_json::Value) -> ApplicationPatch {
        serde_json::from_value(value).unwrap()
    }

    async fn entries(store: &MemoryStore) -> Vec<crate::models::ActivityEntry> {
        store
            .list_activity(&ActivityFilter::scoped(Scope::All), PageRequest::default())
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn creation_logs_created() {
        let store = MemoryStore::new();
        let caller = applicant();

        let row = create_application(&store, &caller, request()).await.unwrap();
        assert_eq!(row.applicant_name, "John Doe");
        assert_eq!(row.priority, Priority::Medium);

        let log = entries(&store).await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].event_type, EventType::Created);
        assert_eq!(log[0].description, "Created application for Platform Engineer at META");
    }

    #[tokio::test]
    async fn recruiters_cannot_create_applications() {
        let store = MemoryStore::new();
        let err = create_application(&store, &recruiter("META"), request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn status_change_writes_exactly_one_status_entry() {
        let store = MemoryStore::new();
        let caller = applicant();
        let row = create_application(&store, &caller, request()).await.unwrap();

        let updated = update_application(
            &store,
            &caller,
            row.id,
            patch(json!({"status": "interview", "notes": "Onsite on Friday"})),
            false,
        )
        .await
        .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Interview);
        assert_eq!(updated.notes.as_deref(), Some("Onsite on Friday"));

        let log = entries(&store).await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].event_type, EventType::StatusChanged);
        assert_eq!(
            log[0].metadata,
            Some(json!({"oldStatus": "applied", "newStatus": "interview"}))
        );
        assert!(log.iter().all(|e| e.event_type != EventType::Updated));
    }

    #[tokio::test]
    async fn same_status_counts_as_a_plain_update() {
        let store = MemoryStore::new();
        let caller = applicant();
        let row = create_application(&store, &caller, request()).await.unwrap();

        update_application(&store, &caller, row.id, patch(json!({"status": "applied"})), false)
            .await
            .unwrap();

        assert_eq!(entries(&store).await[0].event_type, EventType::Updated);
    }

    #[tokio::test]
    async fn empty_patch_is_invalid_input() {
        let store = MemoryStore::new();
        let caller = applicant();
        let row = create_application(&store, &caller, request()).await.unwrap();

        let err = update_application(&store, &caller, row.id, patch(json!({})), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn recruiter_status_edit_follows_the_toggle() {
        let store = MemoryStore::new();
        let owner = applicant();
        let row = create_application(&store, &owner, request()).await.unwrap();
        let meta = recruiter("META");

        let denied = update_application(&store, &meta, row.id, patch(json!({"status": "offer"})), false)
            .await
            .unwrap_err();
        assert!(matches!(denied, ApiError::Forbidden(_)));

        let updated =
            update_application(&store, &meta, row.id, patch(json!({"status": "offer"})), true)
                .await
                .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Offer);

        let mixed = update_application(
            &store,
            &meta,
            row.id,
            patch(json!({"status": "rejected", "notes": "nope"})),
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(mixed, ApiError::Forbidden(_)));

        let other = update_application(
            &store,
            &recruiter("GOOGLE"),
            row.id,
            patch(json!({"status": "rejected"})),
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(other, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn archive_restore_and_delete_lifecycle() {
        let store = MemoryStore::new();
        let caller = applicant();
        let row = create_application(&store, &caller, request()).await.unwrap();

        let live = delete_application(&store, &caller, row.id).await.unwrap_err();
        assert!(matches!(live, ApiError::InvalidState(_)));

        let restored_live = restore_application(&store, &caller, row.id).await.unwrap_err();
        assert!(matches!(restored_live, ApiError::InvalidState(_)));

        assert!(archive_application(&store, &caller, row.id).await.unwrap().archived);
        let twice = archive_application(&store, &caller, row.id).await.unwrap_err();
        assert!(matches!(twice, ApiError::InvalidState(_)));

        // created + archived only; rejected attempts leave no trace
        assert_eq!(store.activity_len().await, 2);

        assert!(!restore_application(&store, &caller, row.id).await.unwrap().archived);
        archive_application(&store, &caller, row.id).await.unwrap();
        delete_application(&store, &caller, row.id).await.unwrap();

        let gone = delete_application(&store, &caller, row.id).await.unwrap_err();
        assert!(matches!(gone, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_the_owner_archives() {
        let store = MemoryStore::new();
        let owner = applicant();
        let row = create_application(&store, &owner, request()).await.unwrap();

        let mut admin = applicant();
        admin.is_admin = true;

        let err = archive_application(&store, &admin, row.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // admins may still edit
        update_application(&store, &admin, row.id, patch(json!({"priority": "high"})), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn apply_copies_the_posting_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let meta = recruiter("META");
        let posting = store
            .insert_posting(NewPosting {
                recruiter_id: meta.id,
                company: "META".to_string(),
                role_title: "Backend Engineer".to_string(),
                location: Some("Menlo Park".to_string()),
                work_mode: WorkMode::Hybrid,
                employment_type: EmploymentType::Fulltime,
                description: None,
                requirements: None,
                salary_range: None,
                status: PostingStatus::Open,
            })
            .await
            .unwrap();
        let caller = applicant();

        let row = apply_to_posting(&store, &caller, posting.id, ApplyRequest::default())
            .await
            .unwrap();
        assert_eq!(row.status, ApplicationStatus::Applied);
        assert_eq!(row.company, "META");
        assert_eq!(row.job_posting_id, Some(posting.id));
        assert_eq!(entries(&store).await[0].event_type, EventType::Created);

        let again = apply_to_posting(&store, &caller, posting.id, ApplyRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(again, ApiError::Conflict(_)));

        let missing = apply_to_posting(&store, &caller, Uuid::new_v4(), ApplyRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }
}
