//! In-process store
//!
//! Keeps every table in one mutex so each operation, audited writes
//! included, is applied atomically. Used by the test suites and handy for
//! running the service without PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use auth::models::{NewRefreshToken, NewUser, ProfileUpdate, RefreshToken, User};
use auth::repositories::{CredentialStore, RefreshTokenStore};
use chrono::{DateTime, Utc};
use common::{DatabaseError, DatabaseResult, PageRequest};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::filter::{ActivityFilter, ApplicationFilter, PostingFilter, Scope, UserFilter};
use super::{ActivityStore, ApplicationStore, Guarded, JobPostingStore, UserAdminStore};
use crate::models::{
    ActivityDraft, ActivityEntry, ApplicationFacts, ApplicationSummary, JobApplication,
    JobPosting, NewApplication, NewPosting, PostingPatch, UserSummary,
};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    refresh_tokens: Vec<RefreshToken>,
    postings: HashMap<Uuid, JobPosting>,
    applications: HashMap<Uuid, JobApplication>,
    /// Insertion order
    activity: Vec<ActivityEntry>,
}

impl MemoryState {
    fn log(&mut self, draft: ActivityDraft) {
        self.activity.push(ActivityEntry {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            job_application_id: draft.job_application_id,
            event_type: draft.event_type,
            description: draft.description,
            metadata: draft.metadata,
            created_at: Utc::now(),
            job_application: None,
        });
    }

    fn application_of(&self, entry: &ActivityEntry) -> Option<&JobApplication> {
        entry
            .job_application_id
            .and_then(|id| self.applications.get(&id))
    }
}

/// Store holding everything in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant administrative privilege; there is no API for the first admin.
    pub async fn grant_admin(&self, user_id: Uuid) -> bool {
        let mut state = self.state.lock().await;
        match state.users.iter_mut().find(|user| user.id == user_id) {
            Some(user) => {
                user.is_admin = true;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Number of activity entries of any scope
    pub async fn activity_len(&self) -> usize {
        self.state.lock().await.activity.len()
    }
}

fn page_of<T>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let rows = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (rows, total)
}

impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> DatabaseResult<User> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|existing| existing.email == user.email) {
            return Err(DatabaseError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            company: user.company,
            resume_url: None,
            is_active: true,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> DatabaseResult<Option<User>> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(resume_url) = update.resume_url {
            user.resume_url = resume_url;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

impl RefreshTokenStore for MemoryStore {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> DatabaseResult<RefreshToken> {
        let mut state = self.state.lock().await;
        if state.refresh_tokens.iter().any(|row| row.token == token.token) {
            return Err(DatabaseError::Conflict("refresh_tokens_token_key".to_string()));
        }
        let row = RefreshToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token: token.token,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };
        state.refresh_tokens.push(row.clone());
        Ok(row)
    }

    async fn find_refresh_token(&self, token: &str) -> DatabaseResult<Option<RefreshToken>> {
        let state = self.state.lock().await;
        Ok(state
            .refresh_tokens
            .iter()
            .find(|row| row.token == token)
            .cloned())
    }

    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: NewRefreshToken,
    ) -> DatabaseResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|row| row.token != presented);
        if state.refresh_tokens.len() == before {
            return Ok(false);
        }

        state
            .refresh_tokens
            .retain(|row| row.token != replacement.token);
        state.refresh_tokens.push(RefreshToken {
            id: Uuid::new_v4(),
            user_id: replacement.user_id,
            token: replacement.token,
            expires_at: replacement.expires_at,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn delete_refresh_token(&self, token: &str) -> DatabaseResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|row| row.token != token);
        Ok((before - state.refresh_tokens.len()) as u64)
    }

    async fn count_refresh_tokens(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .refresh_tokens
            .iter()
            .filter(|row| row.user_id == user_id)
            .count() as u64)
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|row| !row.is_expired(now));
        Ok((before - state.refresh_tokens.len()) as u64)
    }
}

impl JobPostingStore for MemoryStore {
    async fn insert_posting(&self, posting: NewPosting) -> DatabaseResult<JobPosting> {
        let now = Utc::now();
        let row = JobPosting {
            id: Uuid::new_v4(),
            recruiter_id: posting.recruiter_id,
            company: posting.company,
            role_title: posting.role_title,
            location: posting.location,
            work_mode: posting.work_mode,
            employment_type: posting.employment_type,
            description: posting.description,
            requirements: posting.requirements,
            salary_range: posting.salary_range,
            status: posting.status,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.postings.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_posting(&self, id: Uuid) -> DatabaseResult<Option<JobPosting>> {
        Ok(self.state.lock().await.postings.get(&id).cloned())
    }

    async fn list_postings(
        &self,
        filter: &PostingFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<JobPosting>, u64)> {
        let state = self.state.lock().await;
        let mut rows: Vec<JobPosting> = state
            .postings
            .values()
            .filter(|posting| filter.matches(posting))
            .cloned()
            .collect();
        rows.sort_by(|a, b| filter.compare(a, b));
        Ok(page_of(rows, page))
    }

    async fn update_posting(&self, id: Uuid, patch: PostingPatch) -> DatabaseResult<Option<JobPosting>> {
        let mut state = self.state.lock().await;
        let Some(posting) = state.postings.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(posting);
        posting.updated_at = Utc::now();
        Ok(Some(posting.clone()))
    }

    async fn delete_posting(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut state = self.state.lock().await;
        if state.postings.remove(&id).is_none() {
            return Ok(false);
        }
        for application in state.applications.values_mut() {
            if application.job_posting_id == Some(id) {
                application.job_posting_id = None;
            }
        }
        Ok(true)
    }
}

impl ApplicationStore for MemoryStore {
    async fn find_application(&self, id: Uuid) -> DatabaseResult<Option<JobApplication>> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<JobApplication>, u64)> {
        let state = self.state.lock().await;
        let mut rows: Vec<JobApplication> = state
            .applications
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        rows.sort_by(|a, b| filter.compare(a, b));
        Ok(page_of(rows, page))
    }

    async fn insert_application<A>(
        &self,
        application: NewApplication,
        audit: A,
    ) -> DatabaseResult<JobApplication>
    where
        A: FnOnce(&JobApplication) -> ActivityDraft + Send,
    {
        let mut state = self.state.lock().await;
        if let Some(posting_id) = application.job_posting_id {
            let duplicate = state.applications.values().any(|existing| {
                existing.user_id == application.user_id
                    && existing.job_posting_id == Some(posting_id)
            });
            if duplicate {
                return Err(DatabaseError::Conflict(
                    "job_applications_user_posting_key".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let row = JobApplication {
            id: Uuid::new_v4(),
            user_id: application.user_id,
            job_posting_id: application.job_posting_id,
            applicant_name: application.applicant_name,
            company: application.company,
            role_title: application.role_title,
            location: application.location,
            work_mode: application.work_mode,
            employment_type: application.employment_type,
            status: application.status,
            priority: application.priority,
            applied_date: application.applied_date,
            next_follow_up_date: application.next_follow_up_date,
            salary_target: application.salary_target,
            link: application.link,
            notes: application.notes,
            archived: false,
            created_at: now,
            updated_at: now,
        };

        let draft = audit(&row);
        state.applications.insert(row.id, row.clone());
        state.log(draft);
        Ok(row)
    }

    async fn edit_application<F, E>(
        &self,
        id: Uuid,
        edit: F,
    ) -> DatabaseResult<Guarded<JobApplication, E>>
    where
        F: FnOnce(&JobApplication) -> Result<(JobApplication, ActivityDraft), E> + Send,
        E: Send,
    {
        let mut state = self.state.lock().await;
        let Some(current) = state.applications.get(&id) else {
            return Ok(None);
        };

        let (mut next, draft) = match edit(current) {
            Ok(change) => change,
            Err(rejection) => return Ok(Some(Err(rejection))),
        };
        next.id = id;
        next.updated_at = Utc::now();

        state.applications.insert(id, next.clone());
        state.log(draft);
        Ok(Some(Ok(next)))
    }

    async fn delete_application<F, E>(&self, id: Uuid, check: F) -> DatabaseResult<Guarded<(), E>>
    where
        F: FnOnce(&JobApplication) -> Result<(), E> + Send,
        E: Send,
    {
        let mut state = self.state.lock().await;
        let Some(current) = state.applications.get(&id) else {
            return Ok(None);
        };

        if let Err(rejection) = check(current) {
            return Ok(Some(Err(rejection)));
        }

        state.applications.remove(&id);
        Ok(Some(Ok(())))
    }

    async fn application_facts(&self, scope: &Scope) -> DatabaseResult<Vec<ApplicationFacts>> {
        let state = self.state.lock().await;
        Ok(state
            .applications
            .values()
            .filter(|application| scope.permits(application))
            .map(|application| ApplicationFacts {
                status: application.status,
                archived: application.archived,
                applied_date: application.applied_date,
                created_at: application.created_at,
            })
            .collect())
    }
}

impl ActivityStore for MemoryStore {
    async fn list_activity(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<ActivityEntry>, u64)> {
        let state = self.state.lock().await;
        let mut rows: Vec<ActivityEntry> = state
            .activity
            .iter()
            .rev()
            .filter_map(|entry| {
                let application = state.application_of(entry);
                filter.matches(entry, application).then(|| ActivityEntry {
                    job_application: application.map(|application| ApplicationSummary {
                        company: application.company.clone(),
                        role_title: application.role_title.clone(),
                    }),
                    ..entry.clone()
                })
            })
            .collect();
        // Stable: equal timestamps keep newest-inserted first.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(rows, page))
    }
}

impl UserAdminStore for MemoryStore {
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<UserSummary>, u64)> {
        let state = self.state.lock().await;
        let mut users: Vec<&User> = state.users.iter().filter(|user| filter.matches(user)).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let rows = users
            .into_iter()
            .map(|user| UserSummary {
                id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
                role: user.role,
                company: user.company.clone(),
                is_active: user.is_active,
                is_admin: user.is_admin,
                created_at: user.created_at,
                updated_at: user.updated_at,
                application_count: state
                    .applications
                    .values()
                    .filter(|application| application.user_id == user.id)
                    .count() as i64,
            })
            .collect();
        Ok(page_of(rows, page))
    }

    async fn count_applications(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .applications
            .values()
            .filter(|application| application.user_id == user_id)
            .count() as u64)
    }

    async fn edit_user<F, E>(&self, id: Uuid, edit: F) -> DatabaseResult<Guarded<User, E>>
    where
        F: FnOnce(&User) -> Result<User, E> + Send,
        E: Send,
    {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };

        let mut next = match edit(&*user) {
            Ok(next) => next,
            Err(rejection) => return Ok(Some(Err(rejection))),
        };
        next.id = id;
        next.email = user.email.clone();
        next.password_hash = user.password_hash.clone();
        next.updated_at = Utc::now();
        *user = next.clone();
        Ok(Some(Ok(next)))
    }
}
