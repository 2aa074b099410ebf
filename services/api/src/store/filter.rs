//! Typed list filters
//!
//! Each filter is built from the caller's resolved scope plus the validated
//! query string. It can render itself as SQL predicates for [`PgStore`] and
//! evaluate itself against a row for [`MemoryStore`], so both stores answer
//! the same question the same way.
//!
//! [`PgStore`]: super::PgStore
//! [`MemoryStore`]: super::MemoryStore

use auth::models::{Role, User};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::{
    ActivityEntry, ApplicationSort, ApplicationStatus, EmploymentType, EventType, JobApplication,
    JobPosting, ListActivityQuery, ListApplicationsQuery, ListPostingsQuery, ListUsersQuery,
    PostingSort, PostingStatus, Priority, SortOrder, WorkMode,
};

/// Ownership scope of a caller over applications and activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Applicant: their own rows
    Own(Uuid),
    /// Recruiter: rows of their company
    Company(String),
    /// Admin: everything
    All,
}

impl Scope {
    pub fn permits(&self, application: &JobApplication) -> bool {
        match self {
            Scope::Own(user_id) => application.user_id == *user_id,
            Scope::Company(company) => application.company == *company,
            Scope::All => true,
        }
    }

    /// `alias` names the job_applications relation in the surrounding query
    fn push_application_sql(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match self {
            Scope::Own(user_id) => {
                qb.push(format!(" AND {alias}.user_id = ")).push_bind(*user_id);
            }
            Scope::Company(company) => {
                qb.push(format!(" AND {alias}.company = "))
                    .push_bind(company.clone());
            }
            Scope::All => {}
        }
    }

    /// Restrict a query over `job_applications ja`
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        self.push_application_sql(qb, "ja");
    }
}

/// Visibility of job postings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingScope {
    /// Applicant: open postings of any company
    OpenOnly,
    /// Recruiter: every posting of their company
    Company(String),
    /// Admin: everything
    All,
}

impl PostingScope {
    pub fn permits(&self, posting: &JobPosting) -> bool {
        match self {
            PostingScope::OpenOnly => posting.status == PostingStatus::Open,
            PostingScope::Company(company) => posting.company == *company,
            PostingScope::All => true,
        }
    }
}

/// Filter of `GET /applications`
#[derive(Debug, Clone)]
pub struct ApplicationFilter {
    pub scope: Scope,
    pub status: Option<ApplicationStatus>,
    pub work_mode: Option<WorkMode>,
    pub employment_type: Option<EmploymentType>,
    pub priority: Option<Priority>,
    pub archived: Option<bool>,
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub sort: ApplicationSort,
    pub order: SortOrder,
}

impl ApplicationFilter {
    pub fn new(scope: Scope, query: &ListApplicationsQuery) -> Self {
        Self {
            scope,
            status: query.status,
            work_mode: query.work_mode,
            employment_type: query.employment_type,
            priority: query.priority,
            archived: query.archived,
            search: normalize_search(query.search.as_deref()),
            created_from: query.start_date,
            created_to: query.end_date,
            sort: query.sort_by,
            order: query.sort_order,
        }
    }

    /// Every application in scope
    pub fn scoped(scope: Scope) -> Self {
        Self::new(scope, &ListApplicationsQuery::default())
    }

    pub fn matches(&self, application: &JobApplication) -> bool {
        self.scope.permits(application)
            && self.status.is_none_or(|status| application.status == status)
            && self.work_mode.is_none_or(|mode| application.work_mode == mode)
            && self
                .employment_type
                .is_none_or(|kind| application.employment_type == kind)
            && self.priority.is_none_or(|priority| application.priority == priority)
            && self.archived.is_none_or(|archived| application.archived == archived)
            && self.created_from.is_none_or(|from| application.created_at >= from)
            && self.created_to.is_none_or(|to| application.created_at <= to)
            && self.search.as_deref().is_none_or(|needle| {
                contains_ci(&application.company, needle)
                    || contains_ci(&application.role_title, needle)
                    || application
                        .notes
                        .as_deref()
                        .is_some_and(|notes| contains_ci(notes, needle))
            })
    }

    /// Append ` WHERE ...` for `job_applications ja`
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        self.scope.push_sql(qb);
        if let Some(status) = self.status {
            qb.push(" AND ja.status = ").push_bind(status);
        }
        if let Some(work_mode) = self.work_mode {
            qb.push(" AND ja.work_mode = ").push_bind(work_mode);
        }
        if let Some(employment_type) = self.employment_type {
            qb.push(" AND ja.employment_type = ").push_bind(employment_type);
        }
        if let Some(priority) = self.priority {
            qb.push(" AND ja.priority = ").push_bind(priority);
        }
        if let Some(archived) = self.archived {
            qb.push(" AND ja.archived = ").push_bind(archived);
        }
        if let Some(from) = self.created_from {
            qb.push(" AND ja.created_at >= ").push_bind(from);
        }
        if let Some(to) = self.created_to {
            qb.push(" AND ja.created_at <= ").push_bind(to);
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (ja.company ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR ja.role_title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR ja.notes ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    pub fn order_by_sql(&self) -> String {
        let column = match self.sort {
            ApplicationSort::UpdatedAt => "ja.updated_at",
            ApplicationSort::CreatedAt => "ja.created_at",
            ApplicationSort::AppliedDate => "ja.applied_date",
            ApplicationSort::Company => "ja.company",
            ApplicationSort::Status => "ja.status",
        };
        format!(
            " ORDER BY {} {} NULLS LAST, ja.id ASC",
            column,
            self.order.as_sql()
        )
    }

    pub fn compare(&self, a: &JobApplication, b: &JobApplication) -> Ordering {
        let ordering = match self.sort {
            ApplicationSort::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at), self.order),
            ApplicationSort::CreatedAt => directed(a.created_at.cmp(&b.created_at), self.order),
            ApplicationSort::AppliedDate => {
                nulls_last(a.applied_date.as_ref(), b.applied_date.as_ref(), self.order)
            }
            ApplicationSort::Company => directed(a.company.cmp(&b.company), self.order),
            // Postgres orders enum values by declaration order, as does the derive.
            ApplicationSort::Status => directed(
                status_rank(a.status).cmp(&status_rank(b.status)),
                self.order,
            ),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

fn status_rank(status: ApplicationStatus) -> usize {
    ApplicationStatus::ALL
        .iter()
        .position(|candidate| *candidate == status)
        .unwrap_or(usize::MAX)
}

/// Filter of `GET /job-postings`
#[derive(Debug, Clone)]
pub struct PostingFilter {
    pub scope: PostingScope,
    pub company: Option<String>,
    pub work_mode: Option<WorkMode>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<PostingStatus>,
    pub search: Option<String>,
    pub sort: PostingSort,
    pub order: SortOrder,
}

impl PostingFilter {
    pub fn new(scope: PostingScope, query: &ListPostingsQuery) -> Self {
        // Applicants only ever see open postings; a status filter cannot widen that.
        let status = match scope {
            PostingScope::OpenOnly => None,
            _ => query.status,
        };
        Self {
            scope,
            company: query
                .company
                .as_deref()
                .map(str::trim)
                .filter(|company| !company.is_empty())
                .map(str::to_string),
            work_mode: query.work_mode,
            employment_type: query.employment_type,
            status,
            search: normalize_search(query.search.as_deref()),
            sort: query.sort_by,
            order: query.sort_order,
        }
    }

    pub fn matches(&self, posting: &JobPosting) -> bool {
        self.scope.permits(posting)
            && self
                .company
                .as_deref()
                .is_none_or(|company| posting.company == company)
            && self.work_mode.is_none_or(|mode| posting.work_mode == mode)
            && self
                .employment_type
                .is_none_or(|kind| posting.employment_type == kind)
            && self.status.is_none_or(|status| posting.status == status)
            && self.search.as_deref().is_none_or(|needle| {
                contains_ci(&posting.role_title, needle)
                    || posting
                        .description
                        .as_deref()
                        .is_some_and(|description| contains_ci(description, needle))
            })
    }

    /// Append ` WHERE ...` for `job_postings jp`
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        match &self.scope {
            PostingScope::OpenOnly => {
                qb.push(" AND jp.status = ").push_bind(PostingStatus::Open);
            }
            PostingScope::Company(company) => {
                qb.push(" AND jp.company = ").push_bind(company.clone());
            }
            PostingScope::All => {}
        }
        if let Some(company) = &self.company {
            qb.push(" AND jp.company = ").push_bind(company.clone());
        }
        if let Some(work_mode) = self.work_mode {
            qb.push(" AND jp.work_mode = ").push_bind(work_mode);
        }
        if let Some(employment_type) = self.employment_type {
            qb.push(" AND jp.employment_type = ").push_bind(employment_type);
        }
        if let Some(status) = self.status {
            qb.push(" AND jp.status = ").push_bind(status);
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (jp.role_title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR jp.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    pub fn order_by_sql(&self) -> String {
        let column = match self.sort {
            PostingSort::CreatedAt => "jp.created_at",
            PostingSort::UpdatedAt => "jp.updated_at",
            PostingSort::Company => "jp.company",
            PostingSort::RoleTitle => "jp.role_title",
        };
        format!(" ORDER BY {} {}, jp.id ASC", column, self.order.as_sql())
    }

    pub fn compare(&self, a: &JobPosting, b: &JobPosting) -> Ordering {
        let ordering = match self.sort {
            PostingSort::CreatedAt => a.created_at.cmp(&b.created_at),
            PostingSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            PostingSort::Company => a.company.cmp(&b.company),
            PostingSort::RoleTitle => a.role_title.cmp(&b.role_title),
        };
        directed(ordering, self.order).then_with(|| a.id.cmp(&b.id))
    }
}

/// Filter of `GET /activity` and `GET /dashboard/activity`
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    pub scope: Scope,
    pub job_application_id: Option<Uuid>,
    pub event_type: Option<EventType>,
}

impl ActivityFilter {
    pub fn new(scope: Scope, query: &ListActivityQuery) -> Self {
        Self {
            scope,
            job_application_id: query.job_application_id,
            event_type: query.event_type,
        }
    }

    pub fn scoped(scope: Scope) -> Self {
        Self::new(scope, &ListActivityQuery::default())
    }

    /// `application` is the row the entry refers to, if it still exists.
    ///
    /// Applicants see what they did and what happened to their applications;
    /// recruiters see entries about their company's applications.
    pub fn matches(&self, entry: &ActivityEntry, application: Option<&JobApplication>) -> bool {
        let in_scope = match &self.scope {
            Scope::Own(user_id) => {
                entry.user_id == *user_id
                    || application.is_some_and(|application| application.user_id == *user_id)
            }
            Scope::Company(company) => {
                application.is_some_and(|application| application.company == *company)
            }
            Scope::All => true,
        };

        in_scope
            && self
                .job_application_id
                .is_none_or(|id| entry.job_application_id == Some(id))
            && self.event_type.is_none_or(|kind| entry.event_type == kind)
    }

    /// Append ` WHERE ...` for `activity_logs al LEFT JOIN job_applications ja`
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        match &self.scope {
            Scope::Own(user_id) => {
                qb.push(" AND (al.user_id = ")
                    .push_bind(*user_id)
                    .push(" OR ja.user_id = ")
                    .push_bind(*user_id)
                    .push(")");
            }
            Scope::Company(_) => self.scope.push_sql(qb),
            Scope::All => {}
        }
        if let Some(id) = self.job_application_id {
            qb.push(" AND al.job_application_id = ").push_bind(id);
        }
        if let Some(event_type) = self.event_type {
            qb.push(" AND al.event_type = ").push_bind(event_type);
        }
    }
}

/// Filter of `GET /users`
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn new(query: &ListUsersQuery) -> Self {
        Self {
            role: query.role,
            is_active: query.is_active,
            search: normalize_search(query.search.as_deref()),
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.role.is_none_or(|role| user.role == role)
            && self.is_active.is_none_or(|active| user.is_active == active)
            && self.search.as_deref().is_none_or(|needle| {
                contains_ci(&user.email, needle) || contains_ci(&user.name, needle)
            })
    }

    /// Append ` WHERE ...` for `users u`
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(role) = self.role {
            qb.push(" AND u.role = ").push_bind(role);
        }
        if let Some(is_active) = self.is_active {
            qb.push(" AND u.is_active = ").push_bind(is_active);
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (u.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|search| !search.is_empty())
        .map(str::to_string)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `%needle%` with LIKE wildcards in the needle escaped
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn nulls_last<T: Ord>(a: Option<&T>, b: Option<&T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(b), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(user_id: Uuid, company: &str) -> JobApplication {
        let now = Utc::now();
        JobApplication {
            id: Uuid::new_v4(),
            user_id,
            job_posting_id: None,
            applicant_name: "John Doe".to_string(),
            company: company.to_string(),
            role_title: "Platform Engineer".to_string(),
            location: None,
            work_mode: WorkMode::Remote,
            employment_type: EmploymentType::Fulltime,
            status: ApplicationStatus::Applied,
            priority: Priority::Medium,
            applied_date: Some(now),
            next_follow_up_date: None,
            salary_target: None,
            link: None,
            notes: Some("Referred by Jane".to_string()),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn scope_permits_by_owner_or_company() {
        let owner = Uuid::new_v4();
        let app = application(owner, "META");

        assert!(Scope::Own(owner).permits(&app));
        assert!(!Scope::Own(Uuid::new_v4()).permits(&app));
        assert!(Scope::Company("META".to_string()).permits(&app));
        assert!(!Scope::Company("GOOGLE".to_string()).permits(&app));
        assert!(Scope::All.permits(&app));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let owner = Uuid::new_v4();
        let app = application(owner, "META");
        let filter = |search: &str| {
            ApplicationFilter::new(
                Scope::All,
                &ListApplicationsQuery {
                    search: Some(search.to_string()),
                    ..Default::default()
                },
            )
        };

        assert!(filter("meta").matches(&app));
        assert!(filter("PLATFORM").matches(&app));
        assert!(filter("jane").matches(&app));
        assert!(!filter("google").matches(&app));
        assert!(filter("   ").matches(&app));
    }

    #[test]
    fn applicants_cannot_widen_posting_status() {
        let query = ListPostingsQuery {
            status: Some(PostingStatus::Closed),
            ..Default::default()
        };
        assert_eq!(PostingFilter::new(PostingScope::OpenOnly, &query).status, None);
        assert_eq!(
            PostingFilter::new(PostingScope::All, &query).status,
            Some(PostingStatus::Closed)
        );
    }

    #[test]
    fn sql_is_parameterised() {
        let filter = ApplicationFilter::new(
            Scope::Company("META".to_string()),
            &ListApplicationsQuery {
                status: Some(ApplicationStatus::Interview),
                search: Some("rust".to_string()),
                ..Default::default()
            },
        );
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM job_applications ja");
        filter.push_where(&mut qb);
        qb.push(filter.order_by_sql());

        let sql = qb.sql();
        assert!(sql.contains("ja.company = $1"));
        assert!(sql.contains("ja.status = $2"));
        assert!(sql.contains("ja.company ILIKE $3"));
        assert!(sql.ends_with("ORDER BY ja.updated_at DESC NULLS LAST, ja.id ASC"));
        assert!(!sql.contains("META"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn applied_date_sorts_nulls_last_both_ways() {
        let owner = Uuid::new_v4();
        let dated = application(owner, "META");
        let mut undated = application(owner, "META");
        undated.applied_date = None;

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let filter = ApplicationFilter::new(
                Scope::All,
                &ListApplicationsQuery {
                    sort_by: ApplicationSort::AppliedDate,
                    sort_order: order,
                    ..Default::default()
                },
            );
            assert_eq!(filter.compare(&dated, &undated), Ordering::Less);
        }
    }
}
