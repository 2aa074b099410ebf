//! PostgreSQL store

use auth::models::{NewRefreshToken, NewUser, ProfileUpdate, RefreshToken, User};
use auth::repositories::user::USER_COLUMNS;
use auth::repositories::{CredentialStore, RefreshTokenRepository, RefreshTokenStore, UserRepository};
use chrono::{DateTime, Utc};
use common::{DatabaseResult, PageRequest};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::filter::{ActivityFilter, ApplicationFilter, PostingFilter, Scope, UserFilter};
use super::{ActivityStore, ApplicationStore, Guarded, JobPostingStore, UserAdminStore};
use crate::models::{
    ActivityDraft, ActivityEntry, ApplicationFacts, ApplicationSummary, EventType,
    JobApplication, JobPosting, NewApplication, NewPosting, PostingPatch, UserSummary,
};

const APPLICATION_COLUMNS: &str = "ja.id, ja.user_id, ja.job_posting_id, ja.applicant_name, \
    ja.company, ja.role_title, ja.location, ja.work_mode, ja.employment_type, ja.status, \
    ja.priority, ja.applied_date, ja.next_follow_up_date, ja.salary_target, ja.link, ja.notes, \
    ja.archived, ja.created_at, ja.updated_at";

const POSTING_COLUMNS: &str = "jp.id, jp.recruiter_id, jp.company, jp.role_title, jp.location, \
    jp.work_mode, jp.employment_type, jp.description, jp.requirements, jp.salary_range, \
    jp.status, jp.created_at, jp.updated_at";

const ACTIVITY_SELECT: &str = "SELECT al.id, al.user_id, al.job_application_id, al.event_type, \
    al.description, al.metadata, al.created_at, ja.company AS application_company, \
    ja.role_title AS application_role_title \
    FROM activity_logs al LEFT JOIN job_applications ja ON ja.id = al.job_application_id";

/// Store backed by a PostgreSQL pool
///
/// User and refresh-token queries are delegated to the repositories of the
/// `auth` crate so there is one definition of each query.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    users: UserRepository,
    refresh_tokens: RefreshTokenRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            refresh_tokens: RefreshTokenRepository::new(pool.clone()),
            pool,
        }
    }
}

#[derive(FromRow)]
struct ActivityRow {
    id: Uuid,
    user_id: Uuid,
    job_application_id: Option<Uuid>,
    event_type: EventType,
    description: String,
    metadata: Option<Value>,
    created_at: DateTime<Utc>,
    application_company: Option<String>,
    application_role_title: Option<String>,
}

impl From<ActivityRow> for ActivityEntry {
    fn from(row: ActivityRow) -> Self {
        let job_application = match (row.application_company, row.application_role_title) {
            (Some(company), Some(role_title)) => Some(ApplicationSummary { company, role_title }),
            _ => None,
        };
        Self {
            id: row.id,
            user_id: row.user_id,
            job_application_id: row.job_application_id,
            event_type: row.event_type,
            description: row.description,
            metadata: row.metadata,
            created_at: row.created_at,
            job_application,
        }
    }
}

async fn insert_activity(conn: &mut PgConnection, draft: ActivityDraft) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, user_id, job_application_id, event_type, description, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(draft.user_id)
    .bind(draft.job_application_id)
    .bind(draft.event_type)
    .bind(&draft.description)
    .bind(draft.metadata)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

async fn count(mut qb: QueryBuilder<'_, Postgres>, pool: &PgPool) -> DatabaseResult<u64> {
    let total: i64 = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(total.max(0) as u64)
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
}

impl CredentialStore for PgStore {
    async fn create_user(&self, user: NewUser) -> DatabaseResult<User> {
        self.users.create_user(user).await
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        self.users.find_user_by_email(email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        self.users.find_user_by_id(id).await
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> DatabaseResult<Option<User>> {
        self.users.update_profile(id, update).await
    }
}

impl RefreshTokenStore for PgStore {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> DatabaseResult<RefreshToken> {
        self.refresh_tokens.insert_refresh_token(token).await
    }

    async fn find_refresh_token(&self, token: &str) -> DatabaseResult<Option<RefreshToken>> {
        self.refresh_tokens.find_refresh_token(token).await
    }

    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: NewRefreshToken,
    ) -> DatabaseResult<bool> {
        self.refresh_tokens
            .rotate_refresh_token(presented, replacement)
            .await
    }

    async fn delete_refresh_token(&self, token: &str) -> DatabaseResult<u64> {
        self.refresh_tokens.delete_refresh_token(token).await
    }

    async fn count_refresh_tokens(&self, user_id: Uuid) -> DatabaseResult<u64> {
        self.refresh_tokens.count_refresh_tokens(user_id).await
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        self.refresh_tokens.purge_expired_refresh_tokens(now).await
    }
}

impl JobPostingStore for PgStore {
    async fn insert_posting(&self, posting: NewPosting) -> DatabaseResult<JobPosting> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            INSERT INTO job_postings AS jp (id, recruiter_id, company, role_title, location, work_mode,
                employment_type, description, requirements, salary_range, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {POSTING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(posting.recruiter_id)
        .bind(&posting.company)
        .bind(&posting.role_title)
        .bind(&posting.location)
        .bind(posting.work_mode)
        .bind(posting.employment_type)
        .bind(&posting.description)
        .bind(&posting.requirements)
        .bind(&posting.salary_range)
        .bind(posting.status)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!("Created job posting {} for {}", row.id, row.company);
        Ok(row)
    }

    async fn find_posting(&self, id: Uuid) -> DatabaseResult<Option<JobPosting>> {
        let row = sqlx::query_as::<_, JobPosting>(&format!(
            "SELECT {POSTING_COLUMNS} FROM job_postings jp WHERE jp.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_postings(
        &self,
        filter: &PostingFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<JobPosting>, u64)> {
        let mut total = QueryBuilder::new("SELECT COUNT(*) FROM job_postings jp");
        filter.push_where(&mut total);
        let total = count(total, &self.pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {POSTING_COLUMNS} FROM job_postings jp"));
        filter.push_where(&mut qb);
        qb.push(filter.order_by_sql());
        push_page(&mut qb, page);
        let rows = qb.build_query_as::<JobPosting>().fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    async fn update_posting(&self, id: Uuid, patch: PostingPatch) -> DatabaseResult<Option<JobPosting>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, JobPosting>(&format!(
            "SELECT {POSTING_COLUMNS} FROM job_postings jp WHERE jp.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut posting) = current else {
            return Ok(None);
        };
        patch.apply_to(&mut posting);

        let row = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            UPDATE job_postings AS jp
            SET role_title = $2, location = $3, work_mode = $4, employment_type = $5,
                description = $6, requirements = $7, salary_range = $8, status = $9, updated_at = $10
            WHERE jp.id = $1
            RETURNING {POSTING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&posting.role_title)
        .bind(&posting.location)
        .bind(posting.work_mode)
        .bind(posting.employment_type)
        .bind(&posting.description)
        .bind(&posting.requirements)
        .bind(&posting.salary_range)
        .bind(posting.status)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    async fn delete_posting(&self, id: Uuid) -> DatabaseResult<bool> {
        // job_applications.job_posting_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM job_postings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl ApplicationStore for PgStore {
    async fn find_application(&self, id: Uuid) -> DatabaseResult<Option<JobApplication>> {
        let row = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications ja WHERE ja.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<JobApplication>, u64)> {
        let mut total = QueryBuilder::new("SELECT COUNT(*) FROM job_applications ja");
        filter.push_where(&mut total);
        let total = count(total, &self.pool).await?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications ja"
        ));
        filter.push_where(&mut qb);
        qb.push(filter.order_by_sql());
        push_page(&mut qb, page);
        let rows = qb
            .build_query_as::<JobApplication>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn insert_application<A>(
        &self,
        application: NewApplication,
        audit: A,
    ) -> DatabaseResult<JobApplication>
    where
        A: FnOnce(&JobApplication) -> ActivityDraft + Send,
    {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            INSERT INTO job_applications AS ja (id, user_id, job_posting_id, applicant_name, company,
                role_title, location, work_mode, employment_type, status, priority, applied_date,
                next_follow_up_date, salary_target, link, notes, archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, FALSE, $17, $17)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(application.user_id)
        .bind(application.job_posting_id)
        .bind(&application.applicant_name)
        .bind(&application.company)
        .bind(&application.role_title)
        .bind(&application.location)
        .bind(application.work_mode)
        .bind(application.employment_type)
        .bind(application.status)
        .bind(application.priority)
        .bind(application.applied_date)
        .bind(application.next_follow_up_date)
        .bind(application.salary_target)
        .bind(&application.link)
        .bind(&application.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_activity(&mut tx, audit(&row)).await?;
        tx.commit().await?;

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
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications ja WHERE ja.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let (next, draft) = match edit(&current) {
            Ok(change) => change,
            Err(rejection) => return Ok(Some(Err(rejection))),
        };

        let row = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            UPDATE job_applications AS ja
            SET job_posting_id = $2, applicant_name = $3, company = $4, role_title = $5,
                location = $6, work_mode = $7, employment_type = $8, status = $9, priority = $10,
                applied_date = $11, next_follow_up_date = $12, salary_target = $13, link = $14,
                notes = $15, archived = $16, updated_at = $17
            WHERE ja.id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next.job_posting_id)
        .bind(&next.applicant_name)
        .bind(&next.company)
        .bind(&next.role_title)
        .bind(&next.location)
        .bind(next.work_mode)
        .bind(next.employment_type)
        .bind(next.status)
        .bind(next.priority)
        .bind(next.applied_date)
        .bind(next.next_follow_up_date)
        .bind(next.salary_target)
        .bind(&next.link)
        .bind(&next.notes)
        .bind(next.archived)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        insert_activity(&mut tx, draft).await?;
        tx.commit().await?;

        Ok(Some(Ok(row)))
    }

    async fn delete_application<F, E>(&self, id: Uuid, check: F) -> DatabaseResult<Guarded<(), E>>
    where
        F: FnOnce(&JobApplication) -> Result<(), E> + Send,
        E: Send,
    {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications ja WHERE ja.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        if let Err(rejection) = check(&current) {
            return Ok(Some(Err(rejection)));
        }

        sqlx::query("DELETE FROM job_applications WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted application {}", id);
        Ok(Some(Ok(())))
    }

    async fn application_facts(&self, scope: &Scope) -> DatabaseResult<Vec<ApplicationFacts>> {
        let mut qb = QueryBuilder::new(
            "SELECT ja.status, ja.archived, ja.applied_date, ja.created_at FROM job_applications ja WHERE TRUE",
        );
        scope.push_sql(&mut qb);
        let rows = qb
            .build_query_as::<ApplicationFacts>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

impl ActivityStore for PgStore {
    async fn list_activity(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<ActivityEntry>, u64)> {
        let mut total = QueryBuilder::new(
            "SELECT COUNT(*) FROM activity_logs al LEFT JOIN job_applications ja ON ja.id = al.job_application_id",
        );
        filter.push_where(&mut total);
        let total = count(total, &self.pool).await?;

        let mut qb = QueryBuilder::new(ACTIVITY_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY al.created_at DESC, al.id DESC");
        push_page(&mut qb, page);
        let rows = qb.build_query_as::<ActivityRow>().fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(ActivityEntry::from).collect(), total))
    }
}

impl UserAdminStore for PgStore {
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<UserSummary>, u64)> {
        let mut total = QueryBuilder::new("SELECT COUNT(*) FROM users u");
        filter.push_where(&mut total);
        let total = count(total, &self.pool).await?;

        let mut qb = QueryBuilder::new(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.company, u.is_active, u.is_admin,
                   u.created_at, u.updated_at,
                   (SELECT COUNT(*) FROM job_applications ja WHERE ja.user_id = u.id) AS application_count
            FROM users u
            "#,
        );
        filter.push_where(&mut qb);
        qb.push(" ORDER BY u.created_at DESC, u.id ASC");
        push_page(&mut qb, page);
        let rows = qb.build_query_as::<UserSummary>().fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    async fn count_applications(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_applications WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.max(0) as u64)
    }

    async fn edit_user<F, E>(&self, id: Uuid, edit: F) -> DatabaseResult<Guarded<User, E>>
    where
        F: FnOnce(&User) -> Result<User, E> + Send,
        E: Send,
    {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let next = match edit(&current) {
            Ok(next) => next,
            Err(rejection) => return Ok(Some(Err(rejection))),
        };

        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, role = $3, company = $4, is_active = $5, is_admin = $6, updated_at = $7
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&next.name)
        .bind(next.role)
        .bind(&next.company)
        .bind(next.is_active)
        .bind(next.is_admin)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Administrative update applied to user {}", id);
        Ok(Some(Ok(row)))
    }
}
