//! Persistence contracts of the API service
//!
//! Handlers are generic over [`Store`], the union of every storage trait the
//! service needs. [`PgStore`] backs the running service; [`MemoryStore`]
//! keeps the same contracts in process for tests.
//!
//! Writes that must be audited take a closure that sees the current row and
//! returns both the new row and the activity entry describing the change.
//! The store runs it inside the same transaction (or lock) as the write, so
//! an application is never changed without its log entry, or vice versa.

use std::future::Future;

use auth::models::User;
use auth::repositories::{CredentialStore, RefreshTokenStore};
use common::{DatabaseResult, PageRequest};
use uuid::Uuid;

use crate::models::{
    ActivityDraft, ActivityEntry, ApplicationFacts, JobApplication, JobPosting, NewApplication,
    NewPosting, PostingPatch, UserSummary,
};

pub mod filter;
pub mod memory;
pub mod postgres;

pub use filter::{ActivityFilter, ApplicationFilter, PostingFilter, PostingScope, Scope, UserFilter};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// `None` when the row does not exist, otherwise the closure's verdict
pub type Guarded<T, E> = Option<Result<T, E>>;

pub trait JobPostingStore: Clone + Send + Sync + 'static {
    fn insert_posting(
        &self,
        posting: NewPosting,
    ) -> impl Future<Output = DatabaseResult<JobPosting>> + Send;

    fn find_posting(&self, id: Uuid)
    -> impl Future<Output = DatabaseResult<Option<JobPosting>>> + Send;

    /// One page of matching postings plus the total match count
    fn list_postings(
        &self,
        filter: &PostingFilter,
        page: PageRequest,
    ) -> impl Future<Output = DatabaseResult<(Vec<JobPosting>, u64)>> + Send;

    fn update_posting(
        &self,
        id: Uuid,
        patch: PostingPatch,
    ) -> impl Future<Output = DatabaseResult<Option<JobPosting>>> + Send;

    /// Delete a posting and detach the applications made to it
    fn delete_posting(&self, id: Uuid) -> impl Future<Output = DatabaseResult<bool>> + Send;
}

pub trait ApplicationStore: Clone + Send + Sync + 'static {
    fn find_application(
        &self,
        id: Uuid,
    ) -> impl Future<Output = DatabaseResult<Option<JobApplication>>> + Send;

    fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: PageRequest,
    ) -> impl Future<Output = DatabaseResult<(Vec<JobApplication>, u64)>> + Send;

    /// Insert an application together with the entry `audit` derives from it.
    ///
    /// A second application by the same user to the same posting fails with
    /// `DatabaseError::Conflict`.
    fn insert_application<A>(
        &self,
        application: NewApplication,
        audit: A,
    ) -> impl Future<Output = DatabaseResult<JobApplication>> + Send
    where
        A: FnOnce(&JobApplication) -> ActivityDraft + Send;

    /// Read-modify-write one application under a row lock.
    ///
    /// `edit` receives the current row and returns the row to store plus the
    /// entry to log, or rejects the change; a rejection writes nothing.
    /// `updated_at` is stamped by the store.
    fn edit_application<F, E>(
        &self,
        id: Uuid,
        edit: F,
    ) -> impl Future<Output = DatabaseResult<Guarded<JobApplication, E>>> + Send
    where
        F: FnOnce(&JobApplication) -> Result<(JobApplication, ActivityDraft), E> + Send,
        E: Send;

    /// Hard-delete one application if `check` accepts the current row
    fn delete_application<F, E>(
        &self,
        id: Uuid,
        check: F,
    ) -> impl Future<Output = DatabaseResult<Guarded<(), E>>> + Send
    where
        F: FnOnce(&JobApplication) -> Result<(), E> + Send,
        E: Send;

    /// Dashboard columns of every application in scope
    fn application_facts(
        &self,
        scope: &Scope,
    ) -> impl Future<Output = DatabaseResult<Vec<ApplicationFacts>>> + Send;
}

pub trait ActivityStore: Clone + Send + Sync + 'static {
    /// Newest entries first
    fn list_activity(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> impl Future<Output = DatabaseResult<(Vec<ActivityEntry>, u64)>> + Send;
}

pub trait UserAdminStore: Clone + Send + Sync + 'static {
    /// Newest accounts first
    fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> impl Future<Output = DatabaseResult<(Vec<UserSummary>, u64)>> + Send;

    fn count_applications(&self, user_id: Uuid)
    -> impl Future<Output = DatabaseResult<u64>> + Send;

    /// Read-modify-write one user; `edit` may reject the change
    fn edit_user<F, E>(
        &self,
        id: Uuid,
        edit: F,
    ) -> impl Future<Output = DatabaseResult<Guarded<User, E>>> + Send
    where
        F: FnOnce(&User) -> Result<User, E> + Send,
        E: Send;
}

/// Everything the API needs from persistence
pub trait Store:
    CredentialStore + RefreshTokenStore + JobPostingStore + ApplicationStore + ActivityStore + UserAdminStore
{
}

impl<T> Store for T where
    T: CredentialStore
        + RefreshTokenStore
        + JobPostingStore
        + ApplicationStore
        + ActivityStore
        + UserAdminStore
{
}
