//! API models for request and response payloads

pub mod activity;
pub mod application;
pub mod dashboard;
pub mod enums;
pub mod posting;
pub mod user;
mod validate;

pub use activity::{ActivityDraft, ActivityEntry, ApplicationSummary, ListActivityQuery, RecentActivity};
pub use application::{
    ApplicationPatch, ApplicationSort, CreateApplicationRequest, JobApplication,
    ListApplicationsQuery, NewApplication,
};
pub use dashboard::{ApplicationFacts, DashboardStats, Kpis, TimelinePoint};
pub use enums::{
    ApplicationStatus, EmploymentType, EventType, PostingStatus, Priority, SortOrder, WorkMode,
};
pub use posting::{
    ApplyRequest, CreatePostingRequest, JobPosting, ListPostingsQuery, NewPosting, PostingPatch,
    PostingSort,
};
pub use user::{ListUsersQuery, UserDetail, UserSummary};
