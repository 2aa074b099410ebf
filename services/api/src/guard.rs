//! Authorization guard
//!
//! Turns an [`AuthUser`] into the typed scope its queries run under and
//! re-derives that scope for every single-record operation, so a known id is
//! never enough to reach someone else's row.

use auth::models::Role;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{JobApplication, JobPosting};
use crate::store::{PostingScope, Scope};

impl AuthUser {
    /// Scope over applications and activity
    pub fn scope(&self) -> Result<Scope, ApiError> {
        if self.is_admin {
            return Ok(Scope::All);
        }
        match self.role {
            Role::Applicant => Ok(Scope::Own(self.id)),
            Role::Recruiter => self.company().map(|company| Scope::Company(company.to_string())),
        }
    }

    /// Visibility over job postings
    pub fn posting_scope(&self) -> Result<PostingScope, ApiError> {
        if self.is_admin {
            return Ok(PostingScope::All);
        }
        match self.role {
            Role::Applicant => Ok(PostingScope::OpenOnly),
            Role::Recruiter => self
                .company()
                .map(|company| PostingScope::Company(company.to_string())),
        }
    }

    /// The recruiter's company; a recruiter without one cannot act
    pub fn company(&self) -> Result<&str, ApiError> {
        self.company
            .as_deref()
            .ok_or_else(|| ApiError::InvalidState("Recruiter has no company assigned".to_string()))
    }

    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Only {}s can perform this action", role)))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Read access to one application
    pub fn check_application(&self, application: &JobApplication) -> Result<(), ApiError> {
        if self.scope()?.permits(application) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }

    /// Owner-only operations: archive, restore, delete
    pub fn check_owner(&self, application: &JobApplication) -> Result<(), ApiError> {
        if application.user_id == self.id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Only the applicant who owns this application can do that".to_string(),
            ))
        }
    }

    /// Read access to one posting
    ///
    /// Applicants cannot tell a closed posting from a missing one.
    pub fn check_posting(&self, posting: &JobPosting) -> Result<(), ApiError> {
        match self.posting_scope()? {
            PostingScope::OpenOnly if !PostingScope::OpenOnly.permits(posting) => {
                Err(ApiError::not_found("Job posting"))
            }
            scope if scope.permits(posting) => Ok(()),
            _ => Err(ApiError::Forbidden("Access denied".to_string())),
        }
    }

    /// Write access to one posting: its own recruiter only
    pub fn check_posting_owner(&self, posting: &JobPosting) -> Result<(), ApiError> {
        self.require_role(Role::Recruiter)?;
        if posting.recruiter_id == self.id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Only the recruiter who created this posting can change it".to_string(),
            ))
        }
    }
}
