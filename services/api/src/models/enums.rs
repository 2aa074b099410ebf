//! Closed vocabularies shared by postings, applications and the activity log

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! labelled_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "work_mode", rename_all = "lowercase")]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

labelled_enum!(WorkMode {
    Remote => "remote",
    Hybrid => "hybrid",
    Onsite => "onsite",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "employment_type", rename_all = "lowercase")]
pub enum EmploymentType {
    Fulltime,
    Contract,
    Intern,
}

labelled_enum!(EmploymentType {
    Fulltime => "fulltime",
    Contract => "contract",
    Intern => "intern",
});

/// Whether a job posting accepts applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "posting_status", rename_all = "lowercase")]
pub enum PostingStatus {
    Open,
    Closed,
}

labelled_enum!(PostingStatus {
    Open => "open",
    Closed => "closed",
});

/// Pipeline stage of an application
///
/// Any stage may move to any other; there are no forbidden transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
pub enum ApplicationStatus {
    Wishlist,
    Applied,
    Interview,
    Offer,
    Rejected,
    Ghosted,
}

labelled_enum!(ApplicationStatus {
    Wishlist => "wishlist",
    Applied => "applied",
    Interview => "interview",
    Offer => "offer",
    Rejected => "rejected",
    Ghosted => "ghosted",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "priority", rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

labelled_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Kind of an activity-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "activity_event", rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    StatusChanged,
    Archived,
    Restored,
    NoteAdded,
}

labelled_enum!(EventType {
    Created => "created",
    Updated => "updated",
    StatusChanged => "status_changed",
    Archived => "archived",
    Restored => "restored",
    NoteAdded => "note_added",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
