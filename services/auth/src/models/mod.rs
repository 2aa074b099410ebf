//! Authentication models

pub mod refresh_token;
pub mod role;
pub mod user;

pub use refresh_token::{NewRefreshToken, RefreshToken};
pub use role::{Role, check_role_company};
pub use user::{LoginCredentials, NewAccount, NewUser, ProfileUpdate, User, UserProfile, UserUpdate};
