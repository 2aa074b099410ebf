//! Common library for the ApplyTrack services
//!
//! This crate provides shared functionality used by the authentication core
//! and the API service: database connectivity, the storage error taxonomy
//! and pagination primitives.

pub mod database;
pub mod error;
pub mod nullable;
pub mod pagination;

pub use error::{DatabaseError, DatabaseResult};
pub use pagination::{PageRequest, Paginated, Pagination};
