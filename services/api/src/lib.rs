//! ApplyTrack API service
//!
//! HTTP transport, authorization, the application workflow and persistence
//! for the job-application tracker. The binary in `main.rs` wires these to
//! PostgreSQL; the test suites drive the same router over [`store::MemoryStore`].

pub mod config;
pub mod dashboard;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod workflow;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
