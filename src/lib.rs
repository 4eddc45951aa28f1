//! MongoDB bootstrap and document models for the PAE menu planner.

pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod models;

pub use config::DbConfig;
pub use db::DbManager;
pub use error::DbError;
pub use health::{HealthState, HealthStatus};
