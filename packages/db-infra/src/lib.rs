//! Shared database configuration and connection infrastructure.
//! Used by the readit backend and the migration CLI.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db;
pub use error::DbInfraError;
pub use infra::db::core::{
    build_admin_pool, build_app_pool, orchestrate_migration, orchestrate_migration_internal,
};
