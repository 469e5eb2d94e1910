pub mod core;
pub mod locking;

pub use self::core::{build_admin_pool, build_app_pool, orchestrate_migration};
