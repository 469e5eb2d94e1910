//! Versioned SQL migration engine.
//!
//! Migrations are `<version>_<name>.up.sql` / `.down.sql` script pairs in a
//! migrations directory. Applied state is a single row in
//! `schema_migrations` (version + dirty flag): the dirty flag is written
//! before each script runs and cleared after it succeeds, so an interrupted
//! run is visible and blocks further work until `force` resolves it.

use std::path::Path;

pub use sea_orm::{ConnectionTrait, DatabaseConnection};

pub mod create;
pub mod error;
pub mod plan;
pub mod runner;
pub mod source;

pub use create::{create_migration, CreatedMigration};
pub use error::MigrateError;
pub use runner::{read_version, VersionInfo};
pub use source::{SourceSet, NIL_VERSION};

#[derive(Debug, Clone)]
pub enum MigrationCommand {
    Up,
    Down { steps: u64 },
    Goto { version: i64 },
    Force { version: i64 },
    Version,
}

/// Execute a migration command against `db` using the scripts in `dir`.
/// Used by both the CLI and tests.
pub async fn migrate(
    db: &DatabaseConnection,
    dir: &Path,
    command: MigrationCommand,
) -> Result<(), MigrateError> {
    match command {
        MigrationCommand::Version => {
            let info = runner::read_version(db).await?;
            if info.is_nil() {
                tracing::info!("▶ version=nil dirty={}", info.dirty);
            } else {
                tracing::info!("▶ version={} dirty={}", info.version, info.dirty);
            }
            Ok(())
        }
        MigrationCommand::Force { version } => {
            runner::force_version(db, version).await?;
            tracing::info!("✅ forced version={version} dirty=false");
            Ok(())
        }
        MigrationCommand::Up
        | MigrationCommand::Down { .. }
        | MigrationCommand::Goto { .. } => run_planned(db, dir, command).await,
    }
}

async fn run_planned(
    db: &DatabaseConnection,
    dir: &Path,
    command: MigrationCommand,
) -> Result<(), MigrateError> {
    runner::ensure_version_table(db).await?;

    let before = runner::read_version(db).await?;
    if before.dirty {
        return Err(MigrateError::Dirty {
            version: before.version,
        });
    }

    let sources = SourceSet::load(dir)?;
    tracing::info!(
        "▶ cmd={command:?} dir={} defined={} current={}",
        dir.display(),
        sources.len(),
        before.version
    );

    let steps = match &command {
        MigrationCommand::Up => plan::plan_up(&sources, before.version),
        MigrationCommand::Down { steps } => plan::plan_down(&sources, before.version, *steps)?,
        MigrationCommand::Goto { version } => plan::plan_goto(&sources, before.version, *version)?,
        _ => unreachable!("run_planned only handles planned commands"),
    };

    if steps.is_empty() {
        tracing::info!("✅ {command:?} no change");
        return Ok(());
    }

    match runner::run_steps(db, &steps).await {
        Ok(()) => {
            let after = runner::read_version(db).await?;
            tracing::info!(
                "✅ {command:?} OK steps={} version {} -> {}",
                steps.len(),
                before.version,
                after.version
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ {command:?} failed: {e}");
            Err(e)
        }
    }
}

/// Fast check used before taking the migration lock: true when the database
/// is clean and no source above the recorded version exists.
pub async fn is_up_to_date(db: &DatabaseConnection, dir: &Path) -> Result<bool, MigrateError> {
    let info = runner::read_version(db).await?;
    if info.dirty {
        return Ok(false);
    }
    let sources = SourceSet::load(dir)?;
    Ok(plan::plan_up(&sources, info.version).is_empty())
}
