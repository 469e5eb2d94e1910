use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, RuntimeErr, Statement,
    TransactionTrait,
};
use tracing::info;

use crate::error::MigrateError;
use crate::plan::Step;
use crate::source::NIL_VERSION;

/// Current schema state as recorded in `schema_migrations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: i64,
    pub dirty: bool,
}

impl VersionInfo {
    pub fn nil() -> Self {
        Self {
            version: NIL_VERSION,
            dirty: false,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.version == NIL_VERSION
    }
}

pub async fn ensure_version_table(db: &DatabaseConnection) -> Result<(), MigrateError> {
    db.execute_unprepared(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
         version BIGINT NOT NULL PRIMARY KEY, \
         dirty BOOLEAN NOT NULL)",
    )
    .await?;
    Ok(())
}

// Postgres SQLSTATE for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

/// True when `err` is Postgres reporting a missing relation. A failed read
/// surfaces as `DbErr::Query` wrapping the sqlx database error; anything
/// without the undefined_table SQLSTATE stays fatal.
fn is_undefined_table(err: &DbErr) -> bool {
    let runtime_err = match err {
        DbErr::Query(e) | DbErr::Exec(e) => e,
        _ => return false,
    };
    match runtime_err {
        RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)) => {
            db_err.code().as_deref() == Some(UNDEFINED_TABLE)
        }
        _ => false,
    }
}

/// Read the recorded version. A missing table or empty table reads as nil,
/// so `version` works against a database that has never been migrated.
pub async fn read_version(db: &DatabaseConnection) -> Result<VersionInfo, MigrateError> {
    let stmt = Statement::from_string(
        DatabaseBackend::Postgres,
        "SELECT version, dirty FROM schema_migrations LIMIT 1",
    );

    match db.query_one(stmt).await {
        Ok(Some(row)) => Ok(VersionInfo {
            version: row.try_get("", "version")?,
            dirty: row.try_get("", "dirty")?,
        }),
        Ok(None) => Ok(VersionInfo::nil()),
        Err(e) if is_undefined_table(&e) => Ok(VersionInfo::nil()),
        Err(e) => Err(e.into()),
    }
}

/// Replace the single `schema_migrations` row. A nil version with
/// `dirty = false` leaves the table empty.
pub async fn set_version(
    db: &DatabaseConnection,
    version: i64,
    dirty: bool,
) -> Result<(), MigrateError> {
    let txn = db.begin().await?;
    txn.execute_unprepared("DELETE FROM schema_migrations")
        .await?;
    if version >= 0 || (version == NIL_VERSION && dirty) {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "INSERT INTO schema_migrations (version, dirty) VALUES ($1, $2)",
            [version.into(), dirty.into()],
        );
        txn.execute(stmt).await?;
    }
    txn.commit().await?;
    Ok(())
}

/// Run planned steps in order. Each step records its target version with the
/// dirty flag set, executes its script in a transaction, then clears the
/// flag. A failure aborts the run and leaves the database dirty.
pub async fn run_steps(db: &DatabaseConnection, steps: &[Step]) -> Result<(), MigrateError> {
    for step in steps {
        info!(
            direction = ?step.direction,
            version = step.version,
            name = %step.name,
            "migrate=step"
        );

        let sql = std::fs::read_to_string(&step.script)
            .map_err(|e| MigrateError::io(&step.script, e))?;

        set_version(db, step.record, true).await?;

        // An empty script is a valid no-op migration.
        if !sql.trim().is_empty() {
            let txn = db.begin().await?;
            txn.execute_unprepared(&sql).await?;
            txn.commit().await?;
        }

        set_version(db, step.record, false).await?;
    }
    Ok(())
}

/// Write `version` with a clean dirty flag without running any script. The
/// escape hatch for a dirty database; accepts NIL_VERSION to reset.
pub async fn force_version(db: &DatabaseConnection, version: i64) -> Result<(), MigrateError> {
    if version < NIL_VERSION {
        return Err(MigrateError::InvalidVersion { version });
    }
    ensure_version_table(db).await?;
    set_version(db, version, false).await?;
    Ok(())
}
