use std::path::{Path, PathBuf};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::MigrateError;
use crate::source::SourceSet;

const VERSION_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

#[derive(Debug)]
pub struct CreatedMigration {
    pub version: i64,
    pub up: PathBuf,
    pub down: PathBuf,
}

/// Scaffold an empty `<version>_<name>.up.sql` / `.down.sql` pair in `dir`,
/// creating the directory if needed. The version is the current UTC timestamp
/// (`YYYYMMDDHHMMSS`); a collision with an existing version is rejected.
pub fn create_migration(dir: &Path, name: &str) -> Result<CreatedMigration, MigrateError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(MigrateError::InvalidSource {
            message: format!("migration name '{name}' has no usable characters"),
        });
    }

    std::fs::create_dir_all(dir).map_err(|e| MigrateError::io(dir, e))?;

    let version = timestamp_version()?;
    let sources = SourceSet::load(dir)?;
    if sources.find(version).is_some() {
        return Err(MigrateError::InvalidSource {
            message: format!("version {version} already exists in {}", dir.display()),
        });
    }

    let up = dir.join(format!("{version}_{slug}.up.sql"));
    let down = dir.join(format!("{version}_{slug}.down.sql"));
    std::fs::write(&up, "").map_err(|e| MigrateError::io(&up, e))?;
    std::fs::write(&down, "").map_err(|e| MigrateError::io(&down, e))?;

    Ok(CreatedMigration { version, up, down })
}

fn timestamp_version() -> Result<i64, MigrateError> {
    let formatted = OffsetDateTime::now_utc()
        .format(VERSION_FORMAT)
        .map_err(|e| MigrateError::InvalidSource {
            message: format!("failed to format version timestamp: {e}"),
        })?;
    formatted.parse::<i64>().map_err(|e| MigrateError::InvalidSource {
        message: format!("failed to parse version timestamp '{formatted}': {e}"),
    })
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    slug.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::{create_migration, slugify};
    use crate::source::SourceSet;

    #[test]
    fn slugifies_names() {
        assert_eq!(slugify("Create Users"), "create_users");
        assert_eq!(slugify("add-index!!on/posts"), "add_index_on_posts");
        assert_eq!(slugify("  already_fine  "), "already_fine");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn creates_a_discoverable_pair() {
        let dir = tempfile::tempdir().unwrap();
        let created = create_migration(dir.path(), "Create Users").unwrap();

        assert!(created.up.exists());
        assert!(created.down.exists());

        let sources = SourceSet::load(dir.path()).unwrap();
        assert_eq!(sources.len(), 1);
        let source = sources.find(created.version).unwrap();
        assert_eq!(source.name, "create_users");
        assert!(source.down.is_some());
    }

    #[test]
    fn rejects_unusable_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(create_migration(dir.path(), "???").is_err());
    }

    #[test]
    fn creates_the_directory_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("internal").join("migrations");
        let created = create_migration(&nested, "init").unwrap();
        assert!(created.up.starts_with(&nested));
    }
}
