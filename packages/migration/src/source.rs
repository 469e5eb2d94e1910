use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lazy_regex::regex_captures;

use crate::error::MigrateError;

/// Sentinel for "no migration applied". Matches the value stored in
/// `schema_migrations` when a down run walks past the first migration.
pub const NIL_VERSION: i64 = -1;

/// A single versioned migration on disk: a mandatory up script and an
/// optional down script sharing the same `<version>_<name>` stem.
#[derive(Debug, Clone)]
pub struct MigrationSource {
    pub version: i64,
    pub name: String,
    pub up: PathBuf,
    pub down: Option<PathBuf>,
}

/// The ordered set of migrations discovered in a migrations directory.
#[derive(Debug, Default)]
pub struct SourceSet {
    migrations: Vec<MigrationSource>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScriptKind {
    Up,
    Down,
}

/// Parse a migration filename of the form `<version>_<name>.up.sql` or
/// `<version>_<name>.down.sql`. Returns None for anything else, which the
/// directory scan silently ignores.
pub(crate) fn parse_filename(filename: &str) -> Option<(i64, String, ScriptKind)> {
    let (_, version, name, kind) = regex_captures!(r"^(\d+)_(.+)\.(up|down)\.sql$", filename)?;
    let version = version.parse::<i64>().ok()?;
    let kind = match kind {
        "up" => ScriptKind::Up,
        _ => ScriptKind::Down,
    };
    Some((version, name.to_string(), kind))
}

impl SourceSet {
    /// Scan `dir` and build the ordered migration set.
    ///
    /// Two scripts of the same kind for one version, or an up/down pair whose
    /// names disagree, are rejected. A version with only a down script is
    /// rejected as well.
    pub fn load(dir: &Path) -> Result<Self, MigrateError> {
        let entries = std::fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;

        let mut by_version: BTreeMap<i64, MigrationSource> = BTreeMap::new();
        let mut down_only: BTreeMap<i64, (String, PathBuf)> = BTreeMap::new();

        for entry in entries {
            let entry = entry.map_err(|e| MigrateError::io(dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some((version, name, kind)) = parse_filename(file_name) else {
                continue;
            };
            let path = entry.path();

            match kind {
                ScriptKind::Up => {
                    if let Some(existing) = by_version.get(&version) {
                        return Err(MigrateError::InvalidSource {
                            message: format!(
                                "duplicate up script for version {version}: {} and {}",
                                existing.up.display(),
                                path.display()
                            ),
                        });
                    }
                    let down = match down_only.remove(&version) {
                        Some((down_name, down_path)) => {
                            check_pair_name(version, &name, &down_name)?;
                            Some(down_path)
                        }
                        None => None,
                    };
                    by_version.insert(
                        version,
                        MigrationSource {
                            version,
                            name,
                            up: path,
                            down,
                        },
                    );
                }
                ScriptKind::Down => {
                    if let Some(source) = by_version.get_mut(&version) {
                        if let Some(existing) = &source.down {
                            return Err(MigrateError::InvalidSource {
                                message: format!(
                                    "duplicate down script for version {version}: {} and {}",
                                    existing.display(),
                                    path.display()
                                ),
                            });
                        }
                        check_pair_name(version, &source.name, &name)?;
                        source.down = Some(path);
                    } else if let Some((_, existing_path)) = down_only.get(&version) {
                        return Err(MigrateError::InvalidSource {
                            message: format!(
                                "duplicate down script for version {version}: {} and {}",
                                existing_path.display(),
                                path.display()
                            ),
                        });
                    } else {
                        down_only.insert(version, (name, path));
                    }
                }
            }
        }

        if let Some((version, (_, path))) = down_only.into_iter().next() {
            return Err(MigrateError::InvalidSource {
                message: format!(
                    "version {version} has a down script but no up script: {}",
                    path.display()
                ),
            });
        }

        Ok(Self {
            migrations: by_version.into_values().collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationSource> {
        self.migrations.iter()
    }

    pub fn find(&self, version: i64) -> Option<&MigrationSource> {
        self.migrations.iter().find(|m| m.version == version)
    }

    /// Highest known version, or NIL_VERSION for an empty set.
    pub fn last_version(&self) -> i64 {
        self.migrations
            .last()
            .map(|m| m.version)
            .unwrap_or(NIL_VERSION)
    }

    /// Greatest source version strictly below `version`, or NIL_VERSION.
    pub fn prev_version(&self, version: i64) -> i64 {
        self.migrations
            .iter()
            .rev()
            .find(|m| m.version < version)
            .map(|m| m.version)
            .unwrap_or(NIL_VERSION)
    }

    #[cfg(test)]
    pub(crate) fn from_vec(mut migrations: Vec<MigrationSource>) -> Self {
        migrations.sort_by_key(|m| m.version);
        Self { migrations }
    }
}

fn check_pair_name(version: i64, up_name: &str, down_name: &str) -> Result<(), MigrateError> {
    if up_name != down_name {
        return Err(MigrateError::InvalidSource {
            message: format!(
                "version {version} has mismatched names: '{up_name}' (up) vs '{down_name}' (down)"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_filename, ScriptKind, SourceSet};
    use crate::error::MigrateError;

    fn touch(dir: &std::path::Path, name: &str) {
        std::fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn parses_up_and_down_filenames() {
        let (version, name, kind) = parse_filename("0001_create_users.up.sql").unwrap();
        assert_eq!(version, 1);
        assert_eq!(name, "create_users");
        assert_eq!(kind, ScriptKind::Up);

        let (version, name, kind) = parse_filename("20250830120000_add_index.down.sql").unwrap();
        assert_eq!(version, 20250830120000);
        assert_eq!(name, "add_index");
        assert_eq!(kind, ScriptKind::Down);
    }

    #[test]
    fn rejects_non_migration_filenames() {
        assert!(parse_filename("README.md").is_none());
        assert!(parse_filename("0001_missing_kind.sql").is_none());
        assert!(parse_filename("notaversion_init.up.sql").is_none());
        assert!(parse_filename("0001_.up.sql").is_none());
    }

    #[test]
    fn loads_ordered_set_and_ignores_junk() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0002_second.up.sql");
        touch(dir.path(), "0002_second.down.sql");
        touch(dir.path(), "0001_first.up.sql");
        touch(dir.path(), ".gitkeep");
        touch(dir.path(), "notes.txt");

        let sources = SourceSet::load(dir.path()).unwrap();
        assert_eq!(sources.len(), 2);

        let versions: Vec<i64> = sources.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);

        let first = sources.find(1).unwrap();
        assert!(first.down.is_none());
        let second = sources.find(2).unwrap();
        assert!(second.down.is_some());
    }

    #[test]
    fn rejects_duplicate_versions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_first.up.sql");
        touch(dir.path(), "0001_other.up.sql");

        let err = SourceSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSource { .. }));
    }

    #[test]
    fn rejects_mismatched_pair_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_first.up.sql");
        touch(dir.path(), "0001_renamed.down.sql");

        let err = SourceSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSource { .. }));
    }

    #[test]
    fn rejects_down_without_up() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_first.down.sql");

        let err = SourceSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSource { .. }));
    }

    #[test]
    fn last_and_prev_version() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_first.up.sql");
        touch(dir.path(), "0003_third.up.sql");

        let sources = SourceSet::load(dir.path()).unwrap();
        assert_eq!(sources.last_version(), 3);
        assert_eq!(sources.prev_version(3), 1);
        assert_eq!(sources.prev_version(1), super::NIL_VERSION);
    }
}
