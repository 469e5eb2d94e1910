use std::path::PathBuf;

use crate::error::MigrateError;
use crate::source::{MigrationSource, SourceSet, NIL_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One script execution. `record` is the version written to
/// `schema_migrations` for this step: the migration's own version when going
/// up, the previous source version (or NIL_VERSION) when going down.
#[derive(Debug, Clone)]
pub struct Step {
    pub direction: Direction,
    pub version: i64,
    pub name: String,
    pub script: PathBuf,
    pub record: i64,
}

fn up_step(source: &MigrationSource) -> Step {
    Step {
        direction: Direction::Up,
        version: source.version,
        name: source.name.clone(),
        script: source.up.clone(),
        record: source.version,
    }
}

fn down_step(sources: &SourceSet, source: &MigrationSource) -> Result<Step, MigrateError> {
    let script = source
        .down
        .clone()
        .ok_or(MigrateError::MissingDownScript {
            version: source.version,
        })?;
    Ok(Step {
        direction: Direction::Down,
        version: source.version,
        name: source.name.clone(),
        script,
        record: sources.prev_version(source.version),
    })
}

/// Every pending migration above `current`, ascending. Empty means no change.
pub fn plan_up(sources: &SourceSet, current: i64) -> Vec<Step> {
    sources
        .iter()
        .filter(|m| m.version > current)
        .map(up_step)
        .collect()
}

/// The `steps` most recently applied migrations, descending.
///
/// History is assumed linear: everything at or below `current` counts as
/// applied. A recorded version with no matching source cannot be walked back.
pub fn plan_down(sources: &SourceSet, current: i64, steps: u64) -> Result<Vec<Step>, MigrateError> {
    if current == NIL_VERSION {
        return Ok(Vec::new());
    }
    if sources.find(current).is_none() {
        return Err(MigrateError::NotFound { version: current });
    }

    let applied: Vec<&MigrationSource> =
        sources.iter().filter(|m| m.version <= current).collect();

    applied
        .into_iter()
        .rev()
        .take(steps as usize)
        .map(|source| down_step(sources, source))
        .collect()
}

/// Migrate up or down until the recorded version equals `target`.
pub fn plan_goto(sources: &SourceSet, current: i64, target: i64) -> Result<Vec<Step>, MigrateError> {
    if sources.find(target).is_none() {
        return Err(MigrateError::NotFound { version: target });
    }
    if target == current {
        return Ok(Vec::new());
    }

    if target > current {
        return Ok(sources
            .iter()
            .filter(|m| m.version > current && m.version <= target)
            .map(up_step)
            .collect());
    }

    if sources.find(current).is_none() {
        return Err(MigrateError::NotFound { version: current });
    }

    let reverted: Vec<&MigrationSource> = sources
        .iter()
        .filter(|m| m.version > target && m.version <= current)
        .collect();

    reverted
        .into_iter()
        .rev()
        .map(|source| down_step(sources, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{plan_down, plan_goto, plan_up, Direction};
    use crate::error::MigrateError;
    use crate::source::{MigrationSource, SourceSet, NIL_VERSION};

    fn source(version: i64, with_down: bool) -> MigrationSource {
        MigrationSource {
            version,
            name: format!("m{version}"),
            up: PathBuf::from(format!("{version:04}_m{version}.up.sql")),
            down: with_down.then(|| PathBuf::from(format!("{version:04}_m{version}.down.sql"))),
        }
    }

    fn set(versions: &[i64]) -> SourceSet {
        SourceSet::from_vec(versions.iter().map(|&v| source(v, true)).collect())
    }

    #[test]
    fn up_from_nil_applies_everything_in_order() {
        let sources = set(&[1, 2, 5]);
        let steps = plan_up(&sources, NIL_VERSION);
        let versions: Vec<i64> = steps.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![1, 2, 5]);
        assert!(steps.iter().all(|s| s.direction == Direction::Up));
        assert!(steps.iter().all(|s| s.record == s.version));
    }

    #[test]
    fn up_with_nothing_pending_is_no_change() {
        let sources = set(&[1, 2]);
        assert!(plan_up(&sources, 2).is_empty());
    }

    #[test]
    fn down_reverts_most_recent_first() {
        let sources = set(&[1, 2, 5]);
        let steps = plan_down(&sources, 5, 2).unwrap();
        let versions: Vec<i64> = steps.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![5, 2]);
        assert_eq!(steps[0].record, 2);
        assert_eq!(steps[1].record, 1);
    }

    #[test]
    fn down_past_first_migration_records_nil() {
        let sources = set(&[1]);
        let steps = plan_down(&sources, 1, 1).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].record, NIL_VERSION);
    }

    #[test]
    fn down_from_nil_is_no_change() {
        let sources = set(&[1, 2]);
        assert!(plan_down(&sources, NIL_VERSION, 1).unwrap().is_empty());
    }

    #[test]
    fn down_with_unknown_current_version_fails() {
        let sources = set(&[1, 2]);
        let err = plan_down(&sources, 7, 1).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { version: 7 }));
    }

    #[test]
    fn down_without_down_script_fails() {
        let sources = SourceSet::from_vec(vec![source(1, true), source(2, false)]);
        let err = plan_down(&sources, 2, 1).unwrap_err();
        assert!(matches!(err, MigrateError::MissingDownScript { version: 2 }));
    }

    #[test]
    fn goto_up_stops_at_target() {
        let sources = set(&[1, 2, 5, 9]);
        let steps = plan_goto(&sources, 1, 5).unwrap();
        let versions: Vec<i64> = steps.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![2, 5]);
    }

    #[test]
    fn goto_down_lands_on_target() {
        let sources = set(&[1, 2, 5, 9]);
        let steps = plan_goto(&sources, 9, 2).unwrap();
        let versions: Vec<i64> = steps.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![9, 5]);
        assert_eq!(steps.last().unwrap().record, 2);
    }

    #[test]
    fn goto_current_version_is_no_change() {
        let sources = set(&[1, 2]);
        assert!(plan_goto(&sources, 2, 2).unwrap().is_empty());
    }

    #[test]
    fn goto_unknown_target_fails() {
        let sources = set(&[1, 2]);
        let err = plan_goto(&sources, 1, 4).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { version: 4 }));
    }
}
