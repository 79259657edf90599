// Flat-file storage for goals, feedback and plan runs
//
// Layout under the data directory:
//   goals/{scope}.md          user-edited goals, overwritten wholesale
//   feedback/{scope}.md       append-only, timestamped feedback log
//   runs/current/{scope}.md   the current plan for a scope (at most one)
//   runs/past/{X}-{ts}.md     archived plans, never rewritten

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::errors::{PlannerError, Result};
use crate::scope::Scope;

/// File-backed store for every per-scope artifact.
///
/// Reads of missing files yield an empty string. Write failures surface as
/// `PlannerError::Io`.
pub struct Storage {
    data_dir: PathBuf,
    /// One append lock per scope, indexed by `Scope::index()`
    feedback_locks: [Mutex<()>; 3],
}

impl Storage {
    /// Storage rooted at `data_dir` (typically `<root>/data`).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            feedback_locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn goals_dir(&self) -> PathBuf {
        self.data_dir.join("goals")
    }

    fn feedback_dir(&self) -> PathBuf {
        self.data_dir.join("feedback")
    }

    fn current_dir(&self) -> PathBuf {
        self.data_dir.join("runs").join("current")
    }

    /// Directory holding archived runs.
    pub fn past_dir(&self) -> PathBuf {
        self.data_dir.join("runs").join("past")
    }

    fn goals_file(&self, scope: Scope) -> PathBuf {
        self.goals_dir().join(format!("{}.md", scope))
    }

    fn feedback_file(&self, scope: Scope) -> PathBuf {
        self.feedback_dir().join(format!("{}.md", scope))
    }

    fn current_run_file(&self, scope: Scope) -> PathBuf {
        self.current_dir().join(format!("{}.md", scope))
    }

    /// Create the directory layout and empty goal/feedback files for every scope.
    ///
    /// Idempotent: existing files are left untouched.
    pub fn init_dirs(&self) -> Result<()> {
        for dir in [
            self.goals_dir(),
            self.current_dir(),
            self.past_dir(),
            self.feedback_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| PlannerError::io(&dir, e))?;
        }

        for scope in Scope::ALL {
            for file in [self.goals_file(scope), self.feedback_file(scope)] {
                if !file.exists() {
                    fs::write(&file, "").map_err(|e| PlannerError::io(&file, e))?;
                }
            }
        }

        tracing::debug!(data_dir = %self.data_dir.display(), "Storage layout ready");
        Ok(())
    }

    pub fn read_goals(&self, scope: Scope) -> Result<String> {
        read_or_empty(&self.goals_file(scope))
    }

    /// Replace the goals for `scope`. Stored trimmed and newline-terminated.
    pub fn write_goals(&self, scope: Scope, text: &str) -> Result<()> {
        let path = self.goals_file(scope);
        ensure_parent(&path)?;
        fs::write(&path, format!("{}\n", text.trim())).map_err(|e| PlannerError::io(&path, e))
    }

    pub fn read_feedback(&self, scope: Scope) -> Result<String> {
        read_or_empty(&self.feedback_file(scope))
    }

    /// Append a timestamped feedback entry. Blank text is ignored.
    ///
    /// Appends to the same scope are serialized so concurrent entries never
    /// interleave.
    pub fn append_feedback(&self, scope: Scope, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let path = self.feedback_file(scope);
        let _guard = self.feedback_locks[scope.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        ensure_parent(&path)?;
        let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PlannerError::io(&path, e))?;
        file.write_all(format!("\n[{}]\n{}\n", stamp, text).as_bytes())
            .map_err(|e| PlannerError::io(&path, e))?;
        file.sync_data().map_err(|e| PlannerError::io(&path, e))
    }

    /// The current run for `scope`, or an empty string when there is none.
    pub fn read_current_run(&self, scope: Scope) -> Result<String> {
        read_or_empty(&self.current_run_file(scope))
    }

    /// Overwrite the current run with a header (scope, run id, timestamp) and `content`.
    ///
    /// Each call writes its own temporary sibling and renames it into place, so
    /// a crash never leaves a half-written plan behind and concurrent writers
    /// for one scope each land a whole plan (the last rename wins).
    pub fn write_current_run(&self, scope: Scope, content: &str, run_id: &str) -> Result<()> {
        let path = self.current_run_file(scope);
        ensure_parent(&path)?;

        let body = format!(
            "# {} • {}\n\nLast updated: {}\n\n{}\n",
            scope.title(),
            run_id,
            Local::now().format("%Y-%m-%dT%H:%M:%S"),
            content.trim()
        );

        let dir = self.current_dir();
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| PlannerError::io(&dir, e))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| PlannerError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| PlannerError::io(&path, e.error))?;
        Ok(())
    }

    /// Archive the current run and clear it.
    ///
    /// Returns the archive file name, or `None` when there is no current run.
    /// The archive is written before the current file is removed: a crash in
    /// between can leave a duplicate but never loses the plan.
    pub fn move_current_to_past(&self, scope: Scope) -> Result<Option<String>> {
        let current = self.current_run_file(scope);
        let content = match fs::read_to_string(&current) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PlannerError::io(&current, e)),
        };

        let past_dir = self.past_dir();
        fs::create_dir_all(&past_dir).map_err(|e| PlannerError::io(&past_dir, e))?;

        let stem = format!("{}-{}", scope.initial(), Local::now().format("%Y%m%d%H%M%S"));
        let (name, dest) = unique_archive_path(&past_dir, &stem);
        fs::write(&dest, content).map_err(|e| PlannerError::io(&dest, e))?;
        fs::remove_file(&current).map_err(|e| PlannerError::io(&current, e))?;

        tracing::info!(scope = %scope, archived_as = %name, "Archived current run");
        Ok(Some(name))
    }

    /// Names of archived runs for `scope`, sorted by name.
    pub fn list_past_runs(&self, scope: Scope) -> Result<Vec<String>> {
        let past_dir = self.past_dir();
        let entries = match fs::read_dir(&past_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PlannerError::io(&past_dir, e)),
        };

        let prefix = format!("{}-", scope.initial());
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".md"))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// First free `{stem}.md`, `{stem}-1.md`, `{stem}-2.md`, ... in `dir`.
fn unique_archive_path(dir: &Path, stem: &str) -> (String, PathBuf) {
    let mut name = format!("{}.md", stem);
    let mut n = 1;
    while dir.join(&name).exists() {
        name = format!("{}-{}.md", stem, n);
        n += 1;
    }
    let path = dir.join(&name);
    (name, path)
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(PlannerError::io(path, e)),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PlannerError::io(parent, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn storage_in_tempdir() -> (Storage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("data"));
        (storage, dir)
    }

    // ── layout ────────────────────────────────────────────────────────────────

    #[test]
    fn test_init_dirs_creates_layout_and_is_idempotent() {
        let (storage, _dir) = storage_in_tempdir();
        storage.init_dirs().unwrap();
        storage.write_goals(Scope::Daily, "keep me").unwrap();
        storage.init_dirs().unwrap();

        assert!(storage.past_dir().is_dir());
        for scope in Scope::ALL {
            assert!(storage.goals_file(scope).exists());
            assert!(storage.feedback_file(scope).exists());
        }
        assert_eq!(storage.read_goals(Scope::Daily).unwrap(), "keep me\n");
    }

    #[test]
    fn test_missing_files_read_as_empty() {
        let (storage, _dir) = storage_in_tempdir();
        assert_eq!(storage.read_goals(Scope::Yearly).unwrap(), "");
        assert_eq!(storage.read_feedback(Scope::Yearly).unwrap(), "");
        assert_eq!(storage.read_current_run(Scope::Yearly).unwrap(), "");
        assert!(storage.list_past_runs(Scope::Yearly).unwrap().is_empty());
    }

    // ── goals ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_write_goals_trims_and_terminates() {
        let (storage, _dir) = storage_in_tempdir();
        storage.write_goals(Scope::Weekly, "  \n ship v2 \n\n").unwrap();
        assert_eq!(storage.read_goals(Scope::Weekly).unwrap(), "ship v2\n");

        storage.write_goals(Scope::Weekly, "rewrite").unwrap();
        assert_eq!(storage.read_goals(Scope::Weekly).unwrap(), "rewrite\n");
    }

    // ── feedback ──────────────────────────────────────────────────────────────

    #[test]
    fn test_feedback_is_ordered_and_timestamped() {
        let (storage, _dir) = storage_in_tempdir();
        storage.append_feedback(Scope::Daily, "A").unwrap();
        storage.append_feedback(Scope::Daily, "B").unwrap();

        let log = storage.read_feedback(Scope::Daily).unwrap();
        let a = log.find("\nA\n").expect("A present");
        let b = log.find("\nB\n").expect("B present");
        assert!(a < b);
        assert_eq!(log.matches("\n[").count(), 2);
        assert!(log.starts_with("\n["));
    }

    #[test]
    fn test_blank_feedback_is_a_noop() {
        let (storage, _dir) = storage_in_tempdir();
        storage.append_feedback(Scope::Daily, "").unwrap();
        storage.append_feedback(Scope::Daily, "   \n\t").unwrap();
        assert_eq!(storage.read_feedback(Scope::Daily).unwrap(), "");
    }

    #[test]
    fn test_concurrent_feedback_appends_are_not_lost() {
        let (storage, _dir) = storage_in_tempdir();
        let storage = Arc::new(storage);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        storage
                            .append_feedback(Scope::Weekly, &format!("entry-{}-{}", i, j))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let log = storage.read_feedback(Scope::Weekly).unwrap();
        for i in 0..8 {
            for j in 0..10 {
                assert!(log.contains(&format!("\nentry-{}-{}\n", i, j)));
            }
        }
        assert_eq!(log.matches("\n[").count(), 80);
    }

    // ── current / past runs ───────────────────────────────────────────────────

    #[test]
    fn test_write_current_run_has_header_and_body() {
        let (storage, _dir) = storage_in_tempdir();
        storage
            .write_current_run(Scope::Daily, "\n# Plan\n1. code\n\n", "D-202601011200")
            .unwrap();

        let run = storage.read_current_run(Scope::Daily).unwrap();
        assert!(run.starts_with("# Daily • D-202601011200\n\nLast updated: "));
        assert!(run.ends_with("# Plan\n1. code\n"));
        let leftovers: Vec<_> = fs::read_dir(storage.current_dir()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_concurrent_current_run_writes_all_succeed_and_one_wins() {
        let (storage, _dir) = storage_in_tempdir();
        let storage = Arc::new(storage);
        storage.init_dirs().unwrap();

        for round in 0..50 {
            let bodies: Vec<String> = (0..4)
                .map(|i| format!("plan {} from writer {}\n{}", round, i, "x".repeat(4096)))
                .collect();
            let handles: Vec<_> = bodies
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, body)| {
                    let storage = Arc::clone(&storage);
                    std::thread::spawn(move || {
                        storage.write_current_run(Scope::Daily, &body, &format!("D-{}", i))
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }

            let run = storage.read_current_run(Scope::Daily).unwrap();
            let winners = bodies
                .iter()
                .filter(|body| run.ends_with(&format!("\n\n{}\n", body.trim())))
                .count();
            assert_eq!(winners, 1, "round {} left a mixed plan", round);
        }

        let leftovers: Vec<_> = fs::read_dir(storage.current_dir()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_move_without_current_run_returns_none() {
        let (storage, _dir) = storage_in_tempdir();
        storage.init_dirs().unwrap();
        assert_eq!(storage.move_current_to_past(Scope::Weekly).unwrap(), None);
        assert!(storage.list_past_runs(Scope::Weekly).unwrap().is_empty());
    }

    #[test]
    fn test_move_archives_and_clears_current() {
        let (storage, _dir) = storage_in_tempdir();
        storage.write_current_run(Scope::Yearly, "big plan", "Y-202601011200").unwrap();
        let before = storage.read_current_run(Scope::Yearly).unwrap();

        let name = storage.move_current_to_past(Scope::Yearly).unwrap().unwrap();
        assert!(name.starts_with("Y-"));
        assert!(name.ends_with(".md"));
        assert_eq!(storage.read_current_run(Scope::Yearly).unwrap(), "");

        let archived = fs::read_to_string(storage.past_dir().join(&name)).unwrap();
        assert_eq!(archived, before);
        assert_eq!(storage.list_past_runs(Scope::Yearly).unwrap(), vec![name]);
    }

    #[test]
    fn test_archives_in_same_second_get_distinct_names() {
        let (storage, _dir) = storage_in_tempdir();
        storage.write_current_run(Scope::Daily, "one", "D-1").unwrap();
        let first = storage.move_current_to_past(Scope::Daily).unwrap().unwrap();
        storage.write_current_run(Scope::Daily, "two", "D-2").unwrap();
        let second = storage.move_current_to_past(Scope::Daily).unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(storage.list_past_runs(Scope::Daily).unwrap().len(), 2);
        assert!(storage.list_past_runs(Scope::Weekly).unwrap().is_empty());
    }
}
