// System prompt store
// plain text files under <root>/prompts

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{PlannerError, Result};

/// Used when `system_planner.txt` is missing or empty.
pub const DEFAULT_PLANNER_PROMPT: &str =
    "You are an autonomous planner that iteratively refines goals.";

/// System prompt texts. Missing files load as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemPrompts {
    pub planner: String,
    pub refiner: String,
    pub summarizer: String,
    pub persona_general: String,
}

impl SystemPrompts {
    /// Planner instruction, falling back to the built-in default.
    pub fn planner_or_default(&self) -> &str {
        if self.planner.trim().is_empty() {
            DEFAULT_PLANNER_PROMPT
        } else {
            &self.planner
        }
    }
}

/// Reads prompt files fresh on every load so edits apply to the next run.
#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> Result<SystemPrompts> {
        Ok(SystemPrompts {
            planner: self.read("system_planner.txt")?,
            refiner: self.read("system_refiner.txt")?,
            summarizer: self.read("system_summarizer.txt")?,
            persona_general: self.read("persona_general.txt")?,
        })
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(PlannerError::io(path, e)),
        }
    }
}
