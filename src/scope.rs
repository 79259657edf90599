// Planning scopes
// the three horizons a plan can be written for

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Planning horizon. Selects which goal, feedback and run files are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Daily,
    Weekly,
    Yearly,
}

impl Scope {
    /// Every scope, in declaration order (used for directory bootstrapping).
    pub const ALL: [Scope; 3] = [Scope::Daily, Scope::Weekly, Scope::Yearly];

    /// Order used by the autopilot: longest horizon first.
    pub const SCHEDULED_ORDER: [Scope; 3] = [Scope::Yearly, Scope::Weekly, Scope::Daily];

    /// Lowercase name, also the file stem on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Daily => "daily",
            Scope::Weekly => "weekly",
            Scope::Yearly => "yearly",
        }
    }

    /// Single-letter prefix for run ids and archive names.
    pub fn initial(&self) -> char {
        match self {
            Scope::Daily => 'D',
            Scope::Weekly => 'W',
            Scope::Yearly => 'Y',
        }
    }

    /// Capitalised name used in run headers.
    pub fn title(&self) -> &'static str {
        match self {
            Scope::Daily => "Daily",
            Scope::Weekly => "Weekly",
            Scope::Yearly => "Yearly",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Scope::Daily => 0,
            Scope::Weekly => 1,
            Scope::Yearly => 2,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Scope::Daily),
            "weekly" => Ok(Scope::Weekly),
            "yearly" => Ok(Scope::Yearly),
            other => Err(format!(
                "unknown scope '{}' (expected daily, weekly or yearly)",
                other
            )),
        }
    }
}
