//! Active-session rows and per-cycle snapshots.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row of the server's active-session table.
///
/// Nullable columns stay `Option` here; use the `*_or_empty` accessors when
/// a display string is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Process {
    /// Session id.
    pub id: u64,
    /// Session user.
    pub user: String,
    /// Client host.
    pub host: String,
    /// Default database, if any.
    pub db: Option<String>,
    /// Command type (Query, Sleep, ...).
    pub command: String,
    /// Seconds spent in the current state.
    pub time: i64,
    /// Thread state, if reported.
    pub state: Option<String>,
    /// Statement text, if any.
    pub info: Option<String>,
}

impl Process {
    pub fn db_or_empty(&self) -> &str {
        self.db.as_deref().unwrap_or_default()
    }

    pub fn state_or_empty(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }

    pub fn info_or_empty(&self) -> &str {
        self.info.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "id={}, user={}, host={}, db={}, command={}, time={}, state={}, info={}",
            self.id,
            self.user,
            self.host,
            self.db_or_empty(),
            self.command,
            self.time,
            self.state_or_empty(),
            self.info_or_empty()
        )
    }
}

/// The sessions observed on one target during one successful poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessSnapshot {
    /// Name of the target the rows came from.
    pub target: String,
    /// Rows in the order the server returned them.
    pub processes: Vec<Process>,
}

impl ProcessSnapshot {
    pub fn new(target: impl Into<String>, processes: Vec<Process>) -> Self {
        Self {
            target: target.into(),
            processes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeping() -> Process {
        Process {
            id: 4,
            user: "root".into(),
            host: "localhost".into(),
            db: None,
            command: "Sleep".into(),
            time: 33363,
            state: None,
            info: None,
        }
    }

    #[test]
    fn test_null_columns_display_as_empty() {
        let p = sleeping();
        assert_eq!(p.state_or_empty(), "");
        assert_eq!(p.info_or_empty(), "");
        assert_eq!(p.db_or_empty(), "");
    }

    #[test]
    fn test_null_and_empty_stay_distinct_in_json() {
        let mut p = sleeping();
        p.state = Some(String::new());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["state"], "");
        assert!(json["info"].is_null());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sleeping().to_string(),
            "id=4, user=root, host=localhost, db=, command=Sleep, time=33363, state=, info="
        );
    }
}
