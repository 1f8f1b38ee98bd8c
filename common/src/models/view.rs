//! The merged view handed to the renderer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{LogEntry, ProcessSnapshot};

/// Latest successfully parsed snapshot per target name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusView {
    entries: BTreeMap<String, Arc<ProcessSnapshot>>,
}

impl StatusView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry for the snapshot's target.
    ///
    /// Returns `true` when the target had no entry before.
    pub fn upsert(&mut self, snapshot: ProcessSnapshot) -> bool {
        let name = snapshot.target.clone();
        self.entries.insert(name, Arc::new(snapshot)).is_none()
    }

    pub fn get(&self, name: &str) -> Option<&ProcessSnapshot> {
        self.entries.get(name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates targets in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessSnapshot)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// One refresh: an immutable pair of the view and the log contents.
#[derive(Debug, Clone, Default)]
pub struct RenderFrame {
    /// Refresh counter, starting at 1 for the first published frame.
    pub generation: u64,
    /// When the refresh was triggered.
    pub rendered_at: DateTime<Utc>,
    /// Status view at refresh time.
    pub view: StatusView,
    /// Log entries, oldest first.
    pub logs: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Process;

    fn snapshot(target: &str, ids: &[u64]) -> ProcessSnapshot {
        let processes = ids
            .iter()
            .map(|&id| Process {
                id,
                user: "app".into(),
                host: "10.0.0.9:5123".into(),
                db: Some("shop".into()),
                command: "Query".into(),
                time: 0,
                state: Some("executing".into()),
                info: Some("SELECT 1".into()),
            })
            .collect();
        ProcessSnapshot::new(target, processes)
    }

    #[test]
    fn test_upsert_reports_first_sighting() {
        let mut view = StatusView::new();
        assert!(view.upsert(snapshot("a", &[1])));
        assert!(!view.upsert(snapshot("a", &[1, 2])));
        assert_eq!(view.len(), 1);
        assert_eq!(view.get("a").unwrap().processes.len(), 2);
    }

    #[test]
    fn test_identical_upsert_is_idempotent() {
        let mut view = StatusView::new();
        view.upsert(snapshot("a", &[1, 2]));
        let before = view.clone();
        view.upsert(snapshot("a", &[1, 2]));
        assert_eq!(view, before);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_iter_is_name_ordered() {
        let mut view = StatusView::new();
        view.upsert(snapshot("zeta", &[]));
        view.upsert(snapshot("alpha", &[]));
        let names: Vec<_> = view.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
