//! Which history sessions are picked for the chart and the comparison.

use crate::compare::{self, Comparison};
use crate::session::Session;

/// At most this many sessions are selected at once.
pub const MAX_SELECTED: usize = 2;

/// Ordered selection of up to [`MAX_SELECTED`] session ids.
///
/// Selecting a third session drops the one selected longest ago.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSelection {
    ids: Vec<String>,
}

impl SessionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection holding just `id`.
    pub fn single(id: impl Into<String>) -> Self {
        Self {
            ids: vec![id.into()],
        }
    }

    /// Selects `id`, or deselects it if it already is selected.
    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
            return;
        }
        if self.ids.len() >= MAX_SELECTED {
            self.ids.remove(0);
        }
        self.ids.push(id.to_string());
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// 1-based slot of `id`, as shown on the history list.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|s| s == id).map(|p| p + 1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Compares the two selected sessions, first selected as "A".
    ///
    /// `None` unless exactly two selected ids resolve in `sessions`.
    pub fn comparison(&self, sessions: &[Session]) -> Option<Comparison> {
        let [a, b] = self.ids.as_slice() else {
            return None;
        };
        let find = |id: &String| sessions.iter().find(|s| &s.id == id);
        Some(compare::compare(find(a)?, find(b)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Ear, Measurement, TestType};

    #[test]
    fn third_selection_replaces_oldest() {
        let mut selection = SessionSelection::new();
        selection.toggle("a");
        selection.toggle("b");
        selection.toggle("c");
        assert_eq!(selection.ids(), ["b".to_string(), "c".to_string()]);
        assert_eq!(selection.position("c"), Some(2));
        assert!(!selection.contains("a"));
    }

    #[test]
    fn toggling_twice_deselects() {
        let mut selection = SessionSelection::single("a");
        selection.toggle("b");
        selection.toggle("a");
        assert_eq!(selection.ids(), ["b".to_string()]);
    }

    #[test]
    fn comparison_needs_two_known_sessions() {
        let a = Session::create("HD 600", TestType::Standard)
            .upsert(Measurement::new(1000, Ear::Left, 40.0));
        let b = Session::create("HD 600", TestType::Standard)
            .upsert(Measurement::new(1000, Ear::Left, 55.0));
        let sessions = vec![a.clone(), b.clone()];

        let mut selection = SessionSelection::single(a.id.clone());
        assert!(selection.comparison(&sessions).is_none());

        selection.toggle(&b.id);
        let comparison = selection.comparison(&sessions).unwrap();
        assert_eq!(comparison.rows[0].delta, 15.0);

        selection.toggle("session-0-gone");
        assert!(selection.comparison(&sessions).is_none());
    }
}
