//! # Session Comparison Module
//!
//! Aligns two sessions by `(frequency, ear)` and reports the gain change
//! for every key both sessions measured. Keys measured by only one session
//! are left out of the result.

use std::collections::BTreeSet;
use tracing::warn;

use crate::session::{Ear, Session};

/// One aligned key of a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub frequency: u32,
    pub ear: Ear,
    /// Gain recorded by the first session
    pub gain_a: f32,
    /// Gain recorded by the second session
    pub gain_b: f32,
    /// `gain_b - gain_a`; positive means a louder tone was needed
    pub delta: f32,
}

/// Result of [`compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Rows ordered by frequency, then ear
    pub rows: Vec<ComparisonRow>,
    /// False when the sessions were taken with different headphones
    pub headphones_match: bool,
}

impl Comparison {
    /// Whether the rows can be trusted as a like-for-like comparison.
    pub fn is_reliable(&self) -> bool {
        self.headphones_match
    }
}

/// Compares two sessions measurement by measurement.
///
/// Mismatched headphone labels do not block the comparison; the result is
/// flagged through [`Comparison::headphones_match`] instead.
pub fn compare(session_a: &Session, session_b: &Session) -> Comparison {
    let headphones_match = session_a.headphone_label == session_b.headphone_label;
    if !headphones_match {
        warn!(
            "[COMPARE] Sessions {} ({}) and {} ({}) used different headphones; comparison may be unreliable",
            session_a.id, session_a.headphone_label, session_b.id, session_b.headphone_label
        );
    }

    let keys: BTreeSet<(u32, Ear)> = session_a
        .measurements
        .iter()
        .chain(session_b.measurements.iter())
        .map(|m| m.key())
        .collect();

    let rows = keys
        .into_iter()
        .filter_map(|(frequency, ear)| {
            let gain_a = session_a.gain_for(frequency, ear)?;
            let gain_b = session_b.gain_for(frequency, ear)?;
            Some(ComparisonRow {
                frequency,
                ear,
                gain_a,
                gain_b,
                delta: gain_b - gain_a,
            })
        })
        .collect();

    Comparison {
        rows,
        headphones_match,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Measurement, TestType};

    fn session_with(label: &str, measurements: &[(u32, Ear, f32)]) -> Session {
        measurements
            .iter()
            .fold(Session::create(label, TestType::Standard), |s, &(f, e, g)| {
                s.upsert(Measurement::new(f, e, g))
            })
    }

    #[test]
    fn shared_key_produces_delta() {
        let a = session_with("HD 600", &[(1000, Ear::Left, 40.0)]);
        let b = session_with("HD 600", &[(1000, Ear::Left, 55.0)]);
        let comparison = compare(&a, &b);

        assert!(comparison.is_reliable());
        assert_eq!(
            comparison.rows,
            vec![ComparisonRow {
                frequency: 1000,
                ear: Ear::Left,
                gain_a: 40.0,
                gain_b: 55.0,
                delta: 15.0,
            }]
        );
    }

    #[test]
    fn one_sided_keys_are_omitted() {
        let a = session_with(
            "HD 600",
            &[(1000, Ear::Left, 40.0), (2000, Ear::Left, 30.0)],
        );
        let b = session_with(
            "HD 600",
            &[(1000, Ear::Left, 35.0), (1000, Ear::Right, 50.0)],
        );
        let comparison = compare(&a, &b);

        assert_eq!(comparison.rows.len(), 1);
        assert_eq!(comparison.rows[0].delta, -5.0);
    }

    #[test]
    fn mismatched_headphones_still_compare() {
        let a = session_with("HD 600", &[(500, Ear::Right, 20.0), (250, Ear::Left, 10.0)]);
        let b = session_with("AirPods", &[(500, Ear::Right, 25.0), (250, Ear::Left, 10.0)]);
        let comparison = compare(&a, &b);

        assert!(!comparison.is_reliable());
        assert_eq!(comparison.rows.len(), 2);
        // Rows come back ordered by frequency.
        assert_eq!(comparison.rows[0].frequency, 250);
        assert_eq!(comparison.rows[0].delta, 0.0);
        assert_eq!(comparison.rows[1].delta, 5.0);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let a = session_with("HD 600", &[(4000, Ear::Left, 60.0)]);
        let b = session_with("HD 600", &[(8000, Ear::Left, 60.0)]);
        let (a_before, b_before) = (a.clone(), b.clone());
        let comparison = compare(&a, &b);

        assert!(comparison.rows.is_empty());
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }
}
