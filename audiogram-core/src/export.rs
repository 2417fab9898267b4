//! # Export Module
//!
//! JSON and CSV renderings of the session history.
//!
//! - JSON: pretty-printed array of sessions, readable back with [`from_json`]
//! - CSV: one row per measurement, flattened across all sessions

use chrono::{NaiveDate, SecondsFormat};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::session::Session;

/// Header row of the CSV export.
pub const CSV_HEADER: [&str; 6] = [
    "Session ID",
    "Timestamp",
    "Headphone",
    "Frequency",
    "Ear",
    "Gain Level",
];

/// Export file flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// Renders `sessions` in this format.
    pub fn render(self, sessions: &[Session]) -> Result<String, ExportError> {
        match self {
            ExportFormat::Json => to_json(sessions),
            ExportFormat::Csv => Ok(to_csv(sessions)),
        }
    }
}

/// Serializes sessions as a pretty JSON array.
pub fn to_json(sessions: &[Session]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(sessions)?)
}

/// Parses a JSON export back into sessions.
pub fn from_json(data: &str) -> Result<Vec<Session>, ExportError> {
    Ok(serde_json::from_str(data)?)
}

/// Flattens sessions into CSV.
///
/// Rows are joined with `\n` without a trailing newline. No sessions at
/// all renders as an empty string.
pub fn to_csv(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return String::new();
    }

    let mut lines = vec![CSV_HEADER.join(",")];
    for session in sessions {
        let timestamp = session
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        for m in &session.measurements {
            let row = [
                csv_field(&session.id),
                csv_field(&timestamp),
                csv_field(&session.headphone_label),
                m.frequency.to_string(),
                m.ear.as_str().to_string(),
                m.gain_level.to_string(),
            ];
            lines.push(row.join(","));
        }
    }
    lines.join("\n")
}

/// Quotes a field if it would otherwise break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `audiogram_sessions_<date>.<ext>`
pub fn export_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "audiogram_sessions_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Writes an export into `dir` and returns the file path.
pub fn write_export(
    dir: &Path,
    format: ExportFormat,
    sessions: &[Session],
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let contents = format.render(sessions)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(format, date));
    let mut file = File::create(&path)?;
    file.write_all(contents.as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Ear, Measurement, TestType};
    use chrono::{TimeZone, Utc};

    fn fixed_session(id: &str, label: &str) -> Session {
        Session {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            headphone_label: label.to_string(),
            test_type: TestType::Standard,
            measurements: vec![
                Measurement::new(1000, Ear::Left, 40.0),
                Measurement::new(1000, Ear::Right, 2.4),
            ],
        }
    }

    #[test]
    fn json_round_trip_is_structural() {
        let sessions = vec![
            fixed_session("session-1", "HD 600"),
            Session::create("AirPods", TestType::HighFrequency)
                .upsert(Measurement::new(7400, Ear::Right, 12.5)),
        ];
        let json = to_json(&sessions).unwrap();
        assert_eq!(from_json(&json).unwrap(), sessions);
    }

    #[test]
    fn csv_layout() {
        let csv = to_csv(&[fixed_session("session-1", "HD 600")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Session ID,Timestamp,Headphone,Frequency,Ear,Gain Level");
        assert_eq!(lines[1], "session-1,2024-03-01T09:30:00.000Z,HD 600,1000,left,40");
        assert_eq!(lines[2], "session-1,2024-03-01T09:30:00.000Z,HD 600,1000,right,2.4");
        assert_eq!(lines.len(), 3);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn csv_flattens_every_session() {
        let csv = to_csv(&[
            fixed_session("session-1", "HD 600"),
            fixed_session("session-2", "HD 600"),
        ]);
        assert_eq!(csv.lines().count(), 5);
    }

    #[test]
    fn csv_empty_history_is_empty() {
        assert_eq!(to_csv(&[]), "");
    }

    #[test]
    fn csv_quotes_awkward_labels() {
        let csv = to_csv(&[fixed_session("session-1", "Sennheiser, \"HD\" 600")]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("\"Sennheiser, \"\"HD\"\" 600\""));
    }

    #[test]
    fn file_names_carry_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            export_file_name(ExportFormat::Csv, date),
            "audiogram_sessions_2024-03-01.csv"
        );
        assert_eq!(
            export_file_name(ExportFormat::Json, date),
            "audiogram_sessions_2024-03-01.json"
        );
    }

    #[test]
    fn write_export_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let sessions = vec![fixed_session("session-1", "HD 600")];

        let path = write_export(dir.path(), ExportFormat::Json, &sessions, date).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(from_json(&written).unwrap(), sessions);
    }
}
