use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column header of the snapshot history, in file order.
pub const SNAPSHOT_COLUMNS: [&str; 6] = [
    "timestamp",
    "star_count",
    "dataset_count",
    "unique_uploaders",
    "topic_robotics_count",
    "topic_lerobot_count",
];

/// One collected set of ecosystem metrics.
///
/// Field names double as CSV column names, so the order here must match
/// [`SNAPSHOT_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Capture instant, UTC, second precision.
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    /// Stars on the tracked GitHub repository.
    pub star_count: u64,
    /// Hugging Face datasets carrying the tracked tag.
    pub dataset_count: u64,
    /// Distinct owners among those datasets.
    pub unique_uploaders: u64,
    /// Repositories tagged with the primary topic.
    pub topic_robotics_count: u64,
    /// Repositories tagged with the secondary topic.
    pub topic_lerobot_count: u64,
}

impl SnapshotRecord {
    /// Column/value pairs in file order, for log output.
    pub fn summary_lines(&self) -> [(&'static str, String); 6] {
        [
            (SNAPSHOT_COLUMNS[0], timestamp_format::render(&self.timestamp)),
            (SNAPSHOT_COLUMNS[1], self.star_count.to_string()),
            (SNAPSHOT_COLUMNS[2], self.dataset_count.to_string()),
            (SNAPSHOT_COLUMNS[3], self.unique_uploaders.to_string()),
            (SNAPSHOT_COLUMNS[4], self.topic_robotics_count.to_string()),
            (SNAPSHOT_COLUMNS[5], self.topic_lerobot_count.to_string()),
        ]
    }
}

/// RFC 3339 timestamps with a `Z` suffix. Bare `YYYY-MM-DD` dates are read
/// as midnight UTC.
pub mod timestamp_format {
    use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize as _, Deserializer, Serializer};

    /// Formats a timestamp the way it is stored.
    pub fn render(timestamp: &DateTime<Utc>) -> String {
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Parses a stored timestamp.
    ///
    /// # Errors
    ///
    /// Returns a message when the text is neither RFC 3339 nor a plain date.
    pub fn parse(text: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("invalid timestamp `{text}`"))
    }

    /// Serde serializer.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&render(timestamp))
    }

    /// Serde deserializer.
    ///
    /// # Errors
    ///
    /// Returns an error when the field is not a valid timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(text.trim()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn sample() -> SnapshotRecord {
        SnapshotRecord {
            timestamp: Utc
                .with_ymd_and_hms(2026, 10, 16, 9, 30, 0)
                .single()
                .unwrap_or_else(|| panic!("valid date")),
            star_count: 12_345,
            dataset_count: 880,
            unique_uploaders: 301,
            topic_robotics_count: 9_876,
            topic_lerobot_count: 42,
        }
    }

    #[test]
    fn test_timestamp_rendering_uses_seconds_and_z() {
        assert_eq!(
            timestamp_format::render(&sample().timestamp),
            "2026-10-16T09:30:00Z"
        );
    }

    #[test]
    fn test_plain_date_parses_as_midnight() {
        let parsed = timestamp_format::parse("2025-01-06")
            .unwrap_or_else(|err| panic!("date should parse: {err}"));
        assert_eq!(timestamp_format::render(&parsed), "2025-01-06T00:00:00Z");
    }

    #[test]
    fn test_offset_timestamp_is_normalized_to_utc() {
        let parsed = timestamp_format::parse("2025-01-06T10:00:00+02:00")
            .unwrap_or_else(|err| panic!("timestamp should parse: {err}"));
        assert_eq!(timestamp_format::render(&parsed), "2025-01-06T08:00:00Z");
    }

    #[test]
    fn test_garbage_timestamp_is_rejected() {
        assert!(timestamp_format::parse("last tuesday").is_err());
    }

    #[test]
    fn test_summary_lines_follow_column_order() {
        let lines = sample().summary_lines();
        let names: Vec<&str> = lines.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, SNAPSHOT_COLUMNS);
        assert_eq!(lines[3].1, "301");
    }

    #[test]
    fn test_json_field_names_match_columns() {
        let value = serde_json::to_value(sample())
            .unwrap_or_else(|err| panic!("serialize failed: {err}"));
        for column in SNAPSHOT_COLUMNS {
            assert!(value.get(column).is_some(), "missing {column}");
        }
    }
}
