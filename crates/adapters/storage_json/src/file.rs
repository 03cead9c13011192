//! On-disk layout of the rule file.
//!
//! ```json
//! {
//!   "sequences": [ { "type": "production_line", "steps": "DI1->DO1(ON)" } ],
//!   "enabled_states": [true],
//!   "saved_at": "2025-01-01T00:00:00Z"
//! }
//! ```

use chrono::{NaiveDateTime, TimeZone, Utc};
use relayseq_app::ports::{RuleEntry, RuleSet};
use relayseq_domain::rule::Rule;
use relayseq_domain::time::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};

/// The whole file. Records are read as raw JSON values and converted one
/// by one, so a single unreadable record does not hide the others.
#[derive(Debug, Serialize, Deserialize)]
pub struct RuleFile<R = serde_json::Value> {
    #[serde(default = "Vec::new")]
    pub sequences: Vec<R>,
    /// Parallel to `sequences`; missing entries mean enabled.
    #[serde(default)]
    pub enabled_states: Vec<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub saved_at: Option<Timestamp>,
}

impl<'a> From<&'a RuleSet> for RuleFile<&'a Rule> {
    fn from(set: &'a RuleSet) -> Self {
        Self {
            sequences: set.entries.iter().map(|entry| &entry.rule).collect(),
            enabled_states: set.entries.iter().map(|entry| entry.enabled).collect(),
            saved_at: set.saved_at,
        }
    }
}

impl From<RuleFile> for RuleSet {
    fn from(file: RuleFile) -> Self {
        let mut enabled_states = file.enabled_states.into_iter();
        let entries = file
            .sequences
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let enabled = enabled_states.next().unwrap_or(true);
                match serde_json::from_value::<Rule>(record) {
                    Ok(rule) => Some(RuleEntry { rule, enabled }),
                    Err(err) => {
                        tracing::warn!(index, error = %err, "skipping unreadable rule record");
                        None
                    }
                }
            })
            .collect();
        Self {
            entries,
            saved_at: file.saved_at,
        }
    }
}

/// Accept RFC 3339 or a zone-less ISO date time (read as UTC). Anything
/// else reads as "never saved" rather than rejecting the whole file.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Timestamp>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive)))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn should_default_missing_enabled_states_to_true() {
        let file: RuleFile = serde_json::from_str(
            r#"{
                "sequences": [
                    {"type": "production_line", "steps": "DI1->DO1(ON)"},
                    {"type": "multi", "steps": ["DI2->DO2(ON)"]}
                ],
                "enabled_states": [false]
            }"#,
        )
        .unwrap();
        let set = RuleSet::from(file);
        let enabled: Vec<bool> = set.entries.iter().map(|entry| entry.enabled).collect();
        assert_eq!(enabled, vec![false, true]);
    }

    #[test]
    fn should_skip_unreadable_records_and_keep_flags_aligned() {
        let file: RuleFile = serde_json::from_str(
            r#"{
                "sequences": [
                    {"type": "multi", "name": "press", "steps": "DI1->DO1(ON)"},
                    {"type": "simple", "name": "gate", "logic": "Single DI", "di1": 1, "do": 9},
                    {"type": "conveyor", "name": "belt"},
                    {"type": "production_line", "name": "eject", "steps": "DI2->DO2(ON)"}
                ],
                "enabled_states": [true, true, true, false]
            }"#,
        )
        .unwrap();
        let set = RuleSet::from(file);
        let loaded: Vec<(&str, bool)> = set
            .entries
            .iter()
            .map(|entry| (entry.rule.name.as_str(), entry.enabled))
            .collect();
        assert_eq!(loaded, vec![("press", true), ("eject", false)]);
    }

    #[test]
    fn should_read_zone_less_timestamp_as_utc() {
        let file: RuleFile =
            serde_json::from_str(r#"{"saved_at": "2024-03-05T14:30:15.250000"}"#).unwrap();
        let saved_at = file.saved_at.unwrap();
        assert_eq!(saved_at.year(), 2024);
        assert_eq!(saved_at.hour(), 14);
        assert_eq!(saved_at.second(), 15);
    }

    #[test]
    fn should_read_rfc3339_timestamp() {
        let file: RuleFile =
            serde_json::from_str(r#"{"saved_at": "2024-03-05T14:30:15+02:00"}"#).unwrap();
        assert_eq!(file.saved_at.unwrap().hour(), 12);
    }

    #[test]
    fn should_ignore_unreadable_timestamp() {
        let file: RuleFile = serde_json::from_str(r#"{"saved_at": "yesterday"}"#).unwrap();
        assert!(file.saved_at.is_none());
    }

    #[test]
    fn should_load_empty_object_as_empty_set() {
        let file: RuleFile = serde_json::from_str("{}").unwrap();
        assert!(RuleSet::from(file).entries.is_empty());
    }
}
