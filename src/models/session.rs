use serde::{Deserialize, Serialize};

/// One finalized timed interval attributed to a single category.
///
/// The serialized shape is the remote endpoint's wire format:
/// `{"category": ..., "duration": <ms>, "day": "YYYY-MM-DD", "target": <hours>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub category: String,
    /// Wall-clock duration of the contiguous run, in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Logical tracking day, which may differ from the wall-clock day when
    /// the user pins a day.
    pub day: String,
    /// Planned hours for the category on that day, captured at record
    /// creation. Later plan edits do not touch stored records.
    #[serde(rename = "target")]
    pub target_hours: f64,
}

/// An outbox row: the record plus the store-assigned id that fixes its
/// position in replay order.
///
/// Records carry no intrinsic identity; two identical records enqueued
/// separately are distinct entries.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub record: SessionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_to_wire_format() {
        let record = SessionRecord {
            category: "Project".into(),
            duration_ms: 5000,
            day: "2025-10-14".into(),
            target_hours: 2.5,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["category"], "Project");
        assert_eq!(value["duration"], 5000);
        assert_eq!(value["day"], "2025-10-14");
        assert_eq!(value["target"], 2.5);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let json = r#"{"category":"Call","duration":61000,"day":"2025-10-15","target":0.0}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.duration_ms, 61000);
        assert_eq!(record.target_hours, 0.0);
    }
}
