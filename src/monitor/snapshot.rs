//! Status snapshot of one monitor cycle and the store that hands the latest
//! snapshot from the engine to concurrent status readers.

use chrono::Local;
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use std::sync::RwLock;
use std::time::Duration;

/// Timestamp format used in the `date` field
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one monitor cycle, immutable once assembled
///
/// Serializes as `{"flows": {...}, "success": bool, "error": str,
/// "duration": num, "date": str}` with flows in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    flows: Vec<(String, bool)>,
    error: String,
    duration: f64,
    date: String,
}

impl StatusSnapshot {
    /// Empty snapshot stamped with the current local time
    pub fn begin() -> Self {
        Self {
            date: Local::now().format(DATE_FORMAT).to_string(),
            ..Default::default()
        }
    }

    /// Record the outcome of one flow step; push order is execution order
    pub fn record(&mut self, name: &str, passed: bool, error: &str, duration: Duration) {
        self.flows.push((name.to_string(), passed));
        if !error.is_empty() {
            self.error
                .push_str(&format!("{}: {}; ", name.to_uppercase(), error));
        }
        self.duration = round2(self.duration + duration.as_secs_f64());
    }

    /// True iff at least one flow ran and none failed
    pub fn success(&self) -> bool {
        !self.flows.is_empty() && self.flows.iter().all(|(_, passed)| *passed)
    }

    pub fn flows(&self) -> &[(String, bool)] {
        &self.flows
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn date(&self) -> &str {
        &self.date
    }
}

impl Serialize for StatusSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StatusSnapshot", 5)?;
        state.serialize_field("flows", &FlowMap(&self.flows))?;
        state.serialize_field("success", &self.success())?;
        state.serialize_field("error", &self.error)?;
        state.serialize_field("duration", &self.duration)?;
        state.serialize_field("date", &self.date)?;
        state.end()
    }
}

/// Serializes flow results as a JSON object in execution order
struct FlowMap<'a>(&'a [(String, bool)]);

impl Serialize for FlowMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, passed) in self.0 {
            map.serialize_entry(name, passed)?;
        }
        map.end()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Latest published snapshot; single writer, many concurrent readers
///
/// The engine builds a full snapshot before publishing, so readers never see
/// a partially assembled value.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    latest: RwLock<StatusSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot wholesale
    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.latest.write().expect("snapshot lock poisoned") = snapshot;
    }

    /// Latest fully published snapshot, or the empty default before the
    /// first cycle completes
    pub fn read(&self) -> StatusSnapshot {
        self.latest.read().expect("snapshot lock poisoned").clone()
    }
}
