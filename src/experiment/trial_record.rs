//! Trial Record - one measured configuration from one engine invocation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the measured duration (milliseconds).
pub const TIME_KEY: &str = "time";

/// Trial Record represents one measured configuration.
///
/// The engine emits a flat object: tunable parameter values, the measured
/// `time`, and whatever metadata it attaches (per-iteration `times`, etc.).
/// The record keeps every field, so it round-trips by value. Keys are
/// written back in sorted order, not in the engine's order.
///
/// ## Comparability
///
/// Only records whose `time` is a finite, non-negative number take part in
/// best-of selection. Anything else is carried along but never ranked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialRecord {
    fields: Map<String, Value>,
}

impl TrialRecord {
    /// Wrap an engine-supplied object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Create a builder for assembling a record field by field.
    #[must_use]
    pub fn builder() -> TrialRecordBuilder {
        TrialRecordBuilder::default()
    }

    /// Measured duration in milliseconds, if present and valid.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.fields
            .get(TIME_KEY)
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0)
    }

    /// Whether this record may be ranked against others.
    #[must_use]
    pub fn is_comparable(&self) -> bool {
        self.time().is_some()
    }

    /// Look up a single field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields, in key order.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Scalar fields other than `time`, i.e. the configuration itself.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter(|(k, v)| k.as_str() != TIME_KEY && !v.is_array() && !v.is_object())
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Render the configuration as `name=value` pairs joined by `", "`.
    #[must_use]
    pub fn config_string(&self) -> String {
        self.parameters()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<Map<String, Value>> for TrialRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

/// Pick the record with the smallest valid `time`.
///
/// Records without a valid time are ignored. Ties go to the earliest record.
#[must_use]
pub fn best_of(records: &[TrialRecord]) -> Option<&TrialRecord> {
    records
        .iter()
        .filter_map(|r| r.time().map(|t| (t, r)))
        .fold(None, |best: Option<(f64, &TrialRecord)>, (t, r)| match best {
            Some((bt, _)) if bt <= t => best,
            _ => Some((t, r)),
        })
        .map(|(_, r)| r)
}

/// Builder for `TrialRecord`.
#[derive(Debug, Default)]
pub struct TrialRecordBuilder {
    fields: Map<String, Value>,
}

impl TrialRecordBuilder {
    /// Set a parameter or metadata field.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the measured time in milliseconds.
    #[must_use]
    pub fn time(mut self, millis: f64) -> Self {
        self.fields.insert(TIME_KEY.to_string(), Value::from(millis));
        self
    }

    /// Build the `TrialRecord`.
    #[must_use]
    pub fn build(self) -> TrialRecord {
        TrialRecord {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bx: i64, time: f64) -> TrialRecord {
        TrialRecord::builder()
            .param("block_size_x", bx)
            .time(time)
            .build()
    }

    #[test]
    fn test_time_validation() {
        assert_eq!(record(16, 2.5).time(), Some(2.5));
        assert_eq!(record(16, -1.0).time(), None);
        // NaN cannot be represented in JSON and becomes null
        assert_eq!(record(16, f64::NAN).time(), None);

        let missing = TrialRecord::builder().param("block_size_x", 16).build();
        assert!(!missing.is_comparable());

        let text = TrialRecord::builder().param("time", "fast").build();
        assert!(!text.is_comparable());
    }

    #[test]
    fn test_best_of_skips_incomparable() {
        let records = vec![
            TrialRecord::builder().param("block_size_x", 1).build(),
            record(32, 3.0),
            record(64, 1.5),
            record(128, 1.5),
        ];

        let best = best_of(&records).unwrap();
        assert_eq!(best.get("block_size_x"), Some(&Value::from(64)));
    }

    #[test]
    fn test_best_of_empty() {
        assert!(best_of(&[]).is_none());
        assert!(best_of(&[TrialRecord::default()]).is_none());
    }

    #[test]
    fn test_config_string_excludes_time_and_metadata() {
        let r = TrialRecord::builder()
            .param("block_size_x", 128)
            .param("read_only", 1)
            .param("method", "shared")
            .param("times", vec![1.0, 2.0])
            .time(2.55)
            .build();

        assert_eq!(r.config_string(), "block_size_x=128, method=shared, read_only=1");
    }

    #[test]
    fn test_keys_are_written_sorted() {
        let json = r#"{"time":1.0,"tile_size_x":2,"block_size_x":16}"#;
        let r: TrialRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"block_size_x":16,"tile_size_x":2,"time":1.0}"#
        );
    }

    #[test]
    fn test_round_trip_is_flat() {
        let json = r#"{"block_size_x":16,"time":1.25,"times":[1.2,1.3]}"#;
        let r: TrialRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.time(), Some(1.25));
        assert_eq!(serde_json::to_string(&r).unwrap(), json);
    }
}
