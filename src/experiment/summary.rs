//! Summary Database - append-only aggregate of completed repetitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::TrialRecord;

/// Aggregate for one strategy/method pair.
///
/// Three parallel sequences, one element per completed repetition:
///
/// ```text
/// best[i]            best TrialRecord of repetition i
/// best_times[i]      best[i].time (ms)
/// execution_time[i]  wall-clock seconds spent on repetition i
/// ```
///
/// The sequences only grow by appending and always have equal length.
/// Deserializing an entry whose sequences disagree fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct ExperimentSummaryEntry {
    best: Vec<TrialRecord>,
    best_times: Vec<f64>,
    execution_time: Vec<f64>,
}

#[derive(Deserialize)]
struct RawEntry {
    best: Vec<TrialRecord>,
    best_times: Vec<f64>,
    execution_time: Vec<f64>,
}

impl TryFrom<RawEntry> for ExperimentSummaryEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let (b, t, e) = (raw.best.len(), raw.best_times.len(), raw.execution_time.len());
        if b != t || t != e {
            return Err(format!(
                "summary entry sequences differ in length (best={b}, best_times={t}, execution_time={e})"
            ));
        }
        Ok(Self {
            best: raw.best,
            best_times: raw.best_times,
            execution_time: raw.execution_time,
        })
    }
}

impl ExperimentSummaryEntry {
    /// Create an empty entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repetitions recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.best.len()
    }

    /// True if no repetition is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// Record one completed repetition.
    ///
    /// Returns `false` and leaves the entry untouched if `best` has no valid
    /// `time`.
    #[must_use]
    pub fn push(&mut self, best: TrialRecord, execution_time: f64) -> bool {
        let Some(time) = best.time() else {
            return false;
        };
        self.best.push(best);
        self.best_times.push(time);
        self.execution_time.push(execution_time);
        true
    }

    /// Append another entry's repetitions after this entry's.
    pub fn append(&mut self, other: Self) {
        self.best.extend(other.best);
        self.best_times.extend(other.best_times);
        self.execution_time.extend(other.execution_time);
    }

    /// Best record of each repetition.
    #[must_use]
    pub fn best(&self) -> &[TrialRecord] {
        &self.best
    }

    /// Best time (ms) of each repetition.
    #[must_use]
    pub fn best_times(&self) -> &[f64] {
        &self.best_times
    }

    /// Wall-clock seconds of each repetition.
    #[must_use]
    pub fn execution_time(&self) -> &[f64] {
        &self.execution_time
    }

    /// Iterate repetitions as `(best, best_time, execution_time)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&TrialRecord, f64, f64)> {
        self.best
            .iter()
            .zip(&self.best_times)
            .zip(&self.execution_time)
            .map(|((b, t), e)| (b, *t, *e))
    }
}

/// Keys touched by a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedKeys {
    /// Keys that already existed and were extended
    pub appended: Vec<String>,
    /// Keys that were newly inserted
    pub inserted: Vec<String>,
}

impl MergedKeys {
    /// True if the merge changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appended.is_empty() && self.inserted.is_empty()
    }
}

/// Mapping from experiment name (`strategy` or `strategy_method`) to its
/// aggregate, for one algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryDatabase {
    entries: BTreeMap<String, ExperimentSummaryEntry>,
}

impl SummaryDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiment names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no experiment is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by experiment name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExperimentSummaryEntry> {
        self.entries.get(name)
    }

    /// Get or create the entry for `name`.
    pub fn entry_mut(&mut self, name: impl Into<String>) -> &mut ExperimentSummaryEntry {
        self.entries.entry(name.into()).or_default()
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExperimentSummaryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge a freshly accumulated partial summary into this one.
    ///
    /// Existing keys get the partial's sequences appended after their own;
    /// new keys are inserted. Nothing is sorted or deduplicated. Empty
    /// partial entries are ignored, so merging an empty partial is a no-op.
    pub fn merge(&mut self, partial: Self) -> MergedKeys {
        let mut keys = MergedKeys::default();
        for (name, entry) in partial.entries {
            if entry.is_empty() {
                continue;
            }
            if let Some(existing) = self.entries.get_mut(&name) {
                existing.append(entry);
                keys.appended.push(name);
            } else {
                self.entries.insert(name.clone(), entry);
                keys.inserted.push(name);
            }
        }
        keys
    }
}
