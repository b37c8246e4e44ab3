//! Statistics derived from a summary database
//!
//! Everything here is a pure function of persisted data: no trial is ever
//! re-run to produce a number. Empty inputs yield `None`, never NaN.

use std::fmt::Write as _;

use super::summary::{ExperimentSummaryEntry, SummaryDatabase};
use super::TrialRecord;

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    Some(values.iter().sum::<f64>() / n)
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    Some(var.sqrt())
}

/// Throughput of one run: `total_ops / (time_ms / 1e3)`.
///
/// `None` when the time is zero, negative, or not finite.
#[must_use]
pub fn throughput(total_ops: f64, time_ms: f64) -> Option<f64> {
    (time_ms.is_finite() && time_ms > 0.0).then(|| total_ops / (time_ms / 1e3))
}

/// Derived statistics for one summary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStatistics {
    /// Experiment name (`strategy` or `strategy_method`)
    pub name: String,
    /// Number of recorded repetitions
    pub repetitions: usize,
    /// Mean wall-clock seconds per repetition
    pub mean_execution_time: Option<f64>,
    /// Std-dev of wall-clock seconds per repetition
    pub std_execution_time: Option<f64>,
    /// Mean best time (ms)
    pub mean_best_time: Option<f64>,
    /// Per-repetition throughput; repetitions with a zero time are left out
    pub throughputs: Vec<f64>,
    /// Mean throughput
    pub mean_throughput: Option<f64>,
    /// Std-dev of throughput
    pub std_throughput: Option<f64>,
    /// Highest throughput observed
    pub max_throughput: Option<f64>,
    /// Configuration that reached `max_throughput`
    pub best_config: Option<TrialRecord>,
}

impl EntryStatistics {
    /// Derive statistics for `entry` given the algorithm's operation count.
    #[must_use]
    pub fn from_entry(name: &str, entry: &ExperimentSummaryEntry, total_ops: f64) -> Self {
        let rated: Vec<(f64, &TrialRecord)> = entry
            .rows()
            .filter_map(|(best, t, _)| throughput(total_ops, t).map(|p| (p, best)))
            .collect();
        let throughputs: Vec<f64> = rated.iter().map(|(p, _)| *p).collect();

        // First maximum wins, matching argmax
        let peak = rated.iter().fold(None, |acc: Option<&(f64, &TrialRecord)>, cur| match acc {
            Some(a) if a.0 >= cur.0 => acc,
            _ => Some(cur),
        });

        Self {
            name: name.to_string(),
            repetitions: entry.len(),
            mean_execution_time: mean(entry.execution_time()),
            std_execution_time: std_dev(entry.execution_time()),
            mean_best_time: mean(entry.best_times()),
            mean_throughput: mean(&throughputs),
            std_throughput: std_dev(&throughputs),
            max_throughput: peak.map(|(p, _)| *p),
            best_config: peak.map(|(_, r)| (*r).clone()),
            throughputs,
        }
    }
}

/// Statistics for every entry of one algorithm's summary database.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    /// Algorithm name
    pub algorithm: String,
    /// Work per run, in `unit`-seconds
    pub total_ops: f64,
    /// Throughput unit, e.g. `GFLOP/s`
    pub unit: String,
    /// Source database
    pub database: SummaryDatabase,
    /// Per-entry statistics, in name order
    pub entries: Vec<EntryStatistics>,
}

impl SummaryReport {
    /// Build a report from a loaded database.
    #[must_use]
    pub fn new(
        algorithm: impl Into<String>,
        total_ops: f64,
        unit: impl Into<String>,
        database: SummaryDatabase,
    ) -> Self {
        let entries = database
            .iter()
            .map(|(name, entry)| EntryStatistics::from_entry(name, entry, total_ops))
            .collect();
        Self {
            algorithm: algorithm.into(),
            total_ops,
            unit: unit.into(),
            database,
            entries,
        }
    }

    /// Per-repetition listing: every best configuration with its throughput
    /// and execution time, then the entry averages.
    #[must_use]
    pub fn render_details(&self) -> String {
        let mut out = String::new();
        for (name, entry) in self.database.iter() {
            let _ = writeln!(out, "{name}");
            for (best, time, exec) in entry.rows() {
                let perf = throughput(self.total_ops, time)
                    .map_or_else(|| "n/a".to_string(), |p| format!("{p}"));
                let _ = writeln!(
                    out,
                    "{} {perf} {} {exec} sec",
                    best.config_string(),
                    self.unit
                );
            }
            let _ = writeln!(
                out,
                "average best performance: {}",
                fmt_opt(mean(entry.best_times()))
            );
            let _ = writeln!(
                out,
                "average execution_time: {}",
                fmt_opt(mean(entry.execution_time()))
            );
        }
        out
    }

    /// Comparison table: one row per entry with mean/std of throughput and
    /// execution time, plus the peak configuration.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<32} {:>6} {:>14} {:>12} {:>12} {:>12} {:>14}",
            "method", "reps", "best", "best_err", "time", "time_err", "max"
        );
        for e in &self.entries {
            let _ = writeln!(
                out,
                "{:<32} {:>6} {:>14} {:>12} {:>12} {:>12} {:>14}",
                e.name,
                e.repetitions,
                fmt_fixed(e.mean_throughput),
                fmt_fixed(e.std_throughput),
                fmt_fixed(e.mean_execution_time),
                fmt_fixed(e.std_execution_time),
                fmt_fixed(e.max_throughput),
            );
        }
        let _ = writeln!(out, "(throughput in {}, time in seconds)", self.unit);
        for e in &self.entries {
            if let Some(config) = &e.best_config {
                let _ = writeln!(out, "{}: {}", e.name, config.config_string());
            }
        }
        out
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn fmt_fixed(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rows: &[(i64, f64, f64)]) -> ExperimentSummaryEntry {
        let mut e = ExperimentSummaryEntry::new();
        for (bx, t, exec) in rows {
            let r = TrialRecord::builder().param("block_size_x", *bx).time(*t).build();
            assert!(e.push(r, *exec));
        }
        e
    }

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
        assert!((mean(&[1.0, 2.0, 3.0]).unwrap() - 2.0).abs() < 1e-12);
        // Population std of [2, 4, 4, 4, 5, 5, 7, 9] is 2
        let s = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_throughput() {
        assert!((throughput(20.0, 2.0).unwrap() - 10_000.0).abs() < 1e-9);
        assert_eq!(throughput(20.0, 0.0), None);
    }

    #[test]
    fn test_entry_statistics() {
        let e = entry(&[(16, 4.0, 10.0), (32, 2.0, 30.0), (64, 2.0, 20.0)]);
        let stats = EntryStatistics::from_entry("pso", &e, 8.0);

        assert_eq!(stats.repetitions, 3);
        assert_eq!(stats.throughputs.len(), 3);
        for (got, want) in stats.throughputs.iter().zip([2000.0, 4000.0, 4000.0]) {
            assert!((got - want).abs() < 1e-6);
        }
        assert!((stats.max_throughput.unwrap() - 4000.0).abs() < 1e-6);
        // first of the tied maxima
        assert_eq!(
            stats.best_config.unwrap().get("block_size_x"),
            Some(&serde_json::Value::from(32))
        );
        assert!((stats.mean_execution_time.unwrap() - 20.0).abs() < 1e-12);
        assert!((stats.mean_best_time.unwrap() - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_entry_has_no_statistics() {
        let stats = EntryStatistics::from_entry("pso", &ExperimentSummaryEntry::new(), 8.0);
        assert_eq!(stats.repetitions, 0);
        assert!(stats.mean_throughput.is_none());
        assert!(stats.best_config.is_none());
    }

    #[test]
    fn test_render_details() {
        let mut db = SummaryDatabase::new();
        *db.entry_mut("brute_force") = entry(&[(128, 2.0, 5.0)]);
        let report = SummaryReport::new("gemm", 8.0, "GFLOP/s", db);

        let text = report.render_details();
        assert!(text.starts_with("brute_force\n"));
        assert!(text.contains("block_size_x=128 4000 GFLOP/s 5 sec"));
        assert!(text.contains("average best performance: 2"));
        assert!(text.contains("average execution_time: 5"));
    }

    #[test]
    fn test_render_table_lists_every_entry() {
        let mut db = SummaryDatabase::new();
        *db.entry_mut("pso") = entry(&[(16, 4.0, 10.0)]);
        *db.entry_mut("minimize_Powell") = entry(&[(32, 2.0, 30.0)]);
        let report = SummaryReport::new("gemm", 8.0, "GFLOP/s", db);

        let table = report.render_table();
        assert!(table.contains("minimize_Powell"));
        assert!(table.contains("4000.00"));
        assert!(table.contains("pso: block_size_x=16"));
    }
}
