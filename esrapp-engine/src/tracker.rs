//! Utilization tracker: bounded per-cell sample windows.
//!
//! Keeps a sliding window of recent PRB-utilization samples per cell plus a
//! fleet-level history of per-slot sums, which feeds the load predictor and
//! the minimum-depth guard. Report validation happens here: a report for a
//! non-cell entity, or one missing the utilization metric, is rejected whole
//! and mutates nothing.

use std::collections::{BTreeMap, VecDeque};

use esrapp_common::{CellId, MeasurementReport, PRB_TOT_DL};
use tracing::{debug, warn};

/// One recorded utilization sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// PRB utilization in [0, 100]
    pub value: f64,
    /// Collection timestamp in milliseconds
    pub timestamp_ms: u64,
}

/// Bounded per-cell utilization windows and the derived aggregates.
#[derive(Debug)]
pub struct UtilizationTracker {
    windows: BTreeMap<CellId, VecDeque<Sample>>,
    fleet_history: VecDeque<f64>,
    window_len: usize,
    accumulated: u64,
}

impl UtilizationTracker {
    /// Creates a tracker whose windows hold at most `window_len` samples.
    pub fn new(window_len: usize) -> Self {
        Self {
            windows: BTreeMap::new(),
            fleet_history: VecDeque::with_capacity(window_len),
            window_len,
            accumulated: 0,
        }
    }

    /// Appends one sample to a cell's window, evicting the oldest entry when
    /// the window is at capacity.
    pub fn record_sample(&mut self, cell_id: &CellId, value: f64, timestamp_ms: u64) {
        let window = self
            .windows
            .entry(cell_id.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.window_len));
        if window.len() >= self.window_len {
            window.pop_front();
        }
        window.push_back(Sample {
            value,
            timestamp_ms,
        });
        self.accumulated += 1;
    }

    /// Validates a report and records its samples.
    ///
    /// Rejection leaves every window untouched: reports for non-cell
    /// entities, reports without the expected utilization metric, and
    /// reports with no cell entries are all skipped with a log line.
    /// Returns true when the report was recorded.
    pub fn record_report(&mut self, report: &MeasurementReport) -> bool {
        if !report.is_cell_report() {
            warn!(
                "Received report is not a Cell report (entity: {})",
                report.measured_entity
            );
            return false;
        }

        let Some(index) = report.utilization_index() else {
            warn!("PM type {PRB_TOT_DL} not present in report");
            return false;
        };

        if report.cells.is_empty() {
            warn!("PM report is lacking measurements");
            return false;
        }

        // Per-slot sums across the report's cells feed the fleet history.
        let slots = report
            .cells
            .iter()
            .map(|c| c.values.len())
            .max()
            .unwrap_or(0);
        let mut slot_sums = vec![0.0f64; slots];

        for cell in &report.cells {
            for (slot, row) in cell.values.iter().enumerate() {
                let Some(value) = row.get(index).copied() else {
                    continue;
                };
                self.record_sample(&cell.cell_id, value, report.timestamp_ms);
                slot_sums[slot] += value;
            }
        }

        for sum in slot_sums {
            if self.fleet_history.len() >= self.window_len {
                self.fleet_history.pop_front();
            }
            self.fleet_history.push_back(sum);
        }

        debug!(
            "Recorded report for {} cell(s), {} sample slot(s)",
            report.cells.len(),
            slots
        );
        true
    }

    /// Returns the mean of the samples currently in a cell's window, or
    /// `None` for a cell with no samples yet.
    pub fn aggregate(&self, cell_id: &CellId) -> Option<f64> {
        let window = self.windows.get(cell_id)?;
        if window.is_empty() {
            return None;
        }
        Some(window.iter().map(|s| s.value).sum::<f64>() / window.len() as f64)
    }

    /// Returns the fleet-level history of per-slot utilization sums, oldest
    /// first.
    pub fn fleet_history(&self) -> Vec<f64> {
        self.fleet_history.iter().copied().collect()
    }

    /// Returns the total number of samples ever accumulated. The decision
    /// policy requires a minimum depth before acting.
    pub fn accumulated(&self) -> u64 {
        self.accumulated
    }

    /// Returns the number of samples currently held for a cell.
    pub fn window_len_of(&self, cell_id: &CellId) -> usize {
        self.windows.get(cell_id).map_or(0, VecDeque::len)
    }

    /// Returns the most recent sample recorded for a cell.
    pub fn latest(&self, cell_id: &CellId) -> Option<Sample> {
        self.windows.get(cell_id).and_then(|w| w.back()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::cell_report;

    #[test]
    fn test_record_sample_and_aggregate() {
        let mut tracker = UtilizationTracker::new(10);
        let cell = CellId::from("C1");

        tracker.record_sample(&cell, 10.0, 0);
        tracker.record_sample(&cell, 20.0, 60_000);

        assert_eq!(tracker.aggregate(&cell), Some(15.0));
        assert_eq!(tracker.accumulated(), 2);
        let latest = tracker.latest(&cell).expect("samples recorded");
        assert_eq!(latest.value, 20.0);
        assert_eq!(latest.timestamp_ms, 60_000);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut tracker = UtilizationTracker::new(3);
        let cell = CellId::from("C1");

        for (i, value) in [10.0, 20.0, 30.0, 40.0].iter().enumerate() {
            tracker.record_sample(&cell, *value, i as u64);
        }

        assert_eq!(tracker.window_len_of(&cell), 3);
        // 10.0 evicted; mean of 20/30/40
        assert_eq!(tracker.aggregate(&cell), Some(30.0));
    }

    #[test]
    fn test_aggregate_unknown_cell() {
        let tracker = UtilizationTracker::new(10);
        assert_eq!(tracker.aggregate(&CellId::from("missing")), None);
    }

    #[test]
    fn test_record_report_accumulates_fleet_history() {
        let mut tracker = UtilizationTracker::new(10);
        let report = cell_report(
            &[
                (CellId::from("C1"), vec![1.0, 2.0, 3.0]),
                (CellId::from("C2"), vec![6.0, 7.0, 8.0]),
            ],
            60_000,
        );

        assert!(tracker.record_report(&report));
        assert_eq!(tracker.fleet_history(), vec![7.0, 9.0, 11.0]);
        assert_eq!(tracker.accumulated(), 6);
        assert_eq!(tracker.aggregate(&CellId::from("C1")), Some(2.0));
    }

    #[test]
    fn test_non_cell_report_rejected() {
        let mut tracker = UtilizationTracker::new(10);
        let mut report = cell_report(&[(CellId::from("C1"), vec![5.0])], 60_000);
        report.measured_entity = "ManagedElement=1,GnbCuUpFunction=1".to_string();

        assert!(!tracker.record_report(&report));
        assert_eq!(tracker.accumulated(), 0);
        assert_eq!(tracker.aggregate(&CellId::from("C1")), None);
    }

    #[test]
    fn test_report_without_utilization_metric_rejected() {
        let mut tracker = UtilizationTracker::new(10);
        let mut report = cell_report(&[(CellId::from("C1"), vec![5.0])], 60_000);
        report.meas_types = vec!["RRU.PrbTotUl".to_string()];

        assert!(!tracker.record_report(&report));
        assert_eq!(tracker.accumulated(), 0);
    }

    #[test]
    fn test_rejected_report_leaves_existing_history_intact() {
        let mut tracker = UtilizationTracker::new(10);
        let good = cell_report(&[(CellId::from("C1"), vec![30.0])], 60_000);
        assert!(tracker.record_report(&good));

        let mut bad = cell_report(&[(CellId::from("C1"), vec![99.0])], 120_000);
        bad.measured_entity = "ManagedElement=1".to_string();
        assert!(!tracker.record_report(&bad));

        assert_eq!(tracker.aggregate(&CellId::from("C1")), Some(30.0));
        assert_eq!(tracker.fleet_history(), vec![30.0]);
    }

    #[test]
    fn test_empty_report_rejected() {
        let mut tracker = UtilizationTracker::new(10);
        let report = cell_report(&[], 60_000);

        assert!(!tracker.record_report(&report));
        assert_eq!(tracker.accumulated(), 0);
    }

    #[test]
    fn test_fleet_history_bounded() {
        let mut tracker = UtilizationTracker::new(4);
        for i in 0..6 {
            let report = cell_report(&[(CellId::from("C1"), vec![i as f64])], i * 60_000);
            assert!(tracker.record_report(&report));
        }

        assert_eq!(tracker.fleet_history(), vec![2.0, 3.0, 4.0, 5.0]);
    }
}
