//! Bookkeeping for detected, manual and selected peaks.
//!
//! All tolerances are fractions of the q-range of the curve the peaks were
//! found on. Peaks are plain q-values.

use crate::errors::{
    Result,
    SaxsError,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

/// Peaks closer than this fraction of the q-range are the same peak.
pub const DUPLICATE_TOLERANCE: f64 = 0.01;
/// Reach of a pointer click, as a fraction of the q-range.
pub const CLICK_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    q_range: f64,
    duplicate_tolerance: f64,
    click_tolerance: f64,
    auto: Vec<f64>,
    manual: Vec<f64>,
    /// `None` means every auto peak takes part in the analysis.
    selection: Option<Vec<f64>>,
}

fn sort_floats(v: &mut [f64]) {
    v.sort_by(|a, b| a.total_cmp(b));
}

/// Index of the value in `values` nearest to `q`, if within `tol`.
fn nearest_within(values: &[f64], q: f64, tol: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i, (v - q).abs()))
        .filter(|(_, d)| *d <= tol)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

impl PeakSet {
    /// Empty set for a curve spanning `q_range`.
    pub fn new(q_range: f64) -> Self {
        Self::with_tolerances(q_range, DUPLICATE_TOLERANCE, CLICK_TOLERANCE)
    }

    pub fn with_tolerances(q_range: f64, duplicate_fraction: f64, click_fraction: f64) -> Self {
        Self {
            q_range,
            duplicate_tolerance: duplicate_fraction * q_range,
            click_tolerance: click_fraction * q_range,
            auto: Vec::new(),
            manual: Vec::new(),
            selection: None,
        }
    }

    pub fn q_range(&self) -> f64 {
        self.q_range
    }

    pub fn auto(&self) -> &[f64] {
        &self.auto
    }

    pub fn manual(&self) -> &[f64] {
        &self.manual
    }

    pub fn selection(&self) -> Option<&[f64]> {
        self.selection.as_deref()
    }

    pub fn is_selecting(&self) -> bool {
        self.selection.is_some()
    }

    fn is_duplicate(&self, q: f64) -> bool {
        nearest_within(&self.auto, q, self.duplicate_tolerance).is_some()
            || nearest_within(&self.manual, q, self.duplicate_tolerance).is_some()
    }

    /// Replaces the auto peaks with a fresh detection result.
    ///
    /// The selection is switched off, and manual peaks that now coincide with
    /// a detected peak are dropped.
    pub fn set_auto(&mut self, peaks: Vec<f64>) {
        let mut peaks = peaks;
        sort_floats(&mut peaks);
        self.auto = peaks;
        self.selection = None;
        let tol = self.duplicate_tolerance;
        let before = self.manual.len();
        let auto = &self.auto;
        self.manual
            .retain(|m| nearest_within(auto, *m, tol).is_none());
        if self.manual.len() != before {
            debug!(
                "Dropped {} manual peaks now covered by detection",
                before - self.manual.len()
            );
        }
    }

    /// Adds a manual peak. Returns `false` if it duplicates an existing one.
    pub fn add_manual(&mut self, q: f64) -> Result<bool> {
        if !q.is_finite() || q <= 0.0 {
            return Err(SaxsError::out_of_domain(
                "q",
                q,
                "a finite positive scattering vector",
            ));
        }
        if self.is_duplicate(q) {
            debug!("Manual peak at {:.5} duplicates an existing peak", q);
            return Ok(false);
        }
        let pos = self.manual.partition_point(|&m| m < q);
        self.manual.insert(pos, q);
        Ok(true)
    }

    /// Removes the manual peak nearest to `q` within click reach.
    pub fn remove_manual_near(&mut self, q: f64) -> Option<f64> {
        nearest_within(&self.manual, q, self.click_tolerance).map(|i| self.manual.remove(i))
    }

    pub fn clear_manual(&mut self) {
        self.manual.clear();
    }

    /// Toggles the auto peak nearest to `q` in or out of the selection.
    ///
    /// Starts selection mode (with an empty selection) when it was off.
    /// Returns the toggled peak and whether it is now selected.
    pub fn toggle_selection(&mut self, q: f64) -> Option<(f64, bool)> {
        let idx = nearest_within(&self.auto, q, self.click_tolerance)?;
        let peak = self.auto[idx];
        let selection = self.selection.get_or_insert_with(Vec::new);
        match selection.iter().position(|s| *s == peak) {
            Some(pos) => {
                selection.remove(pos);
                Some((peak, false))
            }
            None => {
                let pos = selection.partition_point(|&s| s < peak);
                selection.insert(pos, peak);
                Some((peak, true))
            }
        }
    }

    pub fn select_all(&mut self) {
        self.selection = Some(self.auto.clone());
    }

    /// Keeps selection mode on with nothing selected.
    pub fn clear_selection(&mut self) {
        self.selection = Some(Vec::new());
    }

    pub fn disable_selection(&mut self) {
        self.selection = None;
    }

    /// Folds the manual peaks into the auto peaks and clears them.
    ///
    /// Merging twice is the same as merging once.
    pub fn merge(&mut self) {
        let mut merged: Vec<f64> = Vec::with_capacity(self.auto.len() + self.manual.len());
        let mut all: Vec<f64> = self.auto.iter().chain(self.manual.iter()).copied().collect();
        sort_floats(&mut all);
        for q in all {
            if merged
                .last()
                .map_or(true, |last| (q - *last).abs() > self.duplicate_tolerance)
            {
                merged.push(q);
            }
        }
        self.auto = merged;
        self.manual.clear();
        if let Some(selection) = self.selection.as_mut() {
            let auto = &self.auto;
            selection.retain(|s| auto.contains(s));
        }
    }

    /// The peaks phase analysis runs on: the selection when active, else
    /// every auto peak.
    pub fn peaks_for_analysis(&self) -> &[f64] {
        match &self.selection {
            Some(selection) => selection,
            None => &self.auto,
        }
    }
}
