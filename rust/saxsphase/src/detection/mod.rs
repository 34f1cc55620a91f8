//! Peak detection on a scattering curve.
//!
//! Three closed strategies share one parameter bundle:
//! - [`DetectionAlgorithm::Standard`]: local maxima filtered by height,
//!   spacing, prominence and width.
//! - [`DetectionAlgorithm::Cwt`]: ridge lines of a Ricker-wavelet transform.
//! - [`DetectionAlgorithm::Hybrid`]: the de-duplicated union of both.
//!
//! Detectors only ever return q-values; intensities are recovered from the
//! curve that produced them.

mod cwt;
mod standard;
mod suggest;

pub use suggest::{
    DetectionSuggestion,
    estimate_snr,
    suggest,
};

use crate::errors::{
    Result,
    SaxsError,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{
    debug,
    instrument,
};

/// Minimum number of local maxima (and samples) a trace needs before any
/// detector runs.
pub const MIN_LOCAL_MAXIMA: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionAlgorithm {
    Standard,
    Cwt,
    Hybrid,
}

impl DetectionAlgorithm {
    pub const ALL: [DetectionAlgorithm; 3] = [
        DetectionAlgorithm::Standard,
        DetectionAlgorithm::Cwt,
        DetectionAlgorithm::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionAlgorithm::Standard => "standard",
            DetectionAlgorithm::Cwt => "cwt",
            DetectionAlgorithm::Hybrid => "hybrid",
        }
    }
}

impl Display for DetectionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionAlgorithm {
    type Err = SaxsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "std" | "standard" => Ok(DetectionAlgorithm::Standard),
            "cwt" => Ok(DetectionAlgorithm::Cwt),
            "hybrid" => Ok(DetectionAlgorithm::Hybrid),
            _ => Err(SaxsError::out_of_domain(
                "algorithm",
                s,
                "one of std, cwt, hybrid",
            )),
        }
    }
}

/// Parameter bundle shared by every detector.
///
/// Factors are relative to the intensity range of the trace; distances and
/// widths are in samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub height_factor: f64,
    pub min_distance: usize,
    pub prominence_factor: f64,
    pub max_peaks: usize,
    pub width_min: usize,
    pub width_max: usize,
    /// Fraction of the prominence, measured down from the apex, at which
    /// widths are taken.
    pub rel_height: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            height_factor: 1e-3,
            min_distance: 1,
            prominence_factor: 1e-3,
            max_peaks: 20,
            width_min: 1,
            width_max: 100,
            rel_height: 0.5,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<()> {
        if !self.height_factor.is_finite() || self.height_factor < 0.0 {
            return Err(SaxsError::input_invalid(format!(
                "height_factor must be a finite non-negative number, got {}",
                self.height_factor
            )));
        }
        if !self.prominence_factor.is_finite() || self.prominence_factor < 0.0 {
            return Err(SaxsError::input_invalid(format!(
                "prominence_factor must be a finite non-negative number, got {}",
                self.prominence_factor
            )));
        }
        if self.min_distance == 0 {
            return Err(SaxsError::input_invalid("min_distance must be at least 1"));
        }
        if self.max_peaks == 0 {
            return Err(SaxsError::input_invalid("max_peaks must be at least 1"));
        }
        if self.width_min > self.width_max {
            return Err(SaxsError::input_invalid(format!(
                "width_min ({}) is larger than width_max ({})",
                self.width_min, self.width_max
            )));
        }
        if !(self.rel_height > 0.0 && self.rel_height < 1.0) {
            return Err(SaxsError::input_invalid(format!(
                "rel_height must lie in (0, 1), got {}",
                self.rel_height
            )));
        }
        Ok(())
    }
}

/// A detected peak before conversion to a q-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub index: usize,
    pub prominence: f64,
}

/// Keeps the `max_peaks` most prominent candidates and returns them in
/// sample order.
pub(crate) fn cap_by_prominence(mut candidates: Vec<Candidate>, max_peaks: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.prominence
            .partial_cmp(&a.prominence)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    candidates.truncate(max_peaks);
    candidates.sort_by_key(|c| c.index);
    candidates
}

/// Detects peaks and returns their q positions in increasing order.
///
/// Traces shorter than three samples, or with fewer than three local maxima,
/// yield an empty list rather than an error.
#[instrument(skip_all, fields(n = q.len(), %algorithm))]
pub fn detect_peaks(
    q: &[f64],
    intensity: &[f64],
    params: &DetectionParams,
    algorithm: DetectionAlgorithm,
) -> Result<Vec<f64>> {
    if q.len() != intensity.len() {
        return Err(SaxsError::input_invalid(format!(
            "q and intensity lengths differ ({} vs {})",
            q.len(),
            intensity.len()
        )));
    }
    if let Some(i) = q
        .iter()
        .zip(intensity.iter())
        .position(|(a, b)| !a.is_finite() || !b.is_finite())
    {
        return Err(SaxsError::input_invalid(format!(
            "sample {} is not finite",
            i
        )));
    }
    params.validate()?;

    if intensity.len() < MIN_LOCAL_MAXIMA {
        debug!("Trace too short for detection");
        return Ok(Vec::new());
    }
    let maxima = standard::local_maxima(intensity);
    if maxima.len() < MIN_LOCAL_MAXIMA {
        debug!("Only {} local maxima, nothing to detect", maxima.len());
        return Ok(Vec::new());
    }

    let candidates = match algorithm {
        DetectionAlgorithm::Standard => standard::find_peaks(intensity, &maxima, params),
        DetectionAlgorithm::Cwt => cwt::find_peaks(intensity, params),
        DetectionAlgorithm::Hybrid => {
            let mut union = standard::find_peaks(intensity, &maxima, params);
            union.extend(cwt::find_peaks(intensity, params));
            let merged = standard::filter_by_distance(union, params.min_distance, |c| c.prominence);
            cap_by_prominence(merged, params.max_peaks)
        }
    };

    let peaks: Vec<f64> = candidates.iter().map(|c| q[c.index]).collect();
    debug!("{} detector found {} peaks", algorithm, peaks.len());
    Ok(peaks)
}
