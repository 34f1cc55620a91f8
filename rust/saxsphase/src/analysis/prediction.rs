use super::confidence::PeakMatch;
use crate::errors::{
    Result,
    SaxsError,
};
use crate::models::SpaceGroup;
use serde::{
    Deserialize,
    Serialize,
};

pub const MIN_PREDICTIONS: usize = 5;
pub const MAX_PREDICTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedPeak {
    pub k: usize,
    pub ratio: f64,
    pub q_predicted: f64,
    pub miller: String,
    pub in_range: bool,
    pub matched_q: Option<f64>,
    pub deviation: Option<f64>,
    pub relative_error: Option<f64>,
    pub is_reference: bool,
}

/// Expected reflection positions for one space group and reference peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub space_group: SpaceGroup,
    pub reference_q: f64,
    pub count: usize,
    pub q_min: f64,
    pub q_max: f64,
    pub peaks: Vec<PredictedPeak>,
}

impl PredictionRecord {
    pub fn q_range(&self) -> f64 {
        self.q_max - self.q_min
    }

    pub fn in_range(&self) -> impl Iterator<Item = &PredictedPeak> {
        self.peaks.iter().filter(|p| p.in_range)
    }

    /// Copies the match results onto the predicted peaks. A reference with
    /// no detected peak near it stays unmatched here.
    pub fn with_matches(mut self, matches: &[PeakMatch]) -> Self {
        for peak in self.peaks.iter_mut() {
            peak.matched_q = None;
            peak.deviation = None;
            peak.relative_error = None;
        }
        for m in matches {
            let Some(matched_q) = m.matched_q else {
                continue;
            };
            if let Some(peak) = self.peaks.get_mut(m.k) {
                peak.matched_q = Some(matched_q);
                peak.deviation = Some(m.deviation);
                peak.relative_error = Some(m.relative_error);
            }
        }
        self
    }
}

/// Predicts the first `count` reflections of `group` from the reference `q1`.
///
/// `q_min`/`q_max` bound the observable range; predictions outside it are
/// kept but flagged.
pub fn predict(
    q1: f64,
    group: SpaceGroup,
    count: usize,
    q_min: f64,
    q_max: f64,
) -> Result<PredictionRecord> {
    if !q1.is_finite() || q1 <= 0.0 {
        return Err(SaxsError::out_of_domain(
            "reference_q",
            q1,
            "a finite positive scattering vector",
        ));
    }
    if !(MIN_PREDICTIONS..=MAX_PREDICTIONS).contains(&count) {
        return Err(SaxsError::out_of_domain(
            "count",
            count,
            "an integer between 5 and 10",
        ));
    }
    if !q_min.is_finite() || !q_max.is_finite() || q_min > q_max {
        return Err(SaxsError::input_invalid(format!(
            "invalid q window [{}, {}]",
            q_min, q_max
        )));
    }

    let mut peaks = Vec::with_capacity(count);
    for k in 0..count {
        let (Some(ratio), Some(miller)) = (group.ratio(k), group.miller(k)) else {
            return Err(SaxsError::out_of_domain(
                "count",
                count,
                "no more reflections than the space group tabulates",
            ));
        };
        let q_predicted = q1 * ratio;
        peaks.push(PredictedPeak {
            k,
            ratio,
            q_predicted,
            miller: miller.to_string(),
            in_range: q_predicted >= q_min && q_predicted <= q_max,
            matched_q: None,
            deviation: None,
            relative_error: None,
            is_reference: k == 0,
        });
    }

    Ok(PredictionRecord {
        space_group: group,
        reference_q: q1,
        count,
        q_min,
        q_max,
        peaks,
    })
}
