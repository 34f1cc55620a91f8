//! Scores how well a set of detected peaks fits a predicted reflection list.
//!
//! One implementation serves both the single-group detail view and the
//! all-group ranking, so the two can never disagree.

use super::prediction::{
    PredictionRecord,
    predict,
};
use crate::errors::Result;
use crate::models::SpaceGroup;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use tracing::{
    debug,
    instrument,
};

/// Matching tolerance as a fraction of the curve's q-range.
pub const MATCH_TOLERANCE: f64 = 0.005;

const ERROR_DECAY: f64 = 50.0;
const REFERENCE_ONLY_PENALTY: f64 = 0.5;
const MIN_PURITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Excellent,
    Good,
    Fair,
    Poor,
    Rejected,
}

impl Interpretation {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Interpretation::Excellent
        } else if score > 0.6 {
            Interpretation::Good
        } else if score > 0.4 {
            Interpretation::Fair
        } else if score > 0.2 {
            Interpretation::Poor
        } else {
            Interpretation::Rejected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpretation::Excellent => "excellent",
            Interpretation::Good => "good",
            Interpretation::Fair => "fair",
            Interpretation::Poor => "poor",
            Interpretation::Rejected => "rejected",
        }
    }
}

impl Display for Interpretation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicted reflection paired with the detected peak that explains it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakMatch {
    pub k: usize,
    pub predicted_q: f64,
    /// Detected position. Only the reference can match without one: it
    /// always counts, but stays `None` when no detected peak sits near it.
    pub matched_q: Option<f64>,
    pub deviation: f64,
    pub relative_error: f64,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRecord {
    pub space_group: SpaceGroup,
    pub reference_q: f64,
    pub score: f64,
    pub interpretation: Interpretation,
    pub matches: Vec<PeakMatch>,
    pub match_ratio: f64,
    /// Mean relative error over the non-reference matches.
    pub avg_relative_error: Option<f64>,
    pub matched_count: usize,
    pub total_predicted: usize,
    pub total_valid_predicted: usize,
    pub total_detected: usize,
    pub unmatched_detected: usize,
}

fn nearest_unused(detected: &[f64], used: &[bool], q: f64, tolerance: f64) -> Option<usize> {
    detected
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(i, d)| (i, (d - q).abs()))
        .filter(|(_, dev)| *dev <= tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Greedy first-fit matching in prediction order over the in-range
/// predictions.
pub fn match_peaks(prediction: &PredictionRecord, detected: &[f64], tolerance: f64) -> Vec<PeakMatch> {
    let mut used = vec![false; detected.len()];
    let mut matches = Vec::new();
    for p in prediction.in_range() {
        let hit = nearest_unused(detected, &used, p.q_predicted, tolerance);
        if let Some(i) = hit {
            used[i] = true;
        }
        if p.is_reference {
            matches.push(PeakMatch {
                k: p.k,
                predicted_q: p.q_predicted,
                matched_q: hit.map(|i| detected[i]),
                deviation: 0.0,
                relative_error: 0.0,
                is_reference: true,
            });
        } else if let Some(i) = hit {
            let deviation = (detected[i] - p.q_predicted).abs();
            matches.push(PeakMatch {
                k: p.k,
                predicted_q: p.q_predicted,
                matched_q: Some(detected[i]),
                deviation,
                relative_error: deviation / p.q_predicted,
                is_reference: false,
            });
        }
    }
    matches
}

/// Scores `detected` against `prediction` with a matching tolerance of
/// `tolerance_fraction` times the prediction's q-range.
pub fn evaluate(
    prediction: &PredictionRecord,
    detected: &[f64],
    tolerance_fraction: f64,
) -> ConfidenceRecord {
    let tolerance = tolerance_fraction * prediction.q_range();
    let valid = prediction.in_range().count();
    let matches = if detected.is_empty() {
        Vec::new()
    } else {
        match_peaks(prediction, detected, tolerance)
    };

    let m = matches.len();
    let non_reference: Vec<&PeakMatch> = matches.iter().filter(|m| !m.is_reference).collect();
    let avg_relative_error = if non_reference.is_empty() {
        None
    } else {
        Some(
            non_reference.iter().map(|m| m.relative_error).sum::<f64>()
                / non_reference.len() as f64,
        )
    };
    let match_ratio = if valid == 0 { 0.0 } else { m as f64 / valid as f64 };
    let unmatched = detected.len().saturating_sub(m);

    let score = if detected.is_empty() || valid == 0 {
        0.0
    } else {
        let match_penalty = match_ratio * match_ratio;
        let error_penalty = match avg_relative_error {
            Some(e) => (-ERROR_DECAY * e).exp(),
            None if valid == 1 => 1.0,
            None => REFERENCE_ONLY_PENALTY,
        };
        let spread = unmatched as f64 / detected.len() as f64;
        let purity = if valid <= detected.len() {
            1.0 - 0.1 * spread
        } else {
            1.0 - 0.2 * spread
        }
        .max(MIN_PURITY);

        let base = (match_penalty * error_penalty * purity).min(1.0);
        let bonus = match avg_relative_error {
            Some(e) if e < 0.01 => 1.2,
            Some(e) if e < 0.02 => 1.1,
            _ => 1.0,
        };
        (base * bonus).min(1.0)
    };

    debug!(
        "{}: {}/{} matched, score {:.4}",
        prediction.space_group, m, valid, score
    );
    ConfidenceRecord {
        space_group: prediction.space_group,
        reference_q: prediction.reference_q,
        score,
        interpretation: Interpretation::from_score(score),
        matches,
        match_ratio,
        avg_relative_error,
        matched_count: m,
        total_predicted: prediction.count,
        total_valid_predicted: valid,
        total_detected: detected.len(),
        unmatched_detected: unmatched,
    }
}

/// Scores every space group against the same reference, best first.
///
/// Ties keep the listing order of [`SpaceGroup::ALL`].
#[instrument(skip(detected), fields(detected = detected.len()))]
pub fn score_all(
    detected: &[f64],
    q1: f64,
    count: usize,
    q_min: f64,
    q_max: f64,
    tolerance_fraction: f64,
) -> Result<Vec<ConfidenceRecord>> {
    let mut records = SpaceGroup::ALL
        .iter()
        .map(|&g| {
            let prediction = predict(q1, g, count, q_min, q_max)?;
            Ok(evaluate(&prediction, detected, tolerance_fraction))
        })
        .collect::<Result<Vec<_>>>()?;
    // Stable sort keeps listing order among equal scores.
    records.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(records)
}
