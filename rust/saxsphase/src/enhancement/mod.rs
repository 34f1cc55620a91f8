//! Signal enhancement registry.
//!
//! Every entry is a pure `(q, I) -> (q, I')` transformation that keeps the q
//! grid and the number of samples. The registry is closed: each variant of
//! [`Enhancement`] maps to exactly one function.

mod quality;
mod transforms;

pub use quality::{
    MAX_QUALITY,
    MIN_QUALITY,
    quality_score,
};

use crate::errors::{
    Result,
    SaxsError,
};
use crate::models::Curve;
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use std::str::FromStr;
use tracing::{
    debug,
    info,
    instrument,
    warn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enhancement {
    Original,
    WaveletDenoised,
    BayesianSmoothed,
    AdaptiveFiltered,
    PeakEnhanced,
    Ensemble,
}

const ENSEMBLE_WEIGHTS: [f64; 3] = [0.40, 0.35, 0.25];

impl Enhancement {
    pub const ALL: [Enhancement; 6] = [
        Enhancement::Original,
        Enhancement::WaveletDenoised,
        Enhancement::BayesianSmoothed,
        Enhancement::AdaptiveFiltered,
        Enhancement::PeakEnhanced,
        Enhancement::Ensemble,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Enhancement::Original => "Original",
            Enhancement::WaveletDenoised => "Wavelet Denoised",
            Enhancement::BayesianSmoothed => "Bayesian Smoothed",
            Enhancement::AdaptiveFiltered => "Adaptive Filtered",
            Enhancement::PeakEnhanced => "Peak Enhanced",
            Enhancement::Ensemble => "Ensemble",
        }
    }

    /// Applies the transformation to a bare intensity trace.
    ///
    /// Fails with `TRANSFORM_FAILED` if the output is not a finite trace of
    /// the input's length.
    pub fn apply(&self, intensity: &[f64]) -> Result<Vec<f64>> {
        let out = match self {
            Enhancement::Original => intensity.to_vec(),
            Enhancement::WaveletDenoised => transforms::wavelet_denoise(intensity),
            Enhancement::BayesianSmoothed => transforms::bayesian_smooth(intensity),
            Enhancement::AdaptiveFiltered => transforms::adaptive_filter(intensity),
            Enhancement::PeakEnhanced => transforms::peak_enhance(intensity),
            Enhancement::Ensemble => return self.ensemble(intensity),
        };
        self.check_output(intensity.len(), out)
    }

    fn check_output(&self, expected_len: usize, out: Vec<f64>) -> Result<Vec<f64>> {
        if out.len() != expected_len {
            return Err(SaxsError::TransformFailed {
                enhancement: *self,
                context: format!("returned {} samples, expected {}", out.len(), expected_len),
            });
        }
        if let Some(i) = out.iter().position(|x| !x.is_finite()) {
            return Err(SaxsError::TransformFailed {
                enhancement: *self,
                context: format!("produced a non-finite value at index {}", i),
            });
        }
        Ok(out)
    }

    fn ensemble(&self, intensity: &[f64]) -> Result<Vec<f64>> {
        let parts = [
            Enhancement::WaveletDenoised,
            Enhancement::BayesianSmoothed,
            Enhancement::AdaptiveFiltered,
        ]
        .map(|e| e.apply(intensity));
        self.mix(intensity, parts)
    }

    /// Weighted sum of the wavelet, Bayesian and adaptive outputs, or the
    /// Bayesian output alone when any of them failed.
    fn mix(&self, intensity: &[f64], parts: [Result<Vec<f64>>; 3]) -> Result<Vec<f64>> {
        match parts {
            [Ok(w), Ok(b), Ok(a)] => {
                let mixed = (0..intensity.len())
                    .map(|i| {
                        ENSEMBLE_WEIGHTS[0] * w[i]
                            + ENSEMBLE_WEIGHTS[1] * b[i]
                            + ENSEMBLE_WEIGHTS[2] * a[i]
                    })
                    .collect();
                self.check_output(intensity.len(), mixed)
            }
            parts => {
                for err in parts.iter().filter_map(|p| p.as_ref().err()) {
                    warn!("Ensemble component failed ({}), falling back to Bayesian", err);
                }
                Enhancement::BayesianSmoothed.apply(intensity)
            }
        }
    }

    /// Applies the transformation to a curve, keeping its q grid.
    pub fn apply_to_curve(&self, curve: &Curve) -> Result<Curve> {
        let out = self.apply(curve.intensity())?;
        curve
            .with_intensity(out)
            .map_err(|e| SaxsError::TransformFailed {
                enhancement: *self,
                context: e.to_string(),
            })
    }
}

impl Display for Enhancement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Enhancement {
    type Err = SaxsError;

    /// Accepts the display name or any spacing/case variant of it
    /// ("Wavelet Denoised", "wavelet-denoised", "wavelet_denoised"), plus the
    /// first word alone ("wavelet", "bayesian", ...).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Enhancement::ALL
            .into_iter()
            .find(|e| {
                let full: String = e
                    .name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                let first = e.name().split(' ').next().unwrap_or_default().to_ascii_lowercase();
                key == full || key == first
            })
            .ok_or_else(|| {
                SaxsError::out_of_domain(
                    "enhancement",
                    s,
                    "one of original, wavelet, bayesian, adaptive, peak, ensemble",
                )
            })
    }
}

/// Outcome of one registry entry in a comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancementReport {
    pub enhancement: Enhancement,
    pub score: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnhancementComparison {
    pub reports: Vec<EnhancementReport>,
    /// Highest-scoring successful entry; ties resolve to registry order.
    pub best: Option<Enhancement>,
}

impl EnhancementComparison {
    pub fn score_of(&self, enhancement: Enhancement) -> Option<f64> {
        self.reports
            .iter()
            .find(|r| r.enhancement == enhancement)
            .and_then(|r| r.score)
    }
}

/// Runs every registry entry on `curve` and scores the outputs.
///
/// A failing entry is reported against its own name and does not stop the
/// comparison.
#[instrument(skip_all, fields(n = curve.len()))]
pub fn compare_all(curve: &Curve) -> EnhancementComparison {
    compare_with(curve, |e, c| e.apply_to_curve(c))
}

fn compare_with<F>(curve: &Curve, run: F) -> EnhancementComparison
where
    F: Fn(Enhancement, &Curve) -> Result<Curve> + Sync,
{
    let reports: Vec<EnhancementReport> = Enhancement::ALL
        .par_iter()
        .map(|&e| match run(e, curve) {
            Ok(out) => EnhancementReport {
                enhancement: e,
                score: Some(quality_score(out.intensity())),
                error: None,
            },
            Err(err) => {
                warn!("Enhancement '{}' failed: {}", e, err);
                EnhancementReport {
                    enhancement: e,
                    score: None,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect();

    let mut best: Option<(Enhancement, f64)> = None;
    for report in reports.iter() {
        if let Some(score) = report.score {
            debug!("{}: quality {:.4}", report.enhancement, score);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((report.enhancement, score));
            }
        }
    }
    if let Some((e, s)) = best {
        info!("Best enhancement: {} (quality {:.4})", e, s);
    }
    EnhancementComparison {
        reports,
        best: best.map(|(e, _)| e),
    }
}
