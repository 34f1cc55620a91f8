use crate::utils::stats::{
    diff,
    diff2,
    mean,
    median,
    min_max,
    variance,
};

pub const MIN_QUALITY: f64 = 0.1;
pub const MAX_QUALITY: f64 = 10.0;
const EPS: f64 = 1e-10;

/// Objective score used to rank enhancement outputs (higher is better).
///
/// The score averages three log10 terms:
/// - signal power over the variance of the first difference (noise),
/// - peak-to-median ratio,
/// - smoothness, the inverse mean absolute second difference.
///
/// The result is clamped to `[MIN_QUALITY, MAX_QUALITY]`; degenerate inputs
/// (too short, all-zero) score the minimum.
pub fn quality_score(intensity: &[f64]) -> f64 {
    if intensity.len() < 3 {
        return MIN_QUALITY;
    }
    let power = mean(&intensity.iter().map(|x| x * x).collect::<Vec<_>>());
    let noise = variance(&diff(intensity));
    let (_, max) = min_max(intensity).unwrap_or((0.0, 0.0));
    let peak_to_median = max / median(intensity);
    let roughness = mean(&diff2(intensity).iter().map(|x| x.abs()).collect::<Vec<_>>());
    let smoothness = 1.0 / (roughness + EPS);

    let score =
        ((power / (noise + EPS)).log10() + peak_to_median.log10() + smoothness.log10()) / 3.0;
    if score.is_nan() {
        return MIN_QUALITY;
    }
    score.clamp(MIN_QUALITY, MAX_QUALITY)
}
