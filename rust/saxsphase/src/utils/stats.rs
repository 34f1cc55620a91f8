//! Small descriptive statistics over `f64` slices.
//!
//! All functions return `NaN` (or `None` where noted) for inputs too short to
//! define the statistic, so callers decide how to surface the degenerate case.

pub fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

/// Population variance (divides by `n`).
pub fn variance(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    let mu = mean(vals);
    vals.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / vals.len() as f64
}

pub fn std_dev(vals: &[f64]) -> f64 {
    variance(vals).sqrt()
}

/// Sample standard deviation (divides by `n - 1`).
pub fn sample_std_dev(vals: &[f64]) -> Option<f64> {
    if vals.len() < 2 {
        return None;
    }
    let mu = mean(vals);
    let ss = vals.iter().map(|x| (x - mu).powi(2)).sum::<f64>();
    Some((ss / (vals.len() - 1) as f64).sqrt())
}

fn sorted_copy(vals: &[f64]) -> Vec<f64> {
    let mut sorted = vals.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn median(vals: &[f64]) -> f64 {
    percentile(vals, 50.0)
}

/// Percentile with linear interpolation between closest ranks.
///
/// ```
/// use saxsphase::utils::stats::percentile;
///
/// let vals = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(percentile(&vals, 50.0), 2.5);
/// assert_eq!(percentile(&vals, 75.0), 3.25);
/// ```
pub fn percentile(vals: &[f64], pct: f64) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted_copy(vals);
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// First finite difference, `out[i] = x[i + 1] - x[i]`.
pub fn diff(vals: &[f64]) -> Vec<f64> {
    vals.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Second finite difference.
pub fn diff2(vals: &[f64]) -> Vec<f64> {
    vals.windows(3).map(|w| w[2] - 2.0 * w[1] + w[0]).collect()
}

/// Gradient with unit spacing: central differences inside, one-sided at the edges.
pub fn gradient(vals: &[f64]) -> Vec<f64> {
    let n = vals.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let mut out = Vec::with_capacity(n);
            out.push(vals[1] - vals[0]);
            for i in 1..n - 1 {
                out.push((vals[i + 1] - vals[i - 1]) / 2.0);
            }
            out.push(vals[n - 1] - vals[n - 2]);
            out
        }
    }
}

pub fn min_max(vals: &[f64]) -> Option<(f64, f64)> {
    if vals.is_empty() {
        return None;
    }
    Some(
        vals.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&vals), 5.0);
        assert_eq!(variance(&vals), 4.0);
        assert_eq!(std_dev(&vals), 2.0);
        let s = sample_std_dev(&vals).unwrap();
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(sample_std_dev(&[1.0]).is_none());
    }

    #[test]
    fn test_median_and_percentile() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.0), 1.0);
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 100.0), 5.0);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_differences() {
        let vals = [1.0, 4.0, 9.0, 16.0];
        assert_eq!(diff(&vals), vec![3.0, 5.0, 7.0]);
        assert_eq!(diff2(&vals), vec![2.0, 2.0]);
        assert_eq!(gradient(&vals), vec![3.0, 4.0, 6.0, 7.0]);
    }
}
