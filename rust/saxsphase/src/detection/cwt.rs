//! Multi-scale peak detection on a Ricker-wavelet transform.
//!
//! The transform is evaluated at geometrically spaced widths. Relative maxima
//! of each row are linked into ridge lines from the coarsest scale down to the
//! finest; a ridge becomes a peak when it is long enough and its finest-scale
//! response stands above the local noise floor.

use super::standard::{
    local_maxima,
    prominence,
};
use super::{
    Candidate,
    DetectionParams,
    cap_by_prominence,
};
use crate::utils::filters::convolve_reflect;
use crate::utils::stats::percentile;
use std::f64::consts::PI;

const NUM_SCALES: usize = 10;
const NOISE_PERCENTILE: f64 = 10.0;
const MIN_SNR: f64 = 1.0;

/// Ricker ("Mexican hat") wavelet of width `a` sampled on `points` samples.
pub(crate) fn ricker(points: usize, a: f64) -> Vec<f64> {
    let amp = 2.0 / ((3.0 * a).sqrt() * PI.powf(0.25));
    let centre = (points as f64 - 1.0) / 2.0;
    (0..points)
        .map(|i| {
            let t = (i as f64 - centre) / a;
            amp * (1.0 - t * t) * (-t * t / 2.0).exp()
        })
        .collect()
}

pub(crate) fn widths(width_min: usize, width_max: usize) -> Vec<f64> {
    let lo = width_min.max(1) as f64;
    let hi = width_max.max(1) as f64;
    let ratio = (hi / lo).powf(1.0 / (NUM_SCALES - 1) as f64);
    (0..NUM_SCALES).map(|i| lo * ratio.powi(i as i32)).collect()
}

/// One row per width; each row has the length of `data`.
pub(crate) fn transform(data: &[f64], widths: &[f64]) -> Vec<Vec<f64>> {
    widths
        .iter()
        .map(|&a| {
            // Odd support keeps the kernel centred on a sample.
            let points = ((10.0 * a).ceil() as usize).min(data.len()).max(3) | 1;
            convolve_reflect(data, &ricker(points, a))
        })
        .collect()
}

fn relative_maxima(row: &[f64]) -> Vec<usize> {
    (1..row.len().saturating_sub(1))
        .filter(|&i| row[i] > row[i - 1] && row[i] > row[i + 1])
        .collect()
}

#[derive(Debug, Clone)]
struct Ridge {
    /// (row, column) points from coarse to fine.
    points: Vec<(usize, usize)>,
    gap: usize,
}

impl Ridge {
    fn column(&self) -> usize {
        self.points[self.points.len() - 1].1
    }
}

/// Links relative maxima across rows, coarsest row first.
fn ridge_lines(rows: &[Vec<f64>], widths: &[f64]) -> Vec<Ridge> {
    let gap_thresh = widths[0].ceil().max(1.0) as usize;
    let mut active: Vec<Ridge> = Vec::new();
    let mut finished: Vec<Ridge> = Vec::new();

    for r in (0..rows.len()).rev() {
        let max_distance = (widths[r] / 4.0).ceil().max(1.0) as usize;
        let mut maxima = relative_maxima(&rows[r]);

        for ridge in active.iter_mut() {
            let col = ridge.column();
            let nearest = maxima
                .iter()
                .enumerate()
                .map(|(pos, &m)| (pos, m.abs_diff(col)))
                .filter(|&(_, d)| d <= max_distance)
                .min_by_key(|&(_, d)| d);
            match nearest {
                Some((pos, _)) => {
                    ridge.points.push((r, maxima.remove(pos)));
                    ridge.gap = 0;
                }
                None => ridge.gap += 1,
            }
        }

        let (alive, ended): (Vec<Ridge>, Vec<Ridge>) =
            active.into_iter().partition(|ridge| ridge.gap <= gap_thresh);
        finished.extend(ended);
        active = alive;

        active.extend(maxima.into_iter().map(|m| Ridge {
            points: vec![(r, m)],
            gap: 0,
        }));
    }
    finished.extend(active);
    finished
}

fn snr_at(finest: &[f64], col: usize, window: usize) -> f64 {
    let half = window / 2;
    let lo = col.saturating_sub(half);
    let hi = (col + half + 1).min(finest.len());
    let local: Vec<f64> = finest[lo..hi].iter().map(|x| x.abs()).collect();
    let noise = percentile(&local, NOISE_PERCENTILE);
    let signal = finest[col].abs();
    if noise > 0.0 {
        signal / noise
    } else if signal > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Moves `col` onto the highest raw sample within `reach` samples.
fn snap_to_apex(data: &[f64], col: usize, reach: usize) -> usize {
    let lo = col.saturating_sub(reach);
    let hi = (col + reach + 1).min(data.len());
    (lo..hi).fold(col, |best, i| if data[i] > data[best] { i } else { best })
}

pub(crate) fn find_peaks(data: &[f64], params: &DetectionParams) -> Vec<Candidate> {
    let n = data.len();
    let widths = widths(params.width_min, params.width_max);
    let rows = transform(data, &widths);
    let min_length = NUM_SCALES.div_ceil(4);
    let noise_window = n.div_ceil(20).max(1);
    let reach = widths[0].ceil() as usize;
    let maxima = local_maxima(data);

    let mut candidates: Vec<Candidate> = Vec::new();
    for ridge in ridge_lines(&rows, &widths) {
        if ridge.points.len() < min_length {
            continue;
        }
        let col = ridge.column();
        if snr_at(&rows[0], col, noise_window) < MIN_SNR {
            continue;
        }
        let index = snap_to_apex(data, col, reach);
        if maxima.binary_search(&index).is_err() {
            continue;
        }
        if candidates.iter().any(|c| c.index == index) {
            continue;
        }
        let (prom, _, _) = prominence(data, index);
        if prom > 0.0 {
            candidates.push(Candidate {
                index,
                prominence: prom,
            });
        }
    }
    cap_by_prominence(candidates, params.max_peaks)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::gaussian_trace;
    use super::*;

    #[test]
    fn test_ricker_shape() {
        let w = ricker(101, 4.0);
        let centre = 50;
        assert!(w[centre] > 0.0);
        assert!((w[centre - 7] - w[centre + 7]).abs() < 1e-15);
        // Zero crossings sit at +-a.
        assert!(w[centre + 4].abs() < 1e-12);
        assert!(w[centre + 8] < 0.0);
        let integral: f64 = w.iter().sum();
        assert!(integral.abs() < 1e-3);
    }

    #[test]
    fn test_widths_are_geometric() {
        let w = widths(2, 50);
        assert_eq!(w.len(), NUM_SCALES);
        assert!((w[0] - 2.0).abs() < 1e-12);
        assert!((w[NUM_SCALES - 1] - 50.0).abs() < 1e-9);
        let r = w[1] / w[0];
        assert!(w.windows(2).all(|p| (p[1] / p[0] - r).abs() < 1e-9));
    }

    #[test]
    fn test_single_ridge_per_gaussian() {
        let data = gaussian_trace(200, &[(60.0, 50.0, 4.0), (140.0, 30.0, 5.0)], 2.0);
        let params = DetectionParams {
            width_min: 1,
            width_max: 16,
            ..DetectionParams::default()
        };
        let found: Vec<usize> = find_peaks(&data, &params).iter().map(|c| c.index).collect();
        assert_eq!(found, vec![60, 140]);
    }

    #[test]
    fn test_flat_trace_has_no_peaks() {
        let data = vec![3.0; 64];
        assert!(find_peaks(&data, &DetectionParams::default()).is_empty());
    }
}
