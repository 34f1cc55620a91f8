use super::{
    Candidate,
    DetectionParams,
    cap_by_prominence,
};
use crate::utils::stats::min_max;
use std::cmp::Ordering;

/// Indices of all local maxima. A plateau counts once, at its midpoint.
pub(crate) fn local_maxima(data: &[f64]) -> Vec<usize> {
    let n = data.len();
    let mut out = Vec::new();
    if n < 3 {
        return out;
    }
    let mut i = 1;
    while i < n - 1 {
        if data[i] > data[i - 1] {
            let start = i;
            let mut end = i;
            while end + 1 < n && data[end + 1] == data[i] {
                end += 1;
            }
            if end + 1 < n && data[end + 1] < data[i] {
                out.push((start + end) / 2);
            }
            i = end + 1;
        } else {
            i += 1;
        }
    }
    out
}

/// Prominence of the sample at `idx` together with its bases.
///
/// The base on each side is the lowest point between `idx` and the nearest
/// strictly higher sample (or the trace edge).
pub(crate) fn prominence(data: &[f64], idx: usize) -> (f64, usize, usize) {
    let height = data[idx];

    let mut left_min = height;
    let mut left_base = idx;
    for i in (0..idx).rev() {
        if data[i] > height {
            break;
        }
        if data[i] < left_min {
            left_min = data[i];
            left_base = i;
        }
    }

    let mut right_min = height;
    let mut right_base = idx;
    for (i, &v) in data.iter().enumerate().skip(idx + 1) {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

/// Width in samples at `rel_height` of the prominence below the apex,
/// with linear interpolation of both crossings. The search never goes past
/// the prominence bases.
pub(crate) fn width_at(
    data: &[f64],
    idx: usize,
    prominence: f64,
    bases: (usize, usize),
    rel_height: f64,
) -> f64 {
    let level = data[idx] - prominence * rel_height;
    let (left_base, right_base) = bases;

    let mut i = idx;
    while i > left_base && data[i] > level {
        i -= 1;
    }
    let mut left = i as f64;
    if data[i] < level {
        left += (level - data[i]) / (data[i + 1] - data[i]);
    }

    let mut j = idx;
    while j < right_base && data[j] > level {
        j += 1;
    }
    let mut right = j as f64;
    if data[j] < level {
        right -= (level - data[j]) / (data[j - 1] - data[j]);
    }

    right - left
}

/// Keeps the best candidate (by `key`) inside every `distance`-sample
/// neighbourhood and returns the survivors in sample order.
pub(crate) fn filter_by_distance<F>(mut candidates: Vec<Candidate>, distance: usize, key: F) -> Vec<Candidate>
where
    F: Fn(&Candidate) -> f64,
{
    candidates.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !kept.iter().any(|k| k.index.abs_diff(c.index) < distance) {
            kept.push(c);
        }
    }
    kept.sort_by_key(|c| c.index);
    kept
}

pub(crate) fn find_peaks(data: &[f64], maxima: &[usize], params: &DetectionParams) -> Vec<Candidate> {
    let range = match min_max(data) {
        Some((lo, hi)) => hi - lo,
        None => return Vec::new(),
    };
    let min_height = params.height_factor * range;
    let min_prominence = params.prominence_factor * range;

    let candidates: Vec<Candidate> = maxima
        .iter()
        .filter(|&&i| data[i] >= min_height)
        .map(|&i| Candidate {
            index: i,
            prominence: prominence(data, i).0,
        })
        .collect();

    let candidates = filter_by_distance(candidates, params.min_distance, |c| data[c.index]);

    let candidates: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.prominence > 0.0 && c.prominence >= min_prominence)
        .filter(|c| {
            let (_, left, right) = prominence(data, c.index);
            let width = width_at(data, c.index, c.prominence, (left, right), params.rel_height);
            width >= params.width_min as f64 && width <= params.width_max as f64
        })
        .collect();

    cap_by_prominence(candidates, params.max_peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima_with_plateau() {
        let data = [0.0, 2.0, 1.0, 3.0, 3.0, 3.0, 1.0, 0.5, 0.5, 4.0];
        assert_eq!(local_maxima(&data), vec![1, 4]);
    }

    #[test]
    fn test_prominence_and_bases() {
        let data = [0.0, 5.0, 2.0, 3.0, 1.0, 6.0, 0.0];
        let (p, l, r) = prominence(&data, 3);
        assert_eq!(p, 1.0);
        assert_eq!((l, r), (2, 4));
        let (p, _, _) = prominence(&data, 1);
        assert_eq!(p, 4.0);
        assert_eq!(prominence(&data, 5).0, 6.0);
    }

    #[test]
    fn test_width_of_triangle() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        let (p, l, r) = prominence(&data, 4);
        let w = width_at(&data, 4, p, (l, r), 0.5);
        assert!((w - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_keeps_higher() {
        let data = [0.0, 3.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        let maxima = local_maxima(&data);
        let params = DetectionParams {
            min_distance: 3,
            ..DetectionParams::default()
        };
        let found: Vec<usize> = find_peaks(&data, &maxima, &params)
            .iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(found, vec![3, 8]);
    }

    #[test]
    fn test_prominence_filter() {
        let data = [0.0, 10.0, 9.5, 9.8, 0.0, 4.0, 0.0];
        let maxima = local_maxima(&data);
        let params = DetectionParams {
            prominence_factor: 0.1,
            ..DetectionParams::default()
        };
        let found: Vec<usize> = find_peaks(&data, &maxima, &params)
            .iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(found, vec![1, 5]);
    }

    #[test]
    fn test_cap_prefers_prominent() {
        let data = [0.0, 1.0, 0.0, 5.0, 0.0, 3.0, 0.0, 4.0, 0.0];
        let maxima = local_maxima(&data);
        let params = DetectionParams {
            max_peaks: 2,
            ..DetectionParams::default()
        };
        let found: Vec<usize> = find_peaks(&data, &maxima, &params)
            .iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(found, vec![3, 7]);
    }
}
