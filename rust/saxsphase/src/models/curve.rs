use crate::errors::{
    Result,
    SaxsError,
};
use crate::utils::stats;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

/// Minimum number of samples a curve must carry to be analysed.
pub const MIN_CURVE_LEN: usize = 8;

/// A scattering curve: intensity `I(q)` sampled on a strictly increasing,
/// positive `q` grid (units of inverse Angstrom).
///
/// Construction validates the invariants once, so every consumer can rely on
/// `q.len() == intensity.len() >= MIN_CURVE_LEN`, finite values, strictly
/// increasing `q` and non-negative intensities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct Curve {
    q: Vec<f64>,
    intensity: Vec<f64>,
}

/// Unchecked serialized form; deserialization goes through [`Curve::try_new`].
#[derive(Deserialize)]
struct RawCurve {
    q: Vec<f64>,
    intensity: Vec<f64>,
}

impl TryFrom<RawCurve> for Curve {
    type Error = SaxsError;

    fn try_from(raw: RawCurve) -> Result<Self> {
        Self::try_new(raw.q, raw.intensity)
    }
}

/// Headline numbers reported back on load and trim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSummary {
    pub num_points: usize,
    pub q_min: f64,
    pub q_max: f64,
    pub dq_median: f64,
    pub intensity_min: f64,
    pub intensity_max: f64,
    /// Coefficient of variation of the intensities, absent for an all-zero curve.
    pub intensity_cv: Option<f64>,
}

impl Curve {
    pub fn try_new(q: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if q.len() != intensity.len() {
            return Err(SaxsError::input_invalid(format!(
                "q and intensity lengths differ ({} vs {})",
                q.len(),
                intensity.len()
            )));
        }
        if q.len() < MIN_CURVE_LEN {
            return Err(SaxsError::input_invalid(format!(
                "curve has {} samples, at least {} are required",
                q.len(),
                MIN_CURVE_LEN
            )));
        }
        if let Some(i) = q.iter().position(|x| !x.is_finite() || *x <= 0.0) {
            return Err(SaxsError::input_invalid(format!(
                "q[{}] = {} is not a finite positive value",
                i, q[i]
            )));
        }
        if let Some(i) = intensity.iter().position(|x| !x.is_finite() || *x < 0.0) {
            return Err(SaxsError::input_invalid(format!(
                "intensity[{}] = {} is not a finite non-negative value",
                i, intensity[i]
            )));
        }
        if let Some(i) = q.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SaxsError::input_invalid(format!(
                "q is not strictly increasing at index {} ({} -> {})",
                i + 1,
                q[i],
                q[i + 1]
            )));
        }
        Ok(Self { q, intensity })
    }

    /// Builds a curve on the same q grid with new intensities.
    ///
    /// Smoothing can undershoot zero around sharp features; those excursions
    /// are clipped to zero so the non-negativity invariant holds.
    pub fn with_intensity(&self, intensity: Vec<f64>) -> Result<Self> {
        if intensity.len() != self.q.len() {
            return Err(SaxsError::input_invalid(format!(
                "expected {} intensities, got {}",
                self.q.len(),
                intensity.len()
            )));
        }
        if let Some(i) = intensity.iter().position(|x| !x.is_finite()) {
            return Err(SaxsError::input_invalid(format!(
                "intensity[{}] is not finite",
                i
            )));
        }
        let clipped = intensity.iter().filter(|x| **x < 0.0).count();
        if clipped > 0 {
            debug!("Clipping {} negative intensities to zero", clipped);
        }
        Ok(Self {
            q: self.q.clone(),
            intensity: intensity.into_iter().map(|x| x.max(0.0)).collect(),
        })
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn q_min(&self) -> f64 {
        self.q[0]
    }

    pub fn q_max(&self) -> f64 {
        self.q[self.q.len() - 1]
    }

    pub fn q_range(&self) -> f64 {
        self.q_max() - self.q_min()
    }

    pub fn contains_q(&self, q: f64) -> bool {
        (self.q_min()..=self.q_max()).contains(&q)
    }

    /// Keeps the samples with `q_min <= q <= q_max`.
    pub fn trim(&self, q_min: f64, q_max: f64) -> Result<Self> {
        if !q_min.is_finite() || !q_max.is_finite() || q_min > q_max {
            return Err(SaxsError::input_invalid(format!(
                "invalid trim window [{}, {}]",
                q_min, q_max
            )));
        }
        let start = self.q.partition_point(|&x| x < q_min);
        let end = self.q.partition_point(|&x| x <= q_max);
        let kept = end.saturating_sub(start);
        if kept < MIN_CURVE_LEN {
            return Err(SaxsError::RangeEmpty {
                q_min,
                q_max,
                context: format!("({} samples survive, {} required)", kept, MIN_CURVE_LEN),
            });
        }
        Ok(Self {
            q: self.q[start..end].to_vec(),
            intensity: self.intensity[start..end].to_vec(),
        })
    }

    /// Linearly interpolated intensity at `q`, clamped to the end samples.
    pub fn intensity_at(&self, q: f64) -> f64 {
        let n = self.q.len();
        if q <= self.q[0] {
            return self.intensity[0];
        }
        if q >= self.q[n - 1] {
            return self.intensity[n - 1];
        }
        let i = self.q.partition_point(|&x| x < q);
        let (q0, q1) = (self.q[i - 1], self.q[i]);
        let (i0, i1) = (self.intensity[i - 1], self.intensity[i]);
        i0 + (i1 - i0) * (q - q0) / (q1 - q0)
    }

    pub fn summary(&self) -> CurveSummary {
        let dq = stats::diff(&self.q);
        let (intensity_min, intensity_max) =
            stats::min_max(&self.intensity).unwrap_or((0.0, 0.0));
        let mean = stats::mean(&self.intensity);
        let intensity_cv = if mean > 0.0 {
            Some(stats::std_dev(&self.intensity) / mean)
        } else {
            None
        };
        CurveSummary {
            num_points: self.len(),
            q_min: self.q_min(),
            q_max: self.q_max(),
            dq_median: stats::median(&dq),
            intensity_min,
            intensity_max,
            intensity_cv,
        }
    }

    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        let q: Vec<f64> = (1..=10).map(|i| i as f64 * 0.01).collect();
        let intensity = vec![5.0, 4.0, 6.0, 9.0, 6.0, 4.0, 3.0, 7.0, 3.0, 2.0];
        Self::try_new(q, intensity).unwrap()
    }
}
