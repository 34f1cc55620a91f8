//! Periodised Daubechies-4 (8-tap) discrete wavelet transform.
//!
//! The signal is padded by reflection to a multiple of `2^levels`, so every
//! level halves an even length and the transform stays orthogonal. The
//! inverse is the transpose of the forward operator.

/// Daubechies wavelet with four vanishing moments, decomposition low-pass.
const DB4_LO: [f64; 8] = [
    -0.010597401784997278,
    0.032883011666982945,
    0.030841381835986965,
    -0.18703481171888114,
    -0.02798376941698385,
    0.6308807679295904,
    0.7148465705525415,
    0.23037781330885523,
];

/// Quadrature mirror of [`DB4_LO`]: `g[j] = (-1)^j h[L - 1 - j]`.
fn db4_hi() -> [f64; 8] {
    let mut hi = [0.0; 8];
    for (j, g) in hi.iter_mut().enumerate() {
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        *g = sign * DB4_LO[DB4_LO.len() - 1 - j];
    }
    hi
}

#[derive(Debug, Clone)]
pub struct WaveletDecomposition {
    /// Coarsest approximation band.
    pub approximation: Vec<f64>,
    /// Detail bands, finest first.
    pub details: Vec<Vec<f64>>,
    original_len: usize,
}

fn analysis_step(x: &[f64], hi: &[f64; 8]) -> (Vec<f64>, Vec<f64>) {
    let n = x.len();
    let half = n / 2;
    let mut approx = vec![0.0; half];
    let mut detail = vec![0.0; half];
    for k in 0..half {
        for j in 0..DB4_LO.len() {
            let v = x[(2 * k + j) % n];
            approx[k] += DB4_LO[j] * v;
            detail[k] += hi[j] * v;
        }
    }
    (approx, detail)
}

fn synthesis_step(approx: &[f64], detail: &[f64], hi: &[f64; 8]) -> Vec<f64> {
    let n = approx.len() * 2;
    let mut out = vec![0.0; n];
    for k in 0..approx.len() {
        for j in 0..DB4_LO.len() {
            out[(2 * k + j) % n] += DB4_LO[j] * approx[k] + hi[j] * detail[k];
        }
    }
    out
}

fn reflect_pad(data: &[f64], target: usize) -> Vec<f64> {
    let mut padded = data.to_vec();
    let mut i = data.len();
    while padded.len() < target {
        // Walk back over the data and keep bouncing off the ends.
        let period = 2 * data.len();
        let m = i % period;
        let idx = if m < data.len() { m } else { period - 1 - m };
        padded.push(data[idx]);
        i += 1;
    }
    padded
}

impl WaveletDecomposition {
    pub fn decompose(data: &[f64], levels: u32) -> Self {
        let block = 1usize << levels;
        let target = data.len().div_ceil(block).max(1) * block;
        let hi = db4_hi();

        let mut approx = reflect_pad(data, target);
        let mut details = Vec::with_capacity(levels as usize);
        for _ in 0..levels {
            let (a, d) = analysis_step(&approx, &hi);
            details.push(d);
            approx = a;
        }
        Self {
            approximation: approx,
            details,
            original_len: data.len(),
        }
    }

    /// Soft-thresholds every detail band in place.
    pub fn soft_threshold_details(&mut self, threshold: f64) {
        for band in self.details.iter_mut() {
            for c in band.iter_mut() {
                *c = c.signum() * (c.abs() - threshold).max(0.0);
            }
        }
    }

    pub fn reconstruct(&self) -> Vec<f64> {
        let hi = db4_hi();
        let mut approx = self.approximation.clone();
        for detail in self.details.iter().rev() {
            approx = synthesis_step(&approx, detail, &hi);
        }
        approx.truncate(self.original_len);
        approx
    }
}
