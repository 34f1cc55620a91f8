//! 1D smoothing kernels used by the enhancement registry.
//!
//! Boundary handling follows the half-sample "reflect" convention
//! (`d c b a | a b c d | d c b a`) for the convolution filters, and
//! polynomial extrapolation of the edge windows for Savitzky-Golay.

/// Maps an out-of-bounds index into `[0, len)` by half-sample reflection.
#[inline]
fn reflect_index(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

pub(crate) fn convolve_reflect(data: &[f64], kernel: &[f64]) -> Vec<f64> {
    let radius = (kernel.len() / 2) as isize;
    (0..data.len())
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let idx = reflect_index(i as isize + k as isize - radius, data.len());
                    w * data[idx]
                })
                .sum()
        })
        .collect()
}

/// Gaussian smoothing with the kernel truncated at four standard deviations.
pub fn gaussian_filter(data: &[f64], sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 || data.len() < 2 {
        return data.to_vec();
    }
    let radius = (4.0 * sigma + 0.5) as usize;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|k| {
            let x = k as f64 - radius as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let norm: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= norm);
    convolve_reflect(data, &kernel)
}

/// Moving average over `size` samples centred on each point.
pub fn uniform_filter(data: &[f64], size: usize) -> Vec<f64> {
    if size < 2 || data.is_empty() {
        return data.to_vec();
    }
    let size = size | 1;
    let kernel = vec![1.0 / size as f64; size];
    convolve_reflect(data, &kernel)
}

/// Variance of the samples inside a centred moving window.
pub fn local_variance(data: &[f64], size: usize) -> Vec<f64> {
    let sq: Vec<f64> = data.iter().map(|x| x * x).collect();
    let mean_sq = uniform_filter(&sq, size);
    let mean = uniform_filter(data, size);
    mean_sq
        .iter()
        .zip(mean.iter())
        .map(|(msq, m)| (msq - m * m).max(0.0))
        .collect()
}

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` for (numerically) singular systems.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            for k in col..n {
                a[row][k] -= factor * pivot_row[k];
            }
            b[row] -= factor * pivot_rhs;
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Least-squares polynomial fit helper for a fixed, centred window.
struct LocalPolynomial {
    half: usize,
    order: usize,
    normal: Vec<Vec<f64>>,
}

impl LocalPolynomial {
    fn new(window: usize, order: usize) -> Self {
        let half = window / 2;
        let mut normal = vec![vec![0.0; order + 1]; order + 1];
        for j in 0..window {
            let x = j as f64 - half as f64;
            for (r, row) in normal.iter_mut().enumerate() {
                for (c, cell) in row.iter_mut().enumerate() {
                    *cell += x.powi((r + c) as i32);
                }
            }
        }
        Self {
            half,
            order,
            normal,
        }
    }

    fn window(&self) -> usize {
        2 * self.half + 1
    }

    fn offset(&self, j: usize) -> f64 {
        j as f64 - self.half as f64
    }

    /// Weights that evaluate the fitted polynomial at the window centre.
    fn centre_weights(&self) -> Option<Vec<f64>> {
        let mut e0 = vec![0.0; self.order + 1];
        e0[0] = 1.0;
        let x = solve_linear(self.normal.clone(), e0)?;
        Some(
            (0..self.window())
                .map(|j| {
                    let t = self.offset(j);
                    x.iter()
                        .enumerate()
                        .map(|(k, xk)| xk * t.powi(k as i32))
                        .sum()
                })
                .collect(),
        )
    }

    fn fit(&self, values: &[f64]) -> Option<Vec<f64>> {
        let rhs: Vec<f64> = (0..=self.order)
            .map(|k| {
                values
                    .iter()
                    .enumerate()
                    .map(|(j, v)| v * self.offset(j).powi(k as i32))
                    .sum()
            })
            .collect();
        solve_linear(self.normal.clone(), rhs)
    }

    fn eval(coefs: &[f64], t: f64) -> f64 {
        coefs.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }
}

/// Savitzky-Golay smoothing.
///
/// Interior samples use the usual convolution weights; the first and last
/// `window / 2` samples are taken from the polynomial fitted to the edge
/// window. Returns the input unchanged when the window is not a valid odd
/// length in `[3, len]` or does not exceed `polyorder`.
pub fn savitzky_golay(data: &[f64], window: usize, polyorder: usize) -> Vec<f64> {
    let n = data.len();
    if window < 3 || window % 2 == 0 || window > n || polyorder >= window {
        return data.to_vec();
    }
    let poly = LocalPolynomial::new(window, polyorder);
    let weights = match poly.centre_weights() {
        Some(w) => w,
        None => return data.to_vec(),
    };
    let half = poly.half;

    let mut out = data.to_vec();
    for i in half..n - half {
        out[i] = weights
            .iter()
            .zip(&data[i - half..=i + half])
            .map(|(w, v)| w * v)
            .sum();
    }

    if let Some(head) = poly.fit(&data[..window]) {
        for (i, o) in out.iter_mut().enumerate().take(half) {
            *o = LocalPolynomial::eval(&head, poly.offset(i));
        }
    }
    let tail_start = n - window;
    if let Some(tail) = poly.fit(&data[tail_start..]) {
        for i in n - half..n {
            out[i] = LocalPolynomial::eval(&tail, poly.offset(i - tail_start));
        }
    }
    out
}

/// Rounds a window length up to the next odd number.
pub fn odd_window(len: usize) -> usize {
    len | 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tol, "index {}: {} vs {}", i, x, y);
        }
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
    }

    #[test]
    fn test_gaussian_preserves_constant() {
        let data = vec![3.5; 20];
        assert_close(&gaussian_filter(&data, 1.5), &data, 1e-12);
    }

    #[test]
    fn test_gaussian_spreads_spike() {
        let mut data = vec![0.0; 21];
        data[10] = 1.0;
        let out = gaussian_filter(&data, 1.0);
        assert!(out[10] < 1.0);
        assert!(out[9] > 0.0 && (out[9] - out[11]).abs() < 1e-12);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_savgol_reproduces_polynomials() {
        // A quadratic is reproduced exactly by a degree-2 fit, edges included.
        let data: Vec<f64> = (0..30).map(|i| 0.5 * (i as f64).powi(2) - 3.0 * i as f64 + 2.0).collect();
        assert_close(&savitzky_golay(&data, 7, 2), &data, 1e-8);

        let cubic: Vec<f64> = (0..40).map(|i| (i as f64 * 0.1).powi(3)).collect();
        assert_close(&savitzky_golay(&cubic, 11, 3), &cubic, 1e-8);
    }

    #[test]
    fn test_savgol_invalid_window_is_identity() {
        let data: Vec<f64> = (0..10).map(|i| (i as f64).sin()).collect();
        assert_eq!(savitzky_golay(&data, 4, 2), data);
        assert_eq!(savitzky_golay(&data, 3, 3), data);
        assert_eq!(savitzky_golay(&data, 11, 2), data);
    }

    #[test]
    fn test_local_variance() {
        let flat = vec![2.0; 12];
        assert!(local_variance(&flat, 5).iter().all(|v| v.abs() < 1e-12));

        let mut spiky = vec![0.0; 12];
        spiky[6] = 10.0;
        let var = local_variance(&spiky, 5);
        assert!(var[6] > 0.0);
        assert!(var[0].abs() < 1e-12);
    }
}
