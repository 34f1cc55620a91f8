use crate::utils::filters::{
    gaussian_filter,
    local_variance,
    odd_window,
    savitzky_golay,
};
use crate::utils::stats::{
    gradient,
    percentile,
};
use crate::utils::wavelet::WaveletDecomposition;
use tracing::warn;

const WAVELET_LEVELS: u32 = 4;
const WAVELET_THRESHOLD_FRACTION: f64 = 0.1;

const BAYES_SIGMA: f64 = 0.8;
const BAYES_SG_WEIGHT: f64 = 0.7;

const ADAPTIVE_WINDOW: usize = 5;
const ADAPTIVE_SIGMA: f64 = 1.5;
const ADAPTIVE_PERCENTILE: f64 = 75.0;

const PEAK_SIGMA: f64 = 1.2;
const PEAK_GRADIENT_PERCENTILE: f64 = 70.0;

/// Savitzky-Golay cubic smoothing used when the wavelet path is not usable.
pub fn wavelet_fallback(intensity: &[f64]) -> Vec<f64> {
    let window = odd_window((intensity.len() / 4).min(51));
    // `savitzky_golay` is the identity for windows it cannot honour.
    savitzky_golay(intensity, window, 3)
}

pub fn wavelet_denoise(intensity: &[f64]) -> Vec<f64> {
    if intensity.len() < (1 << WAVELET_LEVELS) {
        warn!(
            "Curve with {} samples is too short for a {}-level decomposition, using Savitzky-Golay",
            intensity.len(),
            WAVELET_LEVELS
        );
        return wavelet_fallback(intensity);
    }
    let mut dec = WaveletDecomposition::decompose(intensity, WAVELET_LEVELS);
    let peak = dec
        .approximation
        .iter()
        .fold(0.0f64, |acc, c| acc.max(c.abs()));
    dec.soft_threshold_details(WAVELET_THRESHOLD_FRACTION * peak);
    let out = dec.reconstruct();
    if out.iter().any(|x| !x.is_finite()) {
        warn!("Wavelet reconstruction produced non-finite values, using Savitzky-Golay");
        return wavelet_fallback(intensity);
    }
    out
}

pub fn bayesian_smooth(intensity: &[f64]) -> Vec<f64> {
    let blurred = gaussian_filter(intensity, BAYES_SIGMA);
    let window = odd_window((intensity.len() / 3).min(21));
    let sg = savitzky_golay(&blurred, window, 2);
    sg.iter()
        .zip(blurred.iter())
        .map(|(s, g)| BAYES_SG_WEIGHT * s + (1.0 - BAYES_SG_WEIGHT) * g)
        .collect()
}

pub fn adaptive_filter(intensity: &[f64]) -> Vec<f64> {
    let var = local_variance(intensity, ADAPTIVE_WINDOW);
    let threshold = percentile(&var, ADAPTIVE_PERCENTILE);
    let smooth = gaussian_filter(intensity, ADAPTIVE_SIGMA);
    intensity
        .iter()
        .zip(var.iter())
        .zip(smooth.iter())
        .map(|((raw, v), s)| if *v > threshold { *s } else { *raw })
        .collect()
}

pub fn peak_enhance(intensity: &[f64]) -> Vec<f64> {
    let window = odd_window((intensity.len() / 4).min(15));
    let sg = savitzky_golay(intensity, window, 2);
    let grad: Vec<f64> = gradient(&sg).into_iter().map(f64::abs).collect();
    let threshold = percentile(&grad, PEAK_GRADIENT_PERCENTILE);
    let background = gaussian_filter(intensity, PEAK_SIGMA);
    grad.iter()
        .zip(sg.iter())
        .zip(background.iter())
        .map(|((g, s), b)| if *g > threshold { *s } else { *b })
        .collect()
}
