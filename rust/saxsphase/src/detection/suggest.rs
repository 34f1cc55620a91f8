use super::{
    DetectionAlgorithm,
    DetectionParams,
};
use crate::models::{
    CrystalSystem,
    Curve,
    SpaceGroup,
};
use crate::utils::stats::{
    diff2,
    std_dev,
};
use serde::Serialize;
use tracing::debug;

/// Detection parameters derived from the curve's length and noise level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionSuggestion {
    pub params: DetectionParams,
    pub algorithm: DetectionAlgorithm,
    /// `std(I) / std(d2 I)`; infinite for a trace with no curvature noise.
    pub snr: f64,
}

/// Rough signal-to-noise estimate used to pick detection settings.
pub fn estimate_snr(intensity: &[f64]) -> f64 {
    let noise = std_dev(&diff2(intensity));
    if noise == 0.0 {
        return f64::INFINITY;
    }
    std_dev(intensity) / noise
}

pub fn suggest(curve: &Curve, target: Option<SpaceGroup>) -> DetectionSuggestion {
    suggest_for(curve.len(), estimate_snr(curve.intensity()), target)
}

/// Suggestion for a curve of `n` samples with the given noise estimate.
fn suggest_for(n: usize, snr: f64, target: Option<SpaceGroup>) -> DetectionSuggestion {
    let (height_factor, algorithm) = if snr > 50.0 {
        (1e-3, DetectionAlgorithm::Standard)
    } else if snr > 10.0 {
        (5e-4, DetectionAlgorithm::Hybrid)
    } else {
        (2e-4, DetectionAlgorithm::Cwt)
    };
    let prominence_factor = if snr < 5.0 {
        5e-4
    } else if snr > 50.0 {
        2e-3
    } else {
        1e-3
    };
    let width_min = (n / 1000).max(1);
    let width_max = (n / 20).min(100).max(width_min);
    let max_peaks = match target.map(|g| g.crystal_system()) {
        Some(CrystalSystem::Lamellar) => 10,
        Some(CrystalSystem::Hexagonal) => 15,
        Some(CrystalSystem::Cubic) | None => 20,
    };

    let params = DetectionParams {
        height_factor,
        min_distance: (n / 100).max(1),
        prominence_factor,
        max_peaks,
        width_min,
        width_max,
        rel_height: 0.5,
    };
    debug!("SNR estimate {:.2}, suggesting {} with {:?}", snr, algorithm, params);
    DetectionSuggestion {
        params,
        algorithm,
        snr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_from(intensity: Vec<f64>) -> Curve {
        let q = (1..=intensity.len()).map(|i| i as f64 * 0.001).collect();
        Curve::try_new(q, intensity).unwrap()
    }

    #[test]
    fn test_linear_trace_is_noiseless() {
        let curve = curve_from((0..50).map(|i| i as f64).collect());
        let s = suggest(&curve, None);
        assert!(s.snr.is_infinite());
        assert_eq!(s.algorithm, DetectionAlgorithm::Standard);
        assert_eq!(s.params.prominence_factor, 2e-3);
        assert_eq!(s.params.max_peaks, 20);
    }

    #[test]
    fn test_noisy_trace_prefers_cwt() {
        let curve = curve_from((0..200).map(|i| if i % 2 == 0 { 10.0 } else { 12.0 }).collect());
        let s = suggest(&curve, Some(SpaceGroup::Lamellar));
        assert!(s.snr < 5.0);
        assert_eq!(s.algorithm, DetectionAlgorithm::Cwt);
        assert_eq!(s.params.height_factor, 2e-4);
        assert_eq!(s.params.prominence_factor, 5e-4);
        assert_eq!(s.params.max_peaks, 10);
        assert_eq!(s.params.min_distance, 2);
        assert_eq!(s.params.width_min, 1);
        assert_eq!(s.params.width_max, 10);
        assert!(s.params.validate().is_ok());
    }

    /// Slow sine of unit amplitude plus alternating `+-noise`.
    fn dithered_sine(noise: f64) -> Curve {
        curve_from(
            (0..2000)
                .map(|i| {
                    let dither = if i % 2 == 0 { noise } else { -noise };
                    5.0 + (i as f64 / 50.0).sin() + dither
                })
                .collect(),
        )
    }

    #[test]
    fn test_moderate_noise_prefers_hybrid() {
        let s = suggest(&dithered_sine(0.006), Some(SpaceGroup::Pn3m));
        assert!(s.snr > 10.0 && s.snr < 50.0, "{}", s.snr);
        assert_eq!(s.algorithm, DetectionAlgorithm::Hybrid);
        assert_eq!(
            s.params,
            DetectionParams {
                height_factor: 5e-4,
                min_distance: 20,
                prominence_factor: 1e-3,
                max_peaks: 20,
                width_min: 2,
                width_max: 100,
                rel_height: 0.5,
            }
        );
    }

    #[test]
    fn test_low_noise_band_keeps_default_prominence() {
        let s = suggest(&dithered_sine(0.0236), Some(SpaceGroup::Hexagonal));
        assert!(s.snr > 5.0 && s.snr <= 10.0, "{}", s.snr);
        assert_eq!(s.algorithm, DetectionAlgorithm::Cwt);
        assert_eq!(
            s.params,
            DetectionParams {
                height_factor: 2e-4,
                min_distance: 20,
                prominence_factor: 1e-3,
                max_peaks: 15,
                width_min: 2,
                width_max: 100,
                rel_height: 0.5,
            }
        );
    }

    #[test]
    fn test_band_edges() {
        let at = |snr| suggest_for(1000, snr, None);
        assert_eq!(at(50.0).algorithm, DetectionAlgorithm::Hybrid);
        assert_eq!(at(50.0).params.prominence_factor, 1e-3);
        assert_eq!(at(50.1).algorithm, DetectionAlgorithm::Standard);
        assert_eq!(at(50.1).params.height_factor, 1e-3);
        assert_eq!(at(10.0).algorithm, DetectionAlgorithm::Cwt);
        assert_eq!(at(10.1).params.height_factor, 5e-4);
        assert_eq!(at(5.0).params.prominence_factor, 1e-3);
        assert_eq!(at(4.9).params.prominence_factor, 5e-4);
    }

    #[test]
    fn test_group_caps() {
        let curve = curve_from((0..2400).map(|i| (i as f64 / 50.0).sin() + 2.0).collect());
        assert_eq!(suggest(&curve, Some(SpaceGroup::Hexagonal)).params.max_peaks, 15);
        assert_eq!(suggest(&curve, Some(SpaceGroup::Ia3d)).params.max_peaks, 20);
        let s = suggest(&curve, None);
        assert_eq!(s.params.width_min, 2);
        assert_eq!(s.params.width_max, 100);
        assert_eq!(s.params.min_distance, 24);
    }
}
