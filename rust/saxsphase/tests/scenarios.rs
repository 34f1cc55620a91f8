use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};
use saxsphase::analysis::{
    MATCH_TOLERANCE,
    derive,
    evaluate,
    predict,
    score_all,
};
use saxsphase::enhancement::compare_all;
use saxsphase::{
    Curve,
    DetectionAlgorithm,
    DetectionParams,
    Engine,
    Enhancement,
    Interpretation,
    SpaceGroup,
};

const LAMELLAR_D: [f64; 5] = [0.10, 0.20, 0.30, 0.40, 0.50];

fn gaussian_curve(q: Vec<f64>, peaks: &[(f64, f64)], sigma: f64, background: f64) -> Curve {
    let intensity = q
        .iter()
        .map(|x| {
            background
                + peaks
                    .iter()
                    .map(|(c, amp)| amp * (-0.5 * ((x - c) / sigma).powi(2)).exp())
                    .sum::<f64>()
        })
        .collect();
    Curve::try_new(q, intensity).unwrap()
}

#[test]
fn test_exact_lamellar() {
    let prediction = predict(0.10, SpaceGroup::Lamellar, 5, 0.05, 0.55).unwrap();
    let record = evaluate(&prediction, &LAMELLAR_D, MATCH_TOLERANCE);
    assert_eq!(record.matched_count, 5);
    assert_eq!(record.avg_relative_error.map(|e| e < 1e-12), Some(true));
    assert_eq!(record.score, 1.0);
    assert_eq!(record.interpretation, Interpretation::Excellent);

    let q: Vec<f64> = (50..=550).map(|i| i as f64 * 0.001).collect();
    let curve = gaussian_curve(q, &LAMELLAR_D.map(|c| (c, 100.0)), 0.002, 1.0);
    let annotated = prediction.with_matches(&record.matches);
    let crystal = derive(&annotated, &curve);
    assert!((crystal.lattice.a - 62.83).abs() < 0.01, "{}", crystal.lattice.a);
}

#[test]
fn test_noisy_hexagonal() {
    let detected = [0.0500, 0.0869, 0.0999, 0.1325, 0.1497];
    let prediction = predict(0.05, SpaceGroup::Hexagonal, 5, 0.04, 0.16).unwrap();
    let expected = [0.0500, 0.0866, 0.1000, 0.1323, 0.1500];
    for (p, e) in prediction.peaks.iter().zip(expected) {
        assert!((p.q_predicted - e).abs() < 1e-4);
    }
    let record = evaluate(&prediction, &detected, MATCH_TOLERANCE);
    assert_eq!(record.matched_count, 5);
    assert!(record.score > 0.9, "{}", record.score);

    let q: Vec<f64> = (40..=160).map(|i| i as f64 * 0.001).collect();
    let curve = gaussian_curve(q, &detected.map(|c| (c, 50.0)), 0.001, 1.0);
    let crystal = derive(&prediction.with_matches(&record.matches), &curve);
    assert!((crystal.lattice.a - 145.1).abs() < 0.1, "{}", crystal.lattice.a);
    assert_eq!(crystal.lattice.gamma, Some(120.0));
}

#[test]
fn test_wrong_group_is_rejected() {
    let ranked = score_all(&LAMELLAR_D, 0.10, 5, 0.05, 0.55, MATCH_TOLERANCE).unwrap();
    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked[0].space_group, SpaceGroup::Lamellar);
    assert_eq!(ranked[0].score, 1.0);
    for record in &ranked[1..] {
        assert!(record.score < 0.5, "{:?}: {}", record.space_group, record.score);
    }
    for group in [SpaceGroup::Pn3m, SpaceGroup::Ia3d, SpaceGroup::Im3m] {
        let record = ranked.iter().find(|r| r.space_group == group).unwrap();
        assert_eq!(record.interpretation, Interpretation::Rejected, "{}", group);
    }

    // Only the reference lines up with a gyroid lattice.
    let ia3d = ranked
        .iter()
        .find(|r| r.space_group == SpaceGroup::Ia3d)
        .unwrap();
    assert_eq!(ia3d.matched_count, 1);
    assert!((ia3d.score - 0.0184).abs() < 1e-9, "{}", ia3d.score);
}

#[test]
fn test_missing_peak() {
    let detected = [0.050, 0.100, 0.132, 0.150];
    let prediction = predict(0.05, SpaceGroup::Hexagonal, 5, 0.01, 0.20).unwrap();
    let record = evaluate(&prediction, &detected, MATCH_TOLERANCE);
    assert_eq!(record.matched_count, 4);
    assert!((record.match_ratio - 0.8).abs() < 1e-12);
    assert!(record.score > 0.6 && record.score < 0.8, "{}", record.score);
    assert_eq!(record.interpretation, Interpretation::Good);
}

#[test]
fn test_selection_restricts_analysis() {
    let centres = [0.015, 0.03, 0.04, 0.05, 0.06, 0.07, 0.08, 0.09, 0.10, 0.105];
    let peaks: Vec<(f64, f64)> = centres
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, 50.0 + 10.0 * i as f64))
        .collect();
    let q: Vec<f64> = (25..=550).map(|i| i as f64 * 0.0002).collect();
    let curve = gaussian_curve(q, &peaks, 0.0008, 1.0);

    let mut engine = Engine::default();
    engine.load(curve);
    let found = engine
        .detect(DetectionParams::default(), DetectionAlgorithm::Standard)
        .unwrap()
        .to_vec();
    assert_eq!(found.len(), 10, "{:?}", found);

    for q in [0.03, 0.06, 0.09] {
        let (_, selected) = engine.toggle_select(q).unwrap().unwrap();
        assert!(selected);
    }
    let analysis = engine.analysis_peaks().unwrap().to_vec();
    assert_eq!(analysis.len(), 3);
    for (got, want) in analysis.iter().zip([0.03, 0.06, 0.09]) {
        assert!((got - want).abs() < 1e-9);
    }

    engine.set_reference(analysis[0]).unwrap();
    engine.set_space_group(SpaceGroup::Lamellar);
    let record = engine.confidence().unwrap();
    assert_eq!(record.total_predicted, 5);
    assert_eq!(record.total_valid_predicted, 3);
    assert_eq!(record.total_detected, 3);
    assert_eq!(record.score, 1.0);
}

#[test]
fn test_enhancement_pick() {
    let mut rng = StdRng::seed_from_u64(42);
    let q: Vec<f64> = (1..=500).map(|i| i as f64 * 0.0005).collect();
    let intensity: Vec<f64> = q
        .iter()
        .map(|x| {
            let signal = 10.0
                + 100.0 * (-0.5 * ((x - 0.06) / 0.002).powi(2)).exp()
                + 60.0 * (-0.5 * ((x - 0.12) / 0.002).powi(2)).exp()
                + 40.0 * (-0.5 * ((x - 0.18) / 0.002).powi(2)).exp();
            signal + rng.gen_range(-5.0..5.0)
        })
        .collect();
    let curve = Curve::try_new(q, intensity).unwrap();

    let comparison = compare_all(&curve);
    let original = comparison.score_of(Enhancement::Original).unwrap();
    let smoothed = [
        Enhancement::BayesianSmoothed,
        Enhancement::WaveletDenoised,
        Enhancement::Ensemble,
    ]
    .iter()
    .filter_map(|e| comparison.score_of(*e))
    .fold(f64::NEG_INFINITY, f64::max);
    assert!(smoothed > original, "{} vs {}", smoothed, original);
    assert_ne!(comparison.best, Some(Enhancement::Original));
}
