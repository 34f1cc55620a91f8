//! The analysis orchestrator.
//!
//! [`Engine`] owns every piece of session state: the loaded curve, its
//! trimmed and enhanced working copy, the peak set, the reference peak, the
//! chosen space group and count, and the latest analysis records. Records are
//! computed on demand and cached; every mutation drops the caches that depend
//! on it.

use crate::analysis::{
    self,
    ConfidenceRecord,
    CrystallographicRecord,
    PredictionRecord,
};
use crate::config::EngineConfig;
use crate::detection::{
    self,
    DetectionAlgorithm,
    DetectionParams,
    DetectionSuggestion,
};
use crate::enhancement::{
    self,
    Enhancement,
    EnhancementComparison,
};
use crate::errors::{
    Result,
    SaxsError,
};
use crate::io;
use crate::models::{
    Curve,
    CurveSummary,
    SpaceGroup,
};
use crate::peak_set::PeakSet;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::Path;
use tracing::{
    debug,
    info,
    instrument,
};

/// The detector settings that produced the current auto peaks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRun {
    pub algorithm: DetectionAlgorithm,
    pub params: DetectionParams,
}

/// Everything worth persisting about a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub curve: CurveSummary,
    pub enhancement: Enhancement,
    pub detection: Option<DetectionRun>,
    pub detected_peaks: Vec<f64>,
    pub manual_peaks: Vec<f64>,
    pub analysis_peaks: Vec<f64>,
    pub prediction: Option<PredictionRecord>,
    pub confidence: Option<ConfidenceRecord>,
    pub crystallography: Option<CrystallographicRecord>,
    pub ranking: Option<Vec<ConfidenceRecord>>,
}

#[derive(Debug, Clone)]
struct LoadedCurve {
    raw: Curve,
    /// `raw` restricted to the trim window.
    base: Curve,
    /// `base` after enhancement; everything downstream reads this one.
    working: Curve,
    peaks: PeakSet,
}

#[derive(Debug, Clone, Default)]
struct Records {
    prediction: Option<PredictionRecord>,
    confidence: Option<ConfidenceRecord>,
    crystallography: Option<CrystallographicRecord>,
    ranking: Option<Vec<ConfidenceRecord>>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    curve: Option<LoadedCurve>,
    enhancement: Enhancement,
    comparison: Option<EnhancementComparison>,
    detection: Option<DetectionRun>,
    reference: Option<f64>,
    space_group: Option<SpaceGroup>,
    count: usize,
    records: Records,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            curve: None,
            enhancement: Enhancement::Original,
            comparison: None,
            detection: None,
            reference: None,
            space_group: None,
            count: config.default_count,
            records: Records::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn loaded(&self) -> Result<&LoadedCurve> {
        self.curve
            .as_ref()
            .ok_or_else(|| SaxsError::input_invalid("no curve has been loaded"))
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedCurve> {
        self.curve
            .as_mut()
            .ok_or_else(|| SaxsError::input_invalid("no curve has been loaded"))
    }

    fn invalidate_records(&mut self) {
        self.records = Records::default();
    }

    fn new_peak_set(&self, curve: &Curve) -> PeakSet {
        PeakSet::with_tolerances(
            curve.q_range(),
            self.config.duplicate_tolerance,
            self.config.click_tolerance,
        )
    }

    /// Replaces the curve and resets every piece of derived state.
    pub fn load(&mut self, curve: Curve) -> CurveSummary {
        let summary = curve.summary();
        info!(
            "Loaded curve with {} samples, q in [{:.5}, {:.5}]",
            summary.num_points, summary.q_min, summary.q_max
        );
        let peaks = self.new_peak_set(&curve);
        self.curve = Some(LoadedCurve {
            raw: curve.clone(),
            base: curve.clone(),
            working: curve,
            peaks,
        });
        self.enhancement = Enhancement::Original;
        self.comparison = None;
        self.detection = None;
        self.reference = None;
        self.invalidate_records();
        summary
    }

    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<CurveSummary> {
        let curve = io::read_curve(path)?;
        Ok(self.load(curve))
    }

    pub fn curve(&self) -> Option<&Curve> {
        self.curve.as_ref().map(|c| &c.working)
    }

    pub fn summary(&self) -> Result<CurveSummary> {
        Ok(self.loaded()?.working.summary())
    }

    /// Restricts the analysis to `[q_min, q_max]` of the loaded curve.
    ///
    /// Enhancement, peaks and records are reset; the reference survives.
    pub fn trim(&mut self, q_min: f64, q_max: f64) -> Result<CurveSummary> {
        let trimmed = self.loaded()?.raw.trim(q_min, q_max)?;
        let summary = trimmed.summary();
        let peaks = self.new_peak_set(&trimmed);
        let loaded = self.loaded_mut()?;
        loaded.base = trimmed.clone();
        loaded.working = trimmed;
        loaded.peaks = peaks;
        self.enhancement = Enhancement::Original;
        self.comparison = None;
        self.detection = None;
        self.invalidate_records();
        info!(
            "Trimmed to [{:.5}, {:.5}], {} samples remain",
            summary.q_min, summary.q_max, summary.num_points
        );
        Ok(summary)
    }

    pub fn enhancement(&self) -> Enhancement {
        self.enhancement
    }

    /// Applies `enhancement` to the trimmed curve.
    pub fn enhance(&mut self, enhancement: Enhancement) -> Result<()> {
        let out = enhancement.apply_to_curve(&self.loaded()?.base)?;
        self.loaded_mut()?.working = out;
        self.enhancement = enhancement;
        self.invalidate_records();
        info!("Applied enhancement: {}", enhancement);
        Ok(())
    }

    /// Scores every enhancement on the trimmed curve.
    pub fn compare_enhancements(&mut self) -> Result<&EnhancementComparison> {
        let comparison = enhancement::compare_all(&self.loaded()?.base);
        Ok(&*self.comparison.insert(comparison))
    }

    /// Applies the best-scoring enhancement and returns it.
    pub fn enhance_best(&mut self) -> Result<Enhancement> {
        let best = self
            .compare_enhancements()?
            .best
            .unwrap_or(Enhancement::Original);
        self.enhance(best)?;
        Ok(best)
    }

    pub fn comparison(&self) -> Option<&EnhancementComparison> {
        self.comparison.as_ref()
    }

    pub fn suggest_detection(&self) -> Result<DetectionSuggestion> {
        Ok(detection::suggest(&self.loaded()?.working, self.space_group))
    }

    /// Runs a detector on the working curve and replaces the auto peaks.
    #[instrument(skip(self))]
    pub fn detect(&mut self, params: DetectionParams, algorithm: DetectionAlgorithm) -> Result<&[f64]> {
        let working = &self.loaded()?.working;
        let found = detection::detect_peaks(working.q(), working.intensity(), &params, algorithm)?;
        info!("Detected {} peaks with the {} detector", found.len(), algorithm);
        self.detection = Some(DetectionRun { algorithm, params });
        self.invalidate_records();
        let loaded = self.loaded_mut()?;
        loaded.peaks.set_auto(found);
        Ok(loaded.peaks.auto())
    }

    /// Detects with the suggested parameters, or with `algorithm` when given.
    pub fn detect_suggested(&mut self, algorithm: Option<DetectionAlgorithm>) -> Result<&[f64]> {
        let suggestion = self.suggest_detection()?;
        self.detect(suggestion.params, algorithm.unwrap_or(suggestion.algorithm))
    }

    pub fn peaks(&self) -> Result<&PeakSet> {
        Ok(&self.loaded()?.peaks)
    }

    fn edit_peaks<T>(&mut self, edit: impl FnOnce(&mut PeakSet) -> T) -> Result<T> {
        let out = edit(&mut self.loaded_mut()?.peaks);
        self.invalidate_records();
        Ok(out)
    }

    /// Adds a manual peak; `false` when it duplicates an existing one.
    pub fn add_manual(&mut self, q: f64) -> Result<bool> {
        self.edit_peaks(|p| p.add_manual(q))?
    }

    pub fn remove_manual(&mut self, q: f64) -> Result<Option<f64>> {
        self.edit_peaks(|p| p.remove_manual_near(q))
    }

    pub fn clear_manual(&mut self) -> Result<()> {
        self.edit_peaks(PeakSet::clear_manual)
    }

    pub fn merge_manual(&mut self) -> Result<()> {
        self.edit_peaks(PeakSet::merge)
    }

    pub fn toggle_select(&mut self, q: f64) -> Result<Option<(f64, bool)>> {
        self.edit_peaks(|p| p.toggle_selection(q))
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.edit_peaks(PeakSet::select_all)
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.edit_peaks(PeakSet::clear_selection)
    }

    pub fn disable_selection(&mut self) -> Result<()> {
        self.edit_peaks(PeakSet::disable_selection)
    }

    pub fn reference(&self) -> Option<f64> {
        self.reference
    }

    pub fn set_reference(&mut self, q: f64) -> Result<()> {
        if !q.is_finite() || q <= 0.0 {
            return Err(SaxsError::out_of_domain(
                "reference_q",
                q,
                "a finite positive scattering vector",
            ));
        }
        self.reference = Some(q);
        self.invalidate_records();
        debug!("Reference peak set to {:.5}", q);
        Ok(())
    }

    pub fn clear_reference(&mut self) {
        self.reference = None;
        self.invalidate_records();
    }

    pub fn space_group(&self) -> Option<SpaceGroup> {
        self.space_group
    }

    pub fn set_space_group(&mut self, group: SpaceGroup) {
        self.space_group = Some(group);
        self.invalidate_records();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) -> Result<()> {
        if !(analysis::MIN_PREDICTIONS..=analysis::MAX_PREDICTIONS).contains(&count) {
            return Err(SaxsError::out_of_domain(
                "count",
                count,
                "an integer between 5 and 10",
            ));
        }
        self.count = count;
        self.invalidate_records();
        Ok(())
    }

    /// Peaks the phase analysis runs on, checked for scoring.
    ///
    /// An active but empty selection is `RANGE_EMPTY`; fewer peaks than the
    /// configured minimum is `INSUFFICIENT_PEAKS`.
    pub fn analysis_peaks(&self) -> Result<&[f64]> {
        let loaded = self.loaded()?;
        let peaks = loaded.peaks.peaks_for_analysis();
        if loaded.peaks.is_selecting() && peaks.is_empty() {
            return Err(SaxsError::RangeEmpty {
                q_min: loaded.working.q_min(),
                q_max: loaded.working.q_max(),
                context: "(the peak selection is empty)".to_string(),
            });
        }
        if peaks.len() < self.config.min_analysis_peaks {
            return Err(SaxsError::InsufficientPeaks {
                found: peaks.len(),
                required: self.config.min_analysis_peaks,
            });
        }
        Ok(peaks)
    }

    fn require_reference(&self) -> Result<f64> {
        self.reference.ok_or(SaxsError::NoReference)
    }

    fn require_space_group(&self) -> Result<SpaceGroup> {
        self.space_group
            .ok_or_else(|| SaxsError::input_invalid("no space group has been selected"))
    }

    fn raw_prediction(&self) -> Result<PredictionRecord> {
        let q1 = self.require_reference()?;
        let group = self.require_space_group()?;
        let working = &self.loaded()?.working;
        analysis::predict(q1, group, self.count, working.q_min(), working.q_max())
    }

    /// Predicted reflections annotated with their matches among the
    /// analysis peaks.
    pub fn predict(&mut self) -> Result<&PredictionRecord> {
        if self.records.prediction.is_none() {
            let raw = self.raw_prediction()?;
            let tolerance = self.config.match_tolerance * raw.q_range();
            let matches = analysis::match_peaks(
                &raw,
                self.loaded()?.peaks.peaks_for_analysis(),
                tolerance,
            );
            self.records.prediction = Some(raw.with_matches(&matches));
        }
        self.records
            .prediction
            .as_ref()
            .ok_or(SaxsError::NoReference)
    }

    #[instrument(skip(self))]
    pub fn confidence(&mut self) -> Result<&ConfidenceRecord> {
        if self.records.confidence.is_none() {
            let raw = self.raw_prediction()?;
            let detected = self.analysis_peaks()?;
            let record = analysis::evaluate(&raw, detected, self.config.match_tolerance);
            info!(
                "{} confidence {:.3} ({})",
                record.space_group, record.score, record.interpretation
            );
            self.records.prediction = Some(raw.with_matches(&record.matches));
            self.records.confidence = Some(record);
        }
        self.records
            .confidence
            .as_ref()
            .ok_or(SaxsError::NoReference)
    }

    /// Ranks all five space groups against the current reference.
    pub fn score_all(&mut self) -> Result<&[ConfidenceRecord]> {
        if self.records.ranking.is_none() {
            let q1 = self.require_reference()?;
            let working = &self.loaded()?.working;
            let (q_min, q_max) = (working.q_min(), working.q_max());
            let detected = self.analysis_peaks()?;
            let ranking = analysis::score_all(
                detected,
                q1,
                self.count,
                q_min,
                q_max,
                self.config.match_tolerance,
            )?;
            self.records.ranking = Some(ranking);
        }
        Ok(self.records.ranking.as_deref().unwrap_or_default())
    }

    pub fn crystallography(&mut self) -> Result<&CrystallographicRecord> {
        if self.records.crystallography.is_none() {
            self.confidence()?;
            let prediction = self
                .records
                .prediction
                .as_ref()
                .ok_or(SaxsError::NoReference)?;
            let record = analysis::derive(prediction, &self.loaded()?.working);
            info!(
                "{} lattice constant a = {:.3}",
                record.space_group, record.lattice.a
            );
            self.records.crystallography = Some(record);
        }
        self.records
            .crystallography
            .as_ref()
            .ok_or(SaxsError::NoReference)
    }

    /// Snapshot of the session with whatever records have been computed.
    pub fn report(&self) -> Result<AnalysisReport> {
        let loaded = self.loaded()?;
        Ok(AnalysisReport {
            curve: loaded.working.summary(),
            enhancement: self.enhancement,
            detection: self.detection,
            detected_peaks: loaded.peaks.auto().to_vec(),
            manual_peaks: loaded.peaks.manual().to_vec(),
            analysis_peaks: loaded.peaks.peaks_for_analysis().to_vec(),
            prediction: self.records.prediction.clone(),
            confidence: self.records.confidence.clone(),
            crystallography: self.records.crystallography.clone(),
            ranking: self.records.ranking.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn lamellar_curve() -> Curve {
        let q: Vec<f64> = (1..=550).map(|i| i as f64 * 0.001).collect();
        let intensity = q
            .iter()
            .map(|x| {
                2.0 + (1..=5)
                    .map(|k| {
                        let c = 0.1 * k as f64;
                        (200.0 / k as f64) * (-((x - c) / 0.003).powi(2)).exp()
                    })
                    .sum::<f64>()
            })
            .collect();
        Curve::try_new(q, intensity).unwrap()
    }

    fn engine_with_peaks() -> Engine {
        let mut engine = Engine::default();
        engine.load(lamellar_curve());
        engine
            .detect(
                DetectionParams {
                    width_max: 30,
                    ..DetectionParams::default()
                },
                DetectionAlgorithm::Standard,
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_requires_curve() {
        let mut engine = Engine::default();
        assert_eq!(engine.trim(0.1, 0.2).unwrap_err().kind(), ErrorKind::InputInvalid);
        assert_eq!(engine.add_manual(0.1).unwrap_err().kind(), ErrorKind::InputInvalid);
        assert!(engine.report().is_err());
    }

    #[test]
    fn test_detect_and_score() {
        let mut engine = engine_with_peaks();
        assert_eq!(engine.peaks().unwrap().auto().len(), 5);
        engine.set_reference(0.1).unwrap();
        engine.set_space_group(SpaceGroup::Lamellar);
        let conf = engine.confidence().unwrap();
        assert_eq!(conf.matched_count, 5);
        assert!(conf.score > 0.99);

        let prediction = engine.predict().unwrap();
        assert!(prediction.peaks.iter().all(|p| p.matched_q.is_some()));

        let ranking = engine.score_all().unwrap();
        assert_eq!(ranking.len(), 5);
        assert_eq!(ranking[0].space_group, SpaceGroup::Lamellar);

        let crystal = engine.crystallography().unwrap();
        assert!((crystal.lattice.a - 62.83).abs() < 0.1);
    }

    #[test]
    fn test_missing_state_errors() {
        let mut engine = engine_with_peaks();
        engine.set_space_group(SpaceGroup::Lamellar);
        assert_eq!(engine.confidence().unwrap_err().kind(), ErrorKind::NoReference);
        engine.set_reference(0.1).unwrap();

        engine.clear_selection().unwrap();
        assert_eq!(engine.confidence().unwrap_err().kind(), ErrorKind::RangeEmpty);

        engine.toggle_select(0.1).unwrap();
        assert_eq!(
            engine.confidence().unwrap_err().kind(),
            ErrorKind::InsufficientPeaks
        );

        assert_eq!(engine.set_count(4).unwrap_err().kind(), ErrorKind::OutOfDomain);
        assert_eq!(engine.set_count(11).unwrap_err().kind(), ErrorKind::OutOfDomain);
        assert!(engine.set_count(10).is_ok());
        assert_eq!(
            engine.set_reference(-0.1).unwrap_err().kind(),
            ErrorKind::OutOfDomain
        );
    }

    #[test]
    fn test_invalidation() {
        let mut engine = engine_with_peaks();
        engine.set_reference(0.1).unwrap();
        engine.set_space_group(SpaceGroup::Lamellar);
        engine.confidence().unwrap();
        assert!(engine.report().unwrap().confidence.is_some());

        engine.set_space_group(SpaceGroup::Hexagonal);
        assert!(engine.report().unwrap().confidence.is_none());

        engine.confidence().unwrap();
        engine.add_manual(0.25).unwrap();
        assert!(engine.report().unwrap().confidence.is_none());

        engine.trim(0.05, 0.45).unwrap();
        let report = engine.report().unwrap();
        assert!(report.detected_peaks.is_empty());
        assert!(report.manual_peaks.is_empty());
        assert_eq!(engine.reference(), Some(0.1));

        engine.load(lamellar_curve());
        assert_eq!(engine.reference(), None);
    }

    #[test]
    fn test_repeated_reference_is_stable() {
        let mut engine = engine_with_peaks();
        engine.set_space_group(SpaceGroup::Hexagonal);
        engine.set_reference(0.1).unwrap();
        let first = serde_json::to_string(engine.predict().unwrap()).unwrap();
        engine.set_reference(0.1).unwrap();
        let second = serde_json::to_string(engine.predict().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_enhance_original_is_identity() {
        let mut engine = Engine::default();
        let curve = lamellar_curve();
        engine.load(curve.clone());
        engine.enhance(Enhancement::BayesianSmoothed).unwrap();
        engine.enhance(Enhancement::Original).unwrap();
        assert_eq!(engine.curve().unwrap(), &curve);
        let best = engine.enhance_best().unwrap();
        assert_eq!(engine.enhancement(), best);
        assert!(engine.comparison().is_some());
    }
}
