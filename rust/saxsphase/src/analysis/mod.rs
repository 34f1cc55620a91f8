//! Phase analysis: predicted reflections, confidence scoring and
//! crystallographic derivation.

pub mod confidence;
pub mod crystallography;
pub mod prediction;

pub use confidence::{
    ConfidenceRecord,
    Interpretation,
    MATCH_TOLERANCE,
    PeakMatch,
    evaluate,
    match_peaks,
    score_all,
};
pub use crystallography::{
    ChannelGeometry,
    CrystallographicRecord,
    LatticeParameters,
    LatticeStatistics,
    PeakAssignment,
    UnitCellMetric,
    derive,
};
pub use prediction::{
    MAX_PREDICTIONS,
    MIN_PREDICTIONS,
    PredictedPeak,
    PredictionRecord,
    predict,
};
