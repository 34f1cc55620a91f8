pub mod analysis;
pub mod config;
pub mod detection;
pub mod engine;
pub mod enhancement;
pub mod errors;
pub mod io;
pub mod models;
pub mod peak_set;
pub mod utils;

pub use analysis::{
    ConfidenceRecord,
    CrystallographicRecord,
    Interpretation,
    PredictionRecord,
};
pub use config::EngineConfig;
pub use detection::{
    DetectionAlgorithm,
    DetectionParams,
    DetectionSuggestion,
};
pub use engine::{
    AnalysisReport,
    DetectionRun,
    Engine,
};
pub use enhancement::{
    Enhancement,
    EnhancementComparison,
};
pub use errors::{
    ErrorKind,
    Result,
    SaxsError,
};
pub use models::{
    CrystalSystem,
    Curve,
    CurveSummary,
    SpaceGroup,
};
pub use peak_set::PeakSet;
