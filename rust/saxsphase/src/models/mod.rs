mod curve;
mod space_group;

pub use curve::{
    Curve,
    CurveSummary,
    MIN_CURVE_LEN,
};
pub use space_group::{
    CrystalSystem,
    MillerIndices,
    NUM_REFLECTIONS,
    SpaceGroup,
};
