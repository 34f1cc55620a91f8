use super::prediction::PredictionRecord;
use crate::models::{
    CrystalSystem,
    Curve,
    MillerIndices,
    SpaceGroup,
};
use crate::utils::stats::{
    mean,
    sample_std_dev,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeParameters {
    pub a: f64,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

impl LatticeParameters {
    fn for_group(group: SpaceGroup, a: f64) -> Self {
        match group.crystal_system() {
            CrystalSystem::Lamellar => Self {
                a,
                b: None,
                c: None,
                alpha: None,
                beta: None,
                gamma: None,
            },
            CrystalSystem::Hexagonal => Self {
                a,
                b: Some(a),
                c: None,
                alpha: Some(90.0),
                beta: Some(90.0),
                gamma: Some(120.0),
            },
            CrystalSystem::Cubic => Self {
                a,
                b: Some(a),
                c: Some(a),
                alpha: Some(90.0),
                beta: Some(90.0),
                gamma: Some(90.0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UnitCellMetric {
    LayerSpacing(f64),
    CrossSectionArea(f64),
    Volume(f64),
}

impl UnitCellMetric {
    fn for_group(group: SpaceGroup, a: f64) -> Self {
        match group.crystal_system() {
            CrystalSystem::Lamellar => UnitCellMetric::LayerSpacing(a),
            CrystalSystem::Hexagonal => UnitCellMetric::CrossSectionArea(3.0f64.sqrt() / 2.0 * a * a),
            CrystalSystem::Cubic => UnitCellMetric::Volume(a.powi(3)),
        }
    }
}

/// Water/oil channel dimensions of the mesophase, in the unit of `a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelGeometry {
    Hexagonal {
        column_diameter: f64,
        inter_column_distance: f64,
        water_channel: f64,
    },
    Pn3m {
        water_channel: f64,
        oil_channel: f64,
        surface_density: f64,
    },
    Ia3d {
        water_channel: f64,
        oil_channel: f64,
        surface_density: f64,
        genus: u32,
    },
    Im3m {
        water_channel: f64,
        oil_channel: f64,
        surface_density: f64,
    },
}

impl ChannelGeometry {
    pub fn for_group(group: SpaceGroup, a: f64) -> Option<Self> {
        match group {
            SpaceGroup::Lamellar => None,
            SpaceGroup::Hexagonal => Some(ChannelGeometry::Hexagonal {
                column_diameter: 0.9 * a,
                inter_column_distance: a,
                water_channel: a - 0.9 * a,
            }),
            SpaceGroup::Pn3m => Some(ChannelGeometry::Pn3m {
                water_channel: 0.42 * a,
                oil_channel: 0.35 * a,
                surface_density: 2.35 / a,
            }),
            SpaceGroup::Ia3d => Some(ChannelGeometry::Ia3d {
                water_channel: 0.35 * a,
                oil_channel: 0.35 * a,
                surface_density: 3.09 / a,
                genus: 10,
            }),
            SpaceGroup::Im3m => Some(ChannelGeometry::Im3m {
                water_channel: 0.40 * a,
                oil_channel: 0.40 * a,
                surface_density: 2.0 / a,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakAssignment {
    pub k: usize,
    pub q: f64,
    pub d_spacing: f64,
    pub miller: String,
    pub matched: bool,
    /// Percentage of the intensity at the first matched peak.
    pub relative_intensity: Option<f64>,
    /// Lattice constant implied by this reflection alone.
    pub lattice_parameter: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeStatistics {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystallographicRecord {
    pub space_group: SpaceGroup,
    pub crystal_system: CrystalSystem,
    pub reference_q: f64,
    pub d_spacing: f64,
    pub lattice: LatticeParameters,
    pub unit_cell: UnitCellMetric,
    pub assignments: Vec<PeakAssignment>,
    pub statistics: Option<LatticeStatistics>,
    pub channels: Option<ChannelGeometry>,
}

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

/// Derives lattice and channel parameters from a prediction annotated with
/// its matches. Intensities are sampled on `curve`.
pub fn derive(prediction: &PredictionRecord, curve: &Curve) -> CrystallographicRecord {
    let group = prediction.space_group;
    let q1 = prediction.reference_q;
    let a = group.lattice_constant(q1);

    let reference_intensity = prediction
        .peaks
        .iter()
        .find_map(|p| p.matched_q)
        .map(|q| curve.intensity_at(q));

    let assignments: Vec<PeakAssignment> = prediction
        .peaks
        .iter()
        .map(|p| {
            let q = p.matched_q.unwrap_or(p.q_predicted);
            let d = 2.0 * PI / q;
            let lattice_parameter = group
                .miller(p.k)
                .as_ref()
                .and_then(|m: &MillerIndices| group.lattice_from_reflection(d, m));
            let relative_intensity = match (p.matched_q, reference_intensity) {
                (Some(mq), Some(i_ref)) if i_ref > 0.0 => {
                    finite(100.0 * curve.intensity_at(mq) / i_ref)
                }
                _ => None,
            };
            PeakAssignment {
                k: p.k,
                q,
                d_spacing: d,
                miller: p.miller.clone(),
                matched: p.matched_q.is_some(),
                relative_intensity,
                lattice_parameter,
            }
        })
        .collect();

    let matched_lattice: Vec<f64> = assignments
        .iter()
        .filter(|a| a.matched)
        .filter_map(|a| a.lattice_parameter)
        .collect();
    let statistics = sample_std_dev(&matched_lattice).map(|std_dev| LatticeStatistics {
        n: matched_lattice.len(),
        mean: mean(&matched_lattice),
        std_dev,
    });

    CrystallographicRecord {
        space_group: group,
        crystal_system: group.crystal_system(),
        reference_q: q1,
        d_spacing: 2.0 * PI / q1,
        lattice: LatticeParameters::for_group(group, a),
        unit_cell: UnitCellMetric::for_group(group, a),
        assignments,
        statistics,
        channels: ChannelGeometry::for_group(group, a),
    }
}
