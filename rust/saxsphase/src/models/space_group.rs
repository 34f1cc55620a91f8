use crate::errors::SaxsError;
use arrayvec::ArrayVec;
use serde::{
    Deserialize,
    Serialize,
};
use std::f64::consts::PI;
use std::fmt::Display;
use std::str::FromStr;

/// Number of tabulated reflections per space group.
pub const NUM_REFLECTIONS: usize = 10;

/// Mesophase symmetry candidates, in listing order.
///
/// The listing order matters: it breaks ties when ranking confidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceGroup {
    Lamellar,
    Hexagonal,
    Pn3m,
    Ia3d,
    Im3m,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrystalSystem {
    /// One-dimensional stack of layers.
    Lamellar,
    /// Two-dimensional hexagonal packing of cylinders.
    Hexagonal,
    Cubic,
}

/// Miller indices of one reflection: `(l)` stacks carry `(0 0 l)`,
/// hexagonal reflections carry `(h k)`, cubic ones `(h k l)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MillerIndices(ArrayVec<u32, 3>);

impl MillerIndices {
    pub fn new(indices: &[u32]) -> Option<Self> {
        ArrayVec::try_from(indices).ok().map(Self)
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }
}

impl Display for MillerIndices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Multi-digit indices need separators to stay unambiguous.
        let sep = if self.0.iter().any(|&i| i >= 10) { " " } else { "" };
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "({})", parts.join(sep))
    }
}

const LAMELLAR_HKL: [&[u32]; NUM_REFLECTIONS] = [
    &[0, 0, 1],
    &[0, 0, 2],
    &[0, 0, 3],
    &[0, 0, 4],
    &[0, 0, 5],
    &[0, 0, 6],
    &[0, 0, 7],
    &[0, 0, 8],
    &[0, 0, 9],
    &[0, 0, 10],
];

const HEXAGONAL_HK: [&[u32]; NUM_REFLECTIONS] = [
    &[1, 0],
    &[1, 1],
    &[2, 0],
    &[2, 1],
    &[3, 0],
    &[2, 2],
    &[3, 1],
    &[4, 0],
    &[3, 2],
    &[4, 1],
];

const PN3M_HKL: [&[u32]; NUM_REFLECTIONS] = [
    &[1, 1, 0],
    &[1, 1, 1],
    &[2, 0, 0],
    &[2, 1, 1],
    &[2, 2, 0],
    &[3, 1, 0],
    &[3, 1, 1],
    &[2, 2, 2],
    &[3, 2, 1],
    &[4, 0, 0],
];

const IA3D_HKL: [&[u32]; NUM_REFLECTIONS] = [
    &[2, 1, 1],
    &[2, 2, 0],
    &[3, 2, 1],
    &[4, 0, 0],
    &[3, 3, 2],
    &[4, 2, 2],
    &[4, 3, 1],
    &[5, 2, 1],
    &[4, 4, 0],
    &[5, 3, 2],
];

const IM3M_HKL: [&[u32]; NUM_REFLECTIONS] = [
    &[1, 1, 0],
    &[2, 0, 0],
    &[2, 1, 1],
    &[2, 2, 0],
    &[3, 1, 0],
    &[2, 2, 2],
    &[3, 2, 1],
    &[4, 0, 0],
    &[4, 1, 1],
    &[4, 2, 0],
];

impl SpaceGroup {
    pub const ALL: [SpaceGroup; 5] = [
        SpaceGroup::Lamellar,
        SpaceGroup::Hexagonal,
        SpaceGroup::Pn3m,
        SpaceGroup::Ia3d,
        SpaceGroup::Im3m,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceGroup::Lamellar => "lamellar",
            SpaceGroup::Hexagonal => "hexagonal",
            SpaceGroup::Pn3m => "pn3m",
            SpaceGroup::Ia3d => "ia3d",
            SpaceGroup::Im3m => "im3m",
        }
    }

    pub fn crystal_system(&self) -> CrystalSystem {
        match self {
            SpaceGroup::Lamellar => CrystalSystem::Lamellar,
            SpaceGroup::Hexagonal => CrystalSystem::Hexagonal,
            SpaceGroup::Pn3m | SpaceGroup::Ia3d | SpaceGroup::Im3m => CrystalSystem::Cubic,
        }
    }

    fn miller_table(&self) -> &'static [&'static [u32]; NUM_REFLECTIONS] {
        match self {
            SpaceGroup::Lamellar => &LAMELLAR_HKL,
            SpaceGroup::Hexagonal => &HEXAGONAL_HK,
            SpaceGroup::Pn3m => &PN3M_HKL,
            SpaceGroup::Ia3d => &IA3D_HKL,
            SpaceGroup::Im3m => &IM3M_HKL,
        }
    }

    /// Miller indices of the `k`-th allowed reflection.
    pub fn miller(&self, k: usize) -> Option<MillerIndices> {
        self.miller_table().get(k).and_then(|m| MillerIndices::new(m))
    }

    /// Squared reciprocal-space length of a reflection in units of the
    /// lattice's reciprocal basis, `None` when the arity does not fit the
    /// crystal system.
    pub fn reflection_metric(&self, miller: &MillerIndices) -> Option<f64> {
        match (self.crystal_system(), miller.indices()) {
            (CrystalSystem::Lamellar, &[_, _, l]) => Some((l as f64).powi(2)),
            (CrystalSystem::Hexagonal, &[h, k]) => {
                let (h, k) = (h as f64, k as f64);
                Some(h * h + h * k + k * k)
            }
            (CrystalSystem::Cubic, &[h, k, l]) => {
                let (h, k, l) = (h as f64, k as f64, l as f64);
                Some(h * h + k * k + l * l)
            }
            _ => None,
        }
    }

    /// Position of the `k`-th reflection relative to the first one.
    pub fn ratio(&self, k: usize) -> Option<f64> {
        let first = self.miller(0)?;
        let kth = self.miller(k)?;
        let s0 = self.reflection_metric(&first)?;
        let sk = self.reflection_metric(&kth)?;
        Some((sk / s0).sqrt())
    }

    pub fn ratios(&self) -> Vec<f64> {
        (0..NUM_REFLECTIONS).filter_map(|k| self.ratio(k)).collect()
    }

    /// Lattice constant from the first-order reflection position `q1`.
    pub fn lattice_constant(&self, q1: f64) -> f64 {
        match self {
            SpaceGroup::Lamellar => 2.0 * PI / q1,
            SpaceGroup::Hexagonal => 4.0 * PI / (3.0f64.sqrt() * q1),
            SpaceGroup::Pn3m | SpaceGroup::Im3m => 2.0 * PI * 2.0f64.sqrt() / q1,
            SpaceGroup::Ia3d => 2.0 * PI * 6.0f64.sqrt() / q1,
        }
    }

    /// Lattice value implied by a single reflection of spacing `d`, that is
    /// `d` times the square root of the reflection metric.
    ///
    /// For hexagonal reflections this is `d * sqrt(h^2 + hk + k^2)`, which
    /// agrees across reflections but sits a factor `sqrt(3)/2` below
    /// [`SpaceGroup::lattice_constant`].
    ///
    /// Returns `None` when the indices do not fit the crystal system or the
    /// arithmetic degenerates.
    pub fn lattice_from_reflection(&self, d: f64, miller: &MillerIndices) -> Option<f64> {
        let s = self.reflection_metric(miller)?;
        let a = d * s.sqrt();
        (a.is_finite() && a > 0.0).then_some(a)
    }
}

impl Display for SpaceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceGroup {
    type Err = SaxsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SpaceGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| {
                SaxsError::out_of_domain(
                    "space_group",
                    s,
                    "one of lamellar, hexagonal, pn3m, ia3d, im3m",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ratios(group: SpaceGroup, expected: &[f64]) {
        let ratios = group.ratios();
        assert_eq!(ratios.len(), NUM_REFLECTIONS);
        for (k, (got, want)) in ratios.iter().zip(expected.iter()).enumerate() {
            assert!(
                (got - want).abs() < 1e-12,
                "{} ratio {}: {} vs {}",
                group,
                k,
                got,
                want
            );
        }
    }

    #[test]
    fn test_ratio_tables() {
        let s = |x: f64| x.sqrt();
        assert_ratios(
            SpaceGroup::Lamellar,
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        );
        assert_ratios(
            SpaceGroup::Hexagonal,
            &[1.0, s(3.0), 2.0, s(7.0), 3.0, s(12.0), s(13.0), 4.0, s(19.0), s(21.0)],
        );
        assert_ratios(
            SpaceGroup::Pn3m,
            &[1.0, s(1.5), s(2.0), s(3.0), 2.0, s(5.0), s(5.5), s(6.0), s(7.0), s(8.0)],
        );
        assert_ratios(
            SpaceGroup::Im3m,
            &[1.0, s(2.0), s(3.0), 2.0, s(5.0), s(6.0), s(7.0), s(8.0), 3.0, s(10.0)],
        );
        let ia3d = SpaceGroup::Ia3d.ratios();
        assert!((ia3d[1] - s(4.0 / 3.0)).abs() < 1e-12);
        assert!((ia3d[3] - s(8.0 / 3.0)).abs() < 1e-12);
        assert!((ia3d[5] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratios_increase() {
        for group in SpaceGroup::ALL {
            let ratios = group.ratios();
            assert_eq!(ratios[0], 1.0);
            assert!(ratios.windows(2).all(|w| w[1] > w[0]), "{}", group);
        }
    }

    #[test]
    fn test_miller_labels() {
        assert_eq!(SpaceGroup::Pn3m.miller(0).unwrap().to_string(), "(110)");
        assert_eq!(SpaceGroup::Hexagonal.miller(1).unwrap().to_string(), "(11)");
        assert_eq!(SpaceGroup::Lamellar.miller(9).unwrap().to_string(), "(0 0 10)");
        assert!(SpaceGroup::Im3m.miller(10).is_none());
    }

    #[test]
    fn test_lattice_constant_matches_first_reflection() {
        let q1 = 0.1;
        let d1 = 2.0 * PI / q1;
        for group in SpaceGroup::ALL
            .into_iter()
            .filter(|g| *g != SpaceGroup::Hexagonal)
        {
            let first = group.miller(0).unwrap();
            let from_reflection = group.lattice_from_reflection(d1, &first).unwrap();
            let a = group.lattice_constant(q1);
            assert!((a - from_reflection).abs() < 1e-9, "{}: {} vs {}", group, a, from_reflection);
        }
        assert!((SpaceGroup::Lamellar.lattice_constant(0.1) - 62.83185307).abs() < 1e-6);
        assert!((SpaceGroup::Hexagonal.lattice_constant(0.05) - 145.1).abs() < 0.1);
    }

    #[test]
    fn test_hexagonal_reflection_lattice() {
        let group = SpaceGroup::Hexagonal;
        let q1 = 0.05;
        let d1 = 2.0 * PI / q1;
        let first = group.miller(0).unwrap();
        let a10 = group.lattice_from_reflection(d1, &first).unwrap();
        assert!((a10 - 125.664).abs() < 1e-3, "{}", a10);

        // (11) at sqrt(3) q1 gives the same value.
        let second = group.miller(1).unwrap();
        let d2 = 2.0 * PI / (3f64.sqrt() * q1);
        let a11 = group.lattice_from_reflection(d2, &second).unwrap();
        assert!((a11 - a10).abs() < 1e-9);
        assert!((group.lattice_constant(q1) * 3f64.sqrt() / 2.0 - a10).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let hk = MillerIndices::new(&[1, 1]).unwrap();
        assert!(SpaceGroup::Pn3m.lattice_from_reflection(10.0, &hk).is_none());
        let hkl = MillerIndices::new(&[1, 1, 0]).unwrap();
        assert!(SpaceGroup::Hexagonal.lattice_from_reflection(10.0, &hkl).is_none());
        assert!(MillerIndices::new(&[1, 2, 3, 4]).is_none());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Pn3m".parse::<SpaceGroup>().unwrap(), SpaceGroup::Pn3m);
        assert_eq!(" hexagonal ".parse::<SpaceGroup>().unwrap(), SpaceGroup::Hexagonal);
        let err = "fd3m".parse::<SpaceGroup>().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::OutOfDomain);
    }
}
