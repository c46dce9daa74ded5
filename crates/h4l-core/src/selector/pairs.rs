//! SFOS pair enumeration over the leptons of one event.

use crate::domain::Lepton;
use crate::kinematics::FourVector;

/// A same-flavor opposite-sign lepton pair, ephemeral within one event's
/// evaluation. Indices are event-scoped positions into the lepton slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SfosPair {
    pub first: usize,
    pub second: usize,
    pub mass: f64,
    /// Absolute deviation of the pair mass from the nominal Z mass.
    pub z_deviation: f64,
}

impl SfosPair {
    pub fn shares_lepton(&self, other: &SfosPair) -> bool {
        self.first == other.first
            || self.first == other.second
            || self.second == other.first
            || self.second == other.second
    }
}

pub(crate) fn is_sfos(a: &Lepton, b: &Lepton) -> bool {
    a.flavor == b.flavor && i32::from(a.charge) * i32::from(b.charge) < 0
}

/// Enumerates the SFOS pairs among `indices`, in lexicographic (i, j) order.
///
/// The enumeration order is the documented tie-break for all downstream
/// strict-less-than minimizations, so it must stay deterministic. Pairs whose
/// combined mass comes out non-finite are discarded here.
pub(crate) fn sfos_pairs_among(
    indices: &[usize],
    leptons: &[Lepton],
    vectors: &[FourVector],
    nominal_z_mass: f64,
) -> Vec<SfosPair> {
    let mut pairs = Vec::new();
    for (position, &i) in indices.iter().enumerate() {
        for &j in &indices[position + 1..] {
            if !is_sfos(&leptons[i], &leptons[j]) {
                continue;
            }
            let Some(mass) = (vectors[i] + vectors[j]).invariant_mass() else {
                continue;
            };
            pairs.push(SfosPair {
                first: i,
                second: j,
                mass,
                z_deviation: (mass - nominal_z_mass).abs(),
            });
        }
    }
    pairs
}
