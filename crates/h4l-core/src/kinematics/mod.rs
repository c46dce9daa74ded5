//! Lorentz four-vector algebra in the collider (pt, eta, phi, mass)
//! parametrization.

use crate::domain::Lepton;
use std::iter::Sum;
use std::ops::Add;

/// A four-momentum in Cartesian components.
///
/// Derived from exactly one lepton (or a sum of such vectors) and always
/// recomputed after sanitization, never cached across it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FourVector {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub energy: f64,
}

impl FourVector {
    pub fn from_pt_eta_phi_mass(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let energy = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self { px, py, pz, energy }
    }

    pub fn from_lepton(lepton: &Lepton) -> Self {
        Self::from_pt_eta_phi_mass(lepton.pt, lepton.eta, lepton.phi, lepton.mass)
    }

    /// Invariant mass `sqrt(E^2 - |p|^2)`.
    ///
    /// The radicand is clamped to zero so that small negative round-off does
    /// not turn into NaN; a genuinely non-finite result is reported as `None`
    /// so it can never leak into a mass comparison.
    pub fn invariant_mass(self) -> Option<f64> {
        let radicand =
            self.energy * self.energy - self.px * self.px - self.py * self.py - self.pz * self.pz;
        if !radicand.is_finite() {
            return None;
        }
        Some(radicand.max(0.0).sqrt())
    }
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            energy: self.energy + rhs.energy,
        }
    }
}

impl Sum for FourVector {
    fn sum<I: Iterator<Item = FourVector>>(iter: I) -> FourVector {
        iter.fold(FourVector::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::FourVector;

    const TOLERANCE: f64 = 1.0e-9;

    #[test]
    fn cartesian_components_follow_the_collider_parametrization() {
        let vector = FourVector::from_pt_eta_phi_mass(10.0, 0.0, 0.0, 0.0);
        assert!((vector.px - 10.0).abs() < TOLERANCE);
        assert!(vector.py.abs() < TOLERANCE);
        assert!(vector.pz.abs() < TOLERANCE);
        assert!((vector.energy - 10.0).abs() < TOLERANCE);

        let boosted = FourVector::from_pt_eta_phi_mass(10.0, 1.0, std::f64::consts::FRAC_PI_2, 0.5);
        assert!(boosted.px.abs() < TOLERANCE);
        assert!((boosted.py - 10.0).abs() < TOLERANCE);
        assert!((boosted.pz - 10.0 * 1.0_f64.sinh()).abs() < TOLERANCE);
        let expected_energy =
            (boosted.px.powi(2) + boosted.py.powi(2) + boosted.pz.powi(2) + 0.25).sqrt();
        assert!((boosted.energy - expected_energy).abs() < TOLERANCE);
    }

    #[test]
    fn single_vector_recovers_its_rest_mass() {
        let vector = FourVector::from_pt_eta_phi_mass(25.0, -1.3, 2.0, 0.105_658);
        let mass = vector.invariant_mass().expect("mass should be finite");
        assert!((mass - 0.105_658).abs() < 1.0e-6);
    }

    #[test]
    fn back_to_back_massless_pair_has_mass_twice_the_pt() {
        let a = FourVector::from_pt_eta_phi_mass(45.0, 0.0, 0.0, 0.0);
        let b = FourVector::from_pt_eta_phi_mass(45.0, 0.0, std::f64::consts::PI, 0.0);
        let mass = (a + b).invariant_mass().expect("mass should be finite");
        assert!((mass - 90.0).abs() < 1.0e-6);
    }

    #[test]
    fn round_off_radicand_is_clamped_to_zero() {
        // E^2 - |p|^2 is a tiny negative number here.
        let vector = FourVector {
            px: 3.0,
            py: 4.0,
            pz: 0.0,
            energy: 5.0 - 1.0e-13,
        };
        assert_eq!(vector.invariant_mass(), Some(0.0));
    }

    #[test]
    fn non_finite_components_yield_no_mass() {
        let vector = FourVector {
            px: f64::NAN,
            py: 0.0,
            pz: 0.0,
            energy: 1.0,
        };
        assert_eq!(vector.invariant_mass(), None);

        let overflow = FourVector {
            px: 0.0,
            py: 0.0,
            pz: 0.0,
            energy: f64::INFINITY,
        };
        assert_eq!(overflow.invariant_mass(), None);
    }

    #[test]
    fn sum_folds_component_wise_from_zero() {
        let vectors = [
            FourVector::from_pt_eta_phi_mass(10.0, 0.2, 0.3, 0.1),
            FourVector::from_pt_eta_phi_mass(20.0, -0.4, 1.7, 0.1),
            FourVector::from_pt_eta_phi_mass(5.0, 1.1, -2.2, 0.1),
        ];
        let total: FourVector = vectors.iter().copied().sum();
        let manual = vectors[0] + vectors[1] + vectors[2];
        assert_eq!(total, manual);
    }
}
