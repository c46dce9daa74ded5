//! Per-lepton quality cuts and the kinematic sanitization pass.
//!
//! Both passes are pure: they take a lepton sequence and return the surviving
//! subsequence plus per-stage rejection counters. Rejected rows are counted
//! and logged, never raised as errors.

use crate::common::constants::MASS_FALLBACK_GEV;
use crate::common::SelectionConfig;
use crate::domain::Lepton;
use tracing::debug;

/// Per-stage accounting for one filter + sanitization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterDiagnostics {
    pub input: usize,
    pub rejected_pt: usize,
    pub rejected_eta: usize,
    pub rejected_iso: usize,
    pub rejected_id: usize,
    /// Negative masses clamped to the fallback value, rows retained.
    pub corrected_mass: usize,
    /// Rows dropped for non-finite kinematics or pt <= 0 after correction.
    pub rejected_invalid: usize,
    pub retained: usize,
}

/// Applies the kinematic, acceptance, isolation, and (MC only)
/// identification cuts, in that order.
pub fn apply_quality_cuts(
    leptons: &[Lepton],
    config: &SelectionConfig,
) -> (Vec<Lepton>, FilterDiagnostics) {
    let mut diagnostics = FilterDiagnostics {
        input: leptons.len(),
        ..FilterDiagnostics::default()
    };

    let mut surviving = Vec::with_capacity(leptons.len());
    for lepton in leptons {
        if !(lepton.pt > config.pt_min) {
            diagnostics.rejected_pt += 1;
            continue;
        }
        if !(lepton.eta.abs() < config.eta_max) {
            diagnostics.rejected_eta += 1;
            continue;
        }
        if !(lepton.iso < config.iso_max) {
            diagnostics.rejected_iso += 1;
            continue;
        }
        if let Some(required) = config.id_passed {
            if lepton.id != Some(required) {
                diagnostics.rejected_id += 1;
                continue;
            }
        }
        surviving.push(*lepton);
    }

    diagnostics.retained = surviving.len();
    debug!(
        input = diagnostics.input,
        rejected_pt = diagnostics.rejected_pt,
        rejected_eta = diagnostics.rejected_eta,
        rejected_iso = diagnostics.rejected_iso,
        rejected_id = diagnostics.rejected_id,
        retained = diagnostics.retained,
        "quality cuts applied"
    );
    (surviving, diagnostics)
}

/// Repairs negative reconstructed masses, then drops rows whose kinematics
/// are still unusable.
///
/// The negative-mass clamp is a physics-defect correction, not a deletion:
/// the row stays unless a field is non-finite or pt is non-positive.
pub fn sanitize_kinematics(
    leptons: Vec<Lepton>,
    diagnostics: &mut FilterDiagnostics,
) -> Vec<Lepton> {
    let mut cleaned = Vec::with_capacity(leptons.len());
    for mut lepton in leptons {
        if lepton.mass < 0.0 {
            lepton.mass = MASS_FALLBACK_GEV;
            diagnostics.corrected_mass += 1;
        }
        let finite = lepton.pt.is_finite()
            && lepton.eta.is_finite()
            && lepton.phi.is_finite()
            && lepton.mass.is_finite();
        if !finite || lepton.pt <= 0.0 {
            diagnostics.rejected_invalid += 1;
            continue;
        }
        cleaned.push(lepton);
    }

    diagnostics.retained = cleaned.len();
    if diagnostics.corrected_mass > 0 || diagnostics.rejected_invalid > 0 {
        debug!(
            corrected_mass = diagnostics.corrected_mass,
            rejected_invalid = diagnostics.rejected_invalid,
            retained = diagnostics.retained,
            "kinematic sanitization applied"
        );
    }
    cleaned
}

/// Quality cuts followed by sanitization, the full per-lepton pipeline stage.
pub fn filter_and_sanitize(
    leptons: &[Lepton],
    config: &SelectionConfig,
) -> (Vec<Lepton>, FilterDiagnostics) {
    let (cut, mut diagnostics) = apply_quality_cuts(leptons, config);
    let cleaned = sanitize_kinematics(cut, &mut diagnostics);
    (cleaned, diagnostics)
}
