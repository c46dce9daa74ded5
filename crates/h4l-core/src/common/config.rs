//! Selection configuration: every cut threshold, mass window, and policy
//! switch the pipeline recognizes, with presets for the real-data and MC
//! analysis paths.

use super::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_ETA_MAX_DATA, DEFAULT_ETA_MAX_MC, DEFAULT_FOUR_LEPTON_WINDOW_GEV,
    DEFAULT_ID_PASSED, DEFAULT_ISO_MAX_DATA, DEFAULT_ISO_MAX_MC, DEFAULT_PT_MIN_GEV,
    DEFAULT_Z1_WINDOW_GEV, DEFAULT_Z2_WINDOW_GEV, NOMINAL_Z_MASS_GEV,
};
use crate::domain::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Open interval `(low, high)` on an invariant mass in GeV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassWindow {
    pub low: f64,
    pub high: f64,
}

impl MassWindow {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(self, mass: f64) -> bool {
        self.low < mass && mass < self.high
    }

    fn validate(self, label: &str) -> AnalysisResult<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low >= self.high {
            return Err(AnalysisError::config(format!(
                "{label} window ({}, {}) is not a valid open interval",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

impl From<(f64, f64)> for MassWindow {
    fn from((low, high): (f64, f64)) -> Self {
        Self::new(low, high)
    }
}

/// How the per-event combinatorial search is organized.
///
/// The two strategies are not guaranteed to agree on events with more than
/// four qualifying leptons, so they stay separate, independently testable
/// policies rather than being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// SFOS pair search over all leptons of the event, no explicit
    /// quadruplet enumeration.
    #[default]
    DirectPairSearch,
    /// Evaluate every C(n,4) lepton subset and keep the candidate whose Z1
    /// is globally closest to the nominal Z mass.
    ExhaustiveQuadruplet,
}

/// Event-level net-charge gate applied before pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeGate {
    /// Require the charges of all leptons in the event to sum to zero.
    Enabled,
    /// Rely on the pair-level opposite-charge requirement only.
    #[default]
    Disabled,
}

/// Which mass windows gate a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZWindowPolicy {
    /// Apply the Z1 and Z2 windows in addition to the four-lepton window.
    #[default]
    PerZWindows,
    /// Apply only the final four-lepton window.
    FourLeptonOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub pt_min: f64,
    pub eta_max: f64,
    pub iso_max: f64,
    /// When `Some(v)`, only leptons whose identification flag equals `v`
    /// pass the quality filter (MC path).
    pub id_passed: Option<i32>,
    pub nominal_z_mass: f64,
    pub z1_window: MassWindow,
    pub z2_window: MassWindow,
    pub four_lepton_window: MassWindow,
    pub chunk_size: usize,
    pub strategy: SelectionStrategy,
    pub charge_gate: ChargeGate,
    pub z_window_policy: ZWindowPolicy,
}

impl SelectionConfig {
    /// Thresholds used on collision data.
    pub fn real_data() -> Self {
        Self {
            pt_min: DEFAULT_PT_MIN_GEV,
            eta_max: DEFAULT_ETA_MAX_DATA,
            iso_max: DEFAULT_ISO_MAX_DATA,
            id_passed: None,
            nominal_z_mass: NOMINAL_Z_MASS_GEV,
            z1_window: DEFAULT_Z1_WINDOW_GEV.into(),
            z2_window: DEFAULT_Z2_WINDOW_GEV.into(),
            four_lepton_window: DEFAULT_FOUR_LEPTON_WINDOW_GEV.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            strategy: SelectionStrategy::default(),
            charge_gate: ChargeGate::default(),
            z_window_policy: ZWindowPolicy::default(),
        }
    }

    /// Thresholds used on simulated samples: tighter acceptance, looser
    /// isolation, and the upstream identification flag requirement.
    pub fn monte_carlo() -> Self {
        Self {
            eta_max: DEFAULT_ETA_MAX_MC,
            iso_max: DEFAULT_ISO_MAX_MC,
            id_passed: Some(DEFAULT_ID_PASSED),
            charge_gate: ChargeGate::Enabled,
            strategy: SelectionStrategy::ExhaustiveQuadruplet,
            ..Self::real_data()
        }
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if !self.pt_min.is_finite() || self.pt_min < 0.0 {
            return Err(AnalysisError::config(format!(
                "pt_min must be finite and non-negative, got {}",
                self.pt_min
            )));
        }
        if !self.eta_max.is_finite() || self.eta_max <= 0.0 {
            return Err(AnalysisError::config(format!(
                "eta_max must be finite and positive, got {}",
                self.eta_max
            )));
        }
        if !self.iso_max.is_finite() || self.iso_max <= 0.0 {
            return Err(AnalysisError::config(format!(
                "iso_max must be finite and positive, got {}",
                self.iso_max
            )));
        }
        if !self.nominal_z_mass.is_finite() || self.nominal_z_mass <= 0.0 {
            return Err(AnalysisError::config(format!(
                "nominal_z_mass must be finite and positive, got {}",
                self.nominal_z_mass
            )));
        }
        if self.chunk_size == 0 {
            return Err(AnalysisError::config("chunk_size must be positive"));
        }
        self.z1_window.validate("z1_mass")?;
        self.z2_window.validate("z2_mass")?;
        self.four_lepton_window.validate("four_lepton_mass")?;
        Ok(())
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::real_data()
    }
}
