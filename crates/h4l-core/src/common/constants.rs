//! Nominal physics values and default cut thresholds.
//!
//! Everything here is a default: the selector only ever reads these values
//! through `SelectionConfig`, so policy variants are data, not code branches.

/// PDG world-average Z boson mass in GeV.
pub const NOMINAL_Z_MASS_GEV: f64 = 91.1876;

/// Replacement for negative reconstructed lepton masses, in GeV.
pub const MASS_FALLBACK_GEV: f64 = 0.1;

pub const DEFAULT_PT_MIN_GEV: f64 = 5.0;

pub const DEFAULT_ETA_MAX_DATA: f64 = 2.5;
pub const DEFAULT_ETA_MAX_MC: f64 = 2.4;

pub const DEFAULT_ISO_MAX_DATA: f64 = 0.30;
pub const DEFAULT_ISO_MAX_MC: f64 = 0.35;

/// Value of the upstream identification flag that marks an MC lepton as good.
pub const DEFAULT_ID_PASSED: i32 = 1;

pub const DEFAULT_Z1_WINDOW_GEV: (f64, f64) = (40.0, 120.0);
pub const DEFAULT_Z2_WINDOW_GEV: (f64, f64) = (12.0, 120.0);
pub const DEFAULT_FOUR_LEPTON_WINDOW_GEV: (f64, f64) = (100.0, 160.0);

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;
