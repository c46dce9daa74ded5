pub mod errors;

pub use errors::{AnalysisError, AnalysisResult, ErrorCategory};

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Lepton flavors recognized by the selection, identified by PDG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeptonFlavor {
    Electron,
    Muon,
}

impl LeptonFlavor {
    pub const fn pdg_code(self) -> i32 {
        match self {
            Self::Electron => 11,
            Self::Muon => 13,
        }
    }

    pub const fn from_pdg(code: i32) -> Option<Self> {
        match code {
            11 => Some(Self::Electron),
            13 => Some(Self::Muon),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electron => "electron",
            Self::Muon => "muon",
        }
    }
}

impl Display for LeptonFlavor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One reconstructed lepton, flattened out of the per-event ntuple arrays.
///
/// `event_id` groups leptons into events and is not unique per lepton. The
/// only mutation a lepton ever sees is the negative-mass clamp during
/// sanitization; once it reaches the selector it is immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lepton {
    pub event_id: i64,
    /// Transverse momentum in GeV, finite and > 0 after sanitization.
    pub pt: f64,
    pub eta: f64,
    /// Azimuthal angle in radians.
    pub phi: f64,
    /// Rest mass in GeV, >= 0 after sanitization.
    pub mass: f64,
    /// Electric charge, -1 or +1.
    pub charge: i8,
    pub flavor: LeptonFlavor,
    /// Relative isolation, lower is more isolated.
    pub iso: f64,
    /// Upstream identification quality flag, present only for MC samples.
    pub id: Option<i32>,
}

/// All leptons of a single event, in flattening order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLeptons {
    pub event_id: i64,
    pub leptons: Vec<Lepton>,
}

impl EventLeptons {
    pub fn net_charge(&self) -> i32 {
        self.leptons
            .iter()
            .map(|lepton| i32::from(lepton.charge))
            .sum()
    }
}

/// Groups a flat lepton sequence into per-event records, ordered by event id.
///
/// Ordering by event id keeps downstream output deterministic regardless of
/// the interleaving produced by multi-file loads.
pub fn group_by_event(leptons: impl IntoIterator<Item = Lepton>) -> Vec<EventLeptons> {
    let mut grouped: BTreeMap<i64, Vec<Lepton>> = BTreeMap::new();
    for lepton in leptons {
        grouped.entry(lepton.event_id).or_default().push(lepton);
    }
    grouped
        .into_iter()
        .map(|(event_id, leptons)| EventLeptons { event_id, leptons })
        .collect()
}

/// The selected best four-lepton combination for one event.
///
/// `lepton_indices` are event-scoped positions (Z1 pair first, then Z2 pair)
/// kept for diagnostics only; candidates never own or mutate their leptons.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub event_id: i64,
    pub z1_mass: f64,
    pub z2_mass: f64,
    pub four_lepton_mass: f64,
    pub lepton_indices: [usize; 4],
}
