//! Four-lepton candidate reconstruction for the H -> ZZ* -> 4l channel.
//!
//! The crate turns per-event lepton collections into at most one Higgs
//! candidate per event: quality cuts and kinematic sanitization, SFOS pair
//! building, Z1/Z2 assignment against the nominal Z mass, and mass-window
//! acceptance. Inputs arrive as columnar JSON ntuples or flat lepton tables,
//! outputs leave as candidate tables, optionally carrying a Monte-Carlo
//! normalization weight. Large inputs run through fixed-size entry chunks so
//! memory stays bounded.

pub mod common;
pub mod domain;
pub mod filter;
pub mod io;
pub mod kinematics;
pub mod pipeline;
pub mod selector;
pub mod weighting;

pub use common::{ChargeGate, MassWindow, SelectionConfig, SelectionStrategy, ZWindowPolicy};
pub use domain::{
    group_by_event, AnalysisError, AnalysisResult, Candidate, ErrorCategory, EventLeptons, Lepton,
    LeptonFlavor,
};
pub use filter::{filter_and_sanitize, FilterDiagnostics};
pub use kinematics::FourVector;
pub use pipeline::{
    plan_chunks, run_chunk, run_chunked, ChunkOutcome, ChunkPlan, EventRangeLoader, NtupleLoader,
};
pub use selector::{select_candidates, select_event};
pub use weighting::{calculate_mc_weight, McNormalization, McSample, WeightScheme, WeightedCandidate};
