//! Input and output collaborators for the selection pipeline.
//!
//! The core algorithm only ever sees flattened `Lepton` sequences and emits
//! `Candidate` rows; everything here is the thin plumbing that produces and
//! consumes those. Two input shapes are supported: a columnar JSON rendition
//! of the per-event ntuple (jagged per-flavor branch arrays) and an already
//! flattened CSV lepton table.

use crate::domain::{AnalysisError, AnalysisResult, Candidate, Lepton, LeptonFlavor};
use crate::weighting::WeightedCandidate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Branch names for one lepton flavor, resolved once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchNames {
    pub pt: &'static str,
    pub eta: &'static str,
    pub phi: &'static str,
    pub mass: &'static str,
    pub charge: &'static str,
    pub iso: &'static str,
    pub id: &'static str,
}

const MUON_BRANCHES: BranchNames = BranchNames {
    pt: "Muon_pt",
    eta: "Muon_eta",
    phi: "Muon_phi",
    mass: "Muon_mass",
    charge: "Muon_charge",
    iso: "Muon_pfRelIso03_all",
    id: "Muon_id",
};

const ELECTRON_BRANCHES: BranchNames = BranchNames {
    pt: "Electron_pt",
    eta: "Electron_eta",
    phi: "Electron_phi",
    mass: "Electron_mass",
    charge: "Electron_charge",
    iso: "Electron_pfRelIso03_all",
    id: "Electron_id",
};

/// Which lepton collection of an ntuple a load reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeptonSource {
    Muon,
    Electron,
}

impl LeptonSource {
    pub const fn branches(self) -> &'static BranchNames {
        match self {
            Self::Muon => &MUON_BRANCHES,
            Self::Electron => &ELECTRON_BRANCHES,
        }
    }

    pub const fn flavor(self) -> LeptonFlavor {
        match self {
            Self::Muon => LeptonFlavor::Muon,
            Self::Electron => LeptonFlavor::Electron,
        }
    }

    /// Infers the collection from a dataset name, e.g. `DoubleMuon_B` or
    /// `ZZTo4e`. Unrecognized names yield `None` and the caller skips the
    /// file with a diagnostic.
    pub fn from_dataset_key(key: &str) -> Option<Self> {
        if key.contains("Muon") || key.contains("4mu") || key.contains("2mu") {
            Some(Self::Muon)
        } else if key.contains("Electron") || key.contains("4e") || key.contains("2e") {
            Some(Self::Electron)
        } else {
            None
        }
    }
}

/// Number of events stored in a columnar JSON ntuple.
pub fn ntuple_entries(path: &Path) -> AnalysisResult<usize> {
    let value = load_json(path)?;
    let object = as_object(&value, path)?;
    Ok(array_field(object, "event", path)?.len())
}

/// Reads one lepton collection from a columnar JSON ntuple and flattens it
/// into one row per lepton, repeating the owning event id.
///
/// `entry_range` restricts the read to a half-open event range (the chunked
/// execution contract); it is clamped to the file's entry count.
pub fn read_ntuple_json(
    path: &Path,
    source: LeptonSource,
    entry_range: Option<Range<usize>>,
) -> AnalysisResult<Vec<Lepton>> {
    let value = load_json(path)?;
    let object = as_object(&value, path)?;
    let branches = source.branches();

    let events = array_field(object, "event", path)?;
    let entry_count = events.len();

    let pt = jagged_field(object, branches.pt, path, entry_count)?;
    let eta = jagged_field(object, branches.eta, path, entry_count)?;
    let phi = jagged_field(object, branches.phi, path, entry_count)?;
    let mass = jagged_field(object, branches.mass, path, entry_count)?;
    let iso = jagged_field(object, branches.iso, path, entry_count)?;
    let charge = jagged_field(object, branches.charge, path, entry_count)?;
    // The identification branch only exists in MC ntuples.
    let id = if object.contains_key(branches.id) {
        Some(jagged_field(object, branches.id, path, entry_count)?)
    } else {
        None
    };

    let range = match entry_range {
        Some(range) => range.start.min(entry_count)..range.end.min(entry_count),
        None => 0..entry_count,
    };

    let mut leptons = Vec::new();
    for entry in range {
        let event_id = events[entry].as_i64().ok_or_else(|| AnalysisError::NtupleShape {
            path: path.to_path_buf(),
            reason: format!("event id at entry {entry} is not an integer"),
        })?;

        let lepton_count = pt[entry].len();
        for (name, branch) in [
            (branches.eta, &eta),
            (branches.phi, &phi),
            (branches.mass, &mass),
            (branches.iso, &iso),
            (branches.charge, &charge),
        ] {
            if branch[entry].len() != lepton_count {
                return Err(AnalysisError::BranchShape {
                    path: path.to_path_buf(),
                    branch: name.to_string(),
                    expected: lepton_count,
                    actual: branch[entry].len(),
                });
            }
        }

        for index in 0..lepton_count {
            leptons.push(Lepton {
                event_id,
                pt: pt[entry][index],
                eta: eta[entry][index],
                phi: phi[entry][index],
                mass: mass[entry][index],
                charge: if charge[entry][index] < 0.0 { -1 } else { 1 },
                flavor: source.flavor(),
                iso: iso[entry][index],
                id: id.as_ref().map(|jagged| jagged[entry][index] as i32),
            });
        }
    }

    Ok(leptons)
}

fn load_json(path: &Path) -> AnalysisResult<Value> {
    let file = File::open(path).map_err(|source| AnalysisError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| AnalysisError::NtupleParse {
        path: path.to_path_buf(),
        source,
    })
}

fn as_object<'v>(value: &'v Value, path: &Path) -> AnalysisResult<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| AnalysisError::NtupleShape {
        path: path.to_path_buf(),
        reason: "top level is not an object".to_string(),
    })
}

fn array_field<'v>(
    object: &'v Map<String, Value>,
    branch: &str,
    path: &Path,
) -> AnalysisResult<&'v Vec<Value>> {
    object
        .get(branch)
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::MissingBranch {
            path: path.to_path_buf(),
            branch: branch.to_string(),
        })
}

fn jagged_field(
    object: &Map<String, Value>,
    branch: &str,
    path: &Path,
    entry_count: usize,
) -> AnalysisResult<Vec<Vec<f64>>> {
    let outer = array_field(object, branch, path)?;
    if outer.len() != entry_count {
        return Err(AnalysisError::BranchShape {
            path: path.to_path_buf(),
            branch: branch.to_string(),
            expected: entry_count,
            actual: outer.len(),
        });
    }

    let mut jagged = Vec::with_capacity(outer.len());
    for (entry, inner) in outer.iter().enumerate() {
        let values = inner.as_array().ok_or_else(|| AnalysisError::NtupleShape {
            path: path.to_path_buf(),
            reason: format!("branch '{branch}' entry {entry} is not an array"),
        })?;
        let mut row = Vec::with_capacity(values.len());
        for value in values {
            row.push(value.as_f64().ok_or_else(|| AnalysisError::NtupleShape {
                path: path.to_path_buf(),
                reason: format!("branch '{branch}' entry {entry} holds a non-numeric value"),
            })?);
        }
        jagged.push(row);
    }
    Ok(jagged)
}

#[derive(Debug, Serialize, Deserialize)]
struct FlatLeptonRow {
    event_id: i64,
    pt: f64,
    eta: f64,
    phi: f64,
    mass: f64,
    charge: i8,
    flavor: i32,
    iso: f64,
    #[serde(default)]
    id: Option<i32>,
}

/// Reads an already flattened lepton table (one CSV row per lepton).
///
/// `flavor_filter` keeps only one flavor, used when a mixed sample is read
/// once per flavor. Rows with an unknown PDG flavor code are dropped with a
/// diagnostic, matching the per-lepton data-error policy.
pub fn read_flat_csv(
    path: &Path,
    flavor_filter: Option<LeptonFlavor>,
) -> AnalysisResult<Vec<Lepton>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| AnalysisError::TableParse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut leptons = Vec::new();
    let mut unknown_flavor = 0usize;
    for row in reader.deserialize::<FlatLeptonRow>() {
        let row = row.map_err(|source| AnalysisError::TableParse {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(flavor) = LeptonFlavor::from_pdg(row.flavor) else {
            unknown_flavor += 1;
            continue;
        };
        if flavor_filter.is_some_and(|wanted| wanted != flavor) {
            continue;
        }
        leptons.push(Lepton {
            event_id: row.event_id,
            pt: row.pt,
            eta: row.eta,
            phi: row.phi,
            mass: row.mass,
            charge: row.charge,
            flavor,
            iso: row.iso,
            id: row.id,
        });
    }

    if unknown_flavor > 0 {
        warn!(
            path = %path.display(),
            unknown_flavor, "dropped rows with unrecognized PDG flavor codes"
        );
    }
    Ok(leptons)
}

/// One row of the output candidate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub event_id: i64,
    pub z1_mass: f64,
    pub z2_mass: f64,
    /// Four-lepton invariant mass.
    pub mass: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl From<&Candidate> for CandidateRow {
    fn from(candidate: &Candidate) -> Self {
        Self {
            event_id: candidate.event_id,
            z1_mass: candidate.z1_mass,
            z2_mass: candidate.z2_mass,
            mass: candidate.four_lepton_mass,
            weight: None,
        }
    }
}

impl From<&WeightedCandidate> for CandidateRow {
    fn from(weighted: &WeightedCandidate) -> Self {
        Self {
            weight: Some(weighted.weight),
            ..Self::from(&weighted.candidate)
        }
    }
}

/// Writes a candidate table, one row per accepted candidate.
pub fn write_candidate_rows(path: &Path, rows: &[CandidateRow]) -> AnalysisResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| AnalysisError::TableWrite {
        path: path.to_path_buf(),
        source,
    })?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|source| AnalysisError::TableWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    writer.flush().map_err(|source| AnalysisError::TableWrite {
        path: path.to_path_buf(),
        source: source.into(),
    })
}

/// Reads a candidate table back, e.g. to merge per-chunk output units.
pub fn read_candidate_rows(path: &Path) -> AnalysisResult<Vec<CandidateRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| AnalysisError::TableParse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<CandidateRow>() {
        rows.push(row.map_err(|source| AnalysisError::TableParse {
            path: path.to_path_buf(),
            source,
        })?);
    }
    Ok(rows)
}

/// Output unit path for one chunk: `out.csv` becomes `out.chunk3.csv`.
pub fn chunk_output_path(output: &Path, chunk_index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "candidates".to_string());
    let extension = output
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    output.with_file_name(format!("{stem}.chunk{chunk_index}.{extension}"))
}
