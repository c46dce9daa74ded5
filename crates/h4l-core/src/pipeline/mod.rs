//! Chunked end-to-end execution of the selection pipeline.
//!
//! The full entry range of an input is partitioned into half-open chunks and
//! each chunk runs the identical filter/group/select pipeline independently,
//! so memory stays bounded by the chunk size instead of the input size. A
//! chunk that fails to load is skipped with a diagnostic; the run only fails
//! outright when no chunk loads at all.

use crate::common::SelectionConfig;
use crate::domain::{group_by_event, AnalysisError, AnalysisResult, Candidate, Lepton};
use crate::filter::{filter_and_sanitize, FilterDiagnostics};
use crate::io::{
    chunk_output_path, ntuple_entries, read_ntuple_json, write_candidate_rows, CandidateRow,
    LeptonSource,
};
use crate::selector::select_candidates;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One half-open slice of the input entry range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: usize,
    pub entries: Range<usize>,
}

/// Partitions `[0, n_entries)` into consecutive chunks of `chunk_size`; the
/// last chunk carries the remainder. Zero entries plan to zero chunks.
pub fn plan_chunks(n_entries: usize, chunk_size: usize) -> AnalysisResult<Vec<ChunkPlan>> {
    if chunk_size == 0 {
        return Err(AnalysisError::config("chunk_size must be positive"));
    }
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < n_entries {
        let end = (start + chunk_size).min(n_entries);
        chunks.push(ChunkPlan {
            index: chunks.len(),
            entries: start..end,
        });
        start = end;
    }
    Ok(chunks)
}

/// A source that can be read one entry range at a time.
///
/// Loading may fail per range (truncated file, malformed branch); the chunked
/// driver turns such failures into skipped chunks.
pub trait EventRangeLoader {
    fn num_entries(&self) -> AnalysisResult<usize>;
    fn load_range(&self, entries: Range<usize>) -> AnalysisResult<Vec<Lepton>>;
}

/// An in-memory loader over pre-flattened leptons, one entry per event id in
/// ascending order. Used for tests and for already-loaded flat tables.
pub struct InMemoryLoader {
    events: Vec<Vec<Lepton>>,
}

impl InMemoryLoader {
    pub fn new(leptons: Vec<Lepton>) -> Self {
        let events = group_by_event(leptons)
            .into_iter()
            .map(|event| event.leptons)
            .collect();
        Self { events }
    }
}

impl EventRangeLoader for InMemoryLoader {
    fn num_entries(&self) -> AnalysisResult<usize> {
        Ok(self.events.len())
    }

    fn load_range(&self, entries: Range<usize>) -> AnalysisResult<Vec<Lepton>> {
        let end = entries.end.min(self.events.len());
        let start = entries.start.min(end);
        Ok(self.events[start..end].iter().flatten().copied().collect())
    }
}

/// A columnar JSON ntuple read one entry range at a time. The file is
/// re-parsed per range, trading repeated parse work for bounded memory.
pub struct NtupleLoader {
    path: PathBuf,
    source: LeptonSource,
}

impl NtupleLoader {
    pub fn new(path: impl Into<PathBuf>, source: LeptonSource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

impl EventRangeLoader for NtupleLoader {
    fn num_entries(&self) -> AnalysisResult<usize> {
        ntuple_entries(&self.path)
    }

    fn load_range(&self, entries: Range<usize>) -> AnalysisResult<Vec<Lepton>> {
        read_ntuple_json(&self.path, self.source, Some(entries))
    }
}

/// Result of one chunk's pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    pub index: usize,
    pub candidates: Vec<Candidate>,
    pub diagnostics: FilterDiagnostics,
}

/// Runs filter, sanitization, grouping, and selection over one loaded chunk.
pub fn run_chunk(leptons: &[Lepton], config: &SelectionConfig) -> (Vec<Candidate>, FilterDiagnostics) {
    let (cleaned, diagnostics) = filter_and_sanitize(leptons, config);
    let events = group_by_event(cleaned);
    let candidates = select_candidates(&events, config);
    (candidates, diagnostics)
}

/// Runs the whole input through chunk-sized pipeline passes.
///
/// Each chunk is loaded, processed, and reported independently. A chunk whose
/// load fails is skipped; if every chunk fails (or the entry count itself is
/// unreadable and no fallback exists), the run fails with `NoLoadableInput`.
pub fn run_chunked(
    loader: &dyn EventRangeLoader,
    config: &SelectionConfig,
) -> AnalysisResult<Vec<ChunkOutcome>> {
    config.validate()?;
    let n_entries = loader.num_entries()?;
    let plan = plan_chunks(n_entries, config.chunk_size)?;
    if plan.is_empty() {
        return Ok(Vec::new());
    }

    let mut outcomes = Vec::with_capacity(plan.len());
    let mut loaded_any = false;
    for chunk in &plan {
        let leptons = match loader.load_range(chunk.entries.clone()) {
            Ok(leptons) => leptons,
            Err(error) => {
                warn!(
                    chunk = chunk.index,
                    start = chunk.entries.start,
                    end = chunk.entries.end,
                    %error,
                    "skipping chunk that failed to load"
                );
                continue;
            }
        };
        loaded_any = true;
        let (candidates, diagnostics) = run_chunk(&leptons, config);
        info!(
            chunk = chunk.index,
            entries = chunk.entries.end - chunk.entries.start,
            retained = diagnostics.retained,
            candidates = candidates.len(),
            "chunk processed"
        );
        outcomes.push(ChunkOutcome {
            index: chunk.index,
            candidates,
            diagnostics,
        });
    }

    if !loaded_any {
        return Err(AnalysisError::NoLoadableInput);
    }
    Ok(outcomes)
}

/// Runs chunked selection and writes one output unit per processed chunk.
/// Returns the written paths in chunk order.
pub fn run_chunked_to_csv(
    loader: &dyn EventRangeLoader,
    config: &SelectionConfig,
    output: &Path,
    weight: Option<f64>,
) -> AnalysisResult<Vec<PathBuf>> {
    let outcomes = run_chunked(loader, config)?;
    let mut written = Vec::with_capacity(outcomes.len());
    for outcome in &outcomes {
        let rows: Vec<CandidateRow> = outcome
            .candidates
            .iter()
            .map(|candidate| CandidateRow {
                weight,
                ..CandidateRow::from(candidate)
            })
            .collect();
        let path = chunk_output_path(output, outcome.index);
        write_candidate_rows(&path, &rows)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::{
        plan_chunks, run_chunk, run_chunked, run_chunked_to_csv, EventRangeLoader, InMemoryLoader,
    };
    use crate::common::{SelectionConfig, SelectionStrategy};
    use crate::domain::{AnalysisError, AnalysisResult, Lepton, LeptonFlavor};
    use crate::io::read_candidate_rows;
    use std::f64::consts::PI;
    use std::ops::Range;
    use tempfile::TempDir;

    fn muon(event_id: i64, charge: i8, pt: f64, phi: f64) -> Lepton {
        Lepton {
            event_id,
            pt,
            eta: 0.0,
            phi,
            mass: 0.0,
            charge,
            flavor: LeptonFlavor::Muon,
            iso: 0.1,
            id: Some(1),
        }
    }

    /// Four muons forming a 91.2 GeV Z1 and a 33.8 GeV Z2; the four-lepton
    /// mass lands near 125 GeV.
    fn higgs_like_event(event_id: i64) -> Vec<Lepton> {
        vec![
            muon(event_id, 1, 45.6, 0.0),
            muon(event_id, -1, 45.6, PI),
            muon(event_id, 1, 16.9, PI / 2.0),
            muon(event_id, -1, 16.9, -PI / 2.0),
        ]
    }

    #[test]
    fn chunk_plan_covers_the_range_with_a_short_tail() {
        let plan = plan_chunks(250, 100).expect("valid plan");
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].entries, 0..100);
        assert_eq!(plan[1].entries, 100..200);
        assert_eq!(plan[2].entries, 200..250);
        assert_eq!(plan[2].index, 2);

        assert!(plan_chunks(0, 100).expect("empty plan").is_empty());
        assert!(plan_chunks(10, 0).is_err());
    }

    #[test]
    fn run_chunk_selects_from_grouped_events() {
        let mut leptons = higgs_like_event(1);
        leptons.extend(higgs_like_event(2));
        // Not enough leptons to form a candidate.
        leptons.push(muon(3, 1, 30.0, 0.0));

        let config = SelectionConfig::real_data();
        let (candidates, diagnostics) = run_chunk(&leptons, &config);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].event_id, 1);
        assert_eq!(candidates[1].event_id, 2);
        assert_eq!(diagnostics.retained, 9);
    }

    #[test]
    fn chunked_run_matches_a_single_pass() {
        let leptons: Vec<Lepton> = (0..25).flat_map(higgs_like_event).collect();
        let loader = InMemoryLoader::new(leptons.clone());

        let mut chunked_config = SelectionConfig::real_data();
        chunked_config.chunk_size = 10;
        let outcomes = run_chunked(&loader, &chunked_config).expect("chunked run");
        assert_eq!(outcomes.len(), 3);
        let concatenated: Vec<_> = outcomes
            .into_iter()
            .flat_map(|outcome| outcome.candidates)
            .collect();

        let single_pass = run_chunk(&leptons, &SelectionConfig::real_data()).0;
        assert_eq!(concatenated, single_pass);
        assert_eq!(concatenated.len(), 25);
    }

    struct FlakyLoader {
        inner: InMemoryLoader,
        failing_chunk_start: Option<usize>,
    }

    impl EventRangeLoader for FlakyLoader {
        fn num_entries(&self) -> AnalysisResult<usize> {
            self.inner.num_entries()
        }

        fn load_range(&self, entries: Range<usize>) -> AnalysisResult<Vec<Lepton>> {
            if self.failing_chunk_start.is_none_or(|start| start == entries.start) {
                return Err(AnalysisError::NtupleShape {
                    path: "broken.json".into(),
                    reason: "truncated branch".to_string(),
                });
            }
            self.inner.load_range(entries)
        }
    }

    #[test]
    fn a_failing_chunk_is_skipped_not_fatal() {
        let leptons: Vec<Lepton> = (0..30).flat_map(higgs_like_event).collect();
        let loader = FlakyLoader {
            inner: InMemoryLoader::new(leptons),
            failing_chunk_start: Some(10),
        };

        let mut config = SelectionConfig::real_data();
        config.chunk_size = 10;
        let outcomes = run_chunked(&loader, &config).expect("partial run");

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].index, 0);
        assert_eq!(outcomes[1].index, 2);
        let events: Vec<i64> = outcomes
            .iter()
            .flat_map(|outcome| outcome.candidates.iter().map(|c| c.event_id))
            .collect();
        assert!(!events.contains(&15));
        assert_eq!(events.len(), 20);
    }

    #[test]
    fn all_chunks_failing_is_a_hard_error() {
        let loader = FlakyLoader {
            inner: InMemoryLoader::new(higgs_like_event(1)),
            failing_chunk_start: None,
        };
        let error = run_chunked(&loader, &SelectionConfig::real_data())
            .expect_err("nothing loadable");
        assert!(matches!(error, AnalysisError::NoLoadableInput));
    }

    #[test]
    fn empty_input_yields_no_chunks_and_no_error() {
        let loader = InMemoryLoader::new(Vec::new());
        let outcomes = run_chunked(&loader, &SelectionConfig::real_data()).expect("empty run");
        assert!(outcomes.is_empty());
    }

    #[test]
    fn chunked_csv_run_writes_one_unit_per_chunk() {
        let temp = TempDir::new().expect("tempdir");
        let output = temp.path().join("candidates.csv");
        let leptons: Vec<Lepton> = (0..5).flat_map(higgs_like_event).collect();
        let loader = InMemoryLoader::new(leptons);

        let mut config = SelectionConfig::monte_carlo();
        config.strategy = SelectionStrategy::DirectPairSearch;
        config.chunk_size = 2;
        let written =
            run_chunked_to_csv(&loader, &config, &output, Some(0.25)).expect("chunked write");

        assert_eq!(written.len(), 3);
        assert_eq!(written[0], temp.path().join("candidates.chunk0.csv"));

        let mut total = 0usize;
        for path in &written {
            let rows = read_candidate_rows(path).expect("readback");
            assert!(rows.iter().all(|row| row.weight == Some(0.25)));
            total += rows.len();
        }
        assert_eq!(total, 5);
    }
}
