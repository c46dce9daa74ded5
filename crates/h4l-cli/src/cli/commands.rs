use super::CliError;
use h4l_core::common::{ChargeGate, SelectionConfig, SelectionStrategy, ZWindowPolicy};
use h4l_core::domain::{AnalysisError, AnalysisResult, Lepton};
use h4l_core::io::{read_flat_csv, read_ntuple_json, write_candidate_rows, CandidateRow, LeptonSource};
use h4l_core::pipeline::{run_chunk, run_chunked_to_csv, NtupleLoader};
use h4l_core::weighting::{apply_weight, calculate_mc_weight};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum StrategyChoice {
    /// SFOS pair search over all leptons of the event
    DirectPairSearch,
    /// Evaluate every four-lepton subset, best Z1 wins
    ExhaustiveQuadruplet,
}

impl From<StrategyChoice> for SelectionStrategy {
    fn from(choice: StrategyChoice) -> Self {
        match choice {
            StrategyChoice::DirectPairSearch => Self::DirectPairSearch,
            StrategyChoice::ExhaustiveQuadruplet => Self::ExhaustiveQuadruplet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum SourceChoice {
    Muon,
    Electron,
}

impl From<SourceChoice> for LeptonSource {
    fn from(choice: SourceChoice) -> Self {
        match choice {
            SourceChoice::Muon => Self::Muon,
            SourceChoice::Electron => Self::Electron,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct SelectArgs {
    /// Input files: columnar JSON ntuples or flat lepton CSV tables
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Candidate table output path
    #[arg(long, default_value = "candidates.csv")]
    output: PathBuf,

    /// Use the simulated-sample thresholds and gates
    #[arg(long)]
    mc: bool,

    /// JSON selection configuration; flags below still override its fields
    #[arg(long, conflicts_with = "mc")]
    config: Option<PathBuf>,

    /// Combinatorial search strategy (preset default otherwise)
    #[arg(long, value_enum)]
    strategy: Option<StrategyChoice>,

    /// Lepton collection to read from JSON ntuples whose file name does not
    /// identify one
    #[arg(long, value_enum)]
    source: Option<SourceChoice>,

    /// Minimum transverse momentum in GeV
    #[arg(long)]
    pt_min: Option<f64>,

    /// Maximum absolute pseudorapidity
    #[arg(long)]
    eta_max: Option<f64>,

    /// Maximum relative isolation
    #[arg(long)]
    iso_max: Option<f64>,

    /// Require the event's lepton charges to sum to zero
    #[arg(long)]
    charge_gate: bool,

    /// Skip the per-Z mass windows, keep only the four-lepton window
    #[arg(long)]
    four_lepton_only: bool,

    /// Entries per processing chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Process chunk by chunk and write one output unit per chunk
    #[arg(long)]
    chunked: bool,

    /// Integrated luminosity in fb^-1 (MC weighting)
    #[arg(long, requires_all = ["cross_section_fb", "n_generated"])]
    luminosity_fb: Option<f64>,

    /// Process cross-section in fb (MC weighting)
    #[arg(long, requires_all = ["luminosity_fb", "n_generated"])]
    cross_section_fb: Option<f64>,

    /// Generated-event count of the sample (MC weighting)
    #[arg(long, requires_all = ["luminosity_fb", "cross_section_fb"])]
    n_generated: Option<i64>,
}

#[derive(clap::Args)]
pub(super) struct WeightArgs {
    /// Integrated luminosity in fb^-1
    #[arg(long)]
    luminosity_fb: f64,

    /// Process cross-section in fb
    #[arg(long)]
    cross_section_fb: f64,

    /// Generated-event count per sample; repeat for merged samples
    #[arg(long, required = true)]
    n_generated: Vec<i64>,

    /// Print one weight per sample instead of one merged weight
    #[arg(long)]
    per_sample: bool,
}

impl SelectArgs {
    fn selection_config(&self) -> AnalysisResult<SelectionConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None if self.mc => SelectionConfig::monte_carlo(),
            None => SelectionConfig::real_data(),
        };
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        if let Some(pt_min) = self.pt_min {
            config.pt_min = pt_min;
        }
        if let Some(eta_max) = self.eta_max {
            config.eta_max = eta_max;
        }
        if let Some(iso_max) = self.iso_max {
            config.iso_max = iso_max;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if self.charge_gate {
            config.charge_gate = ChargeGate::Enabled;
        }
        if self.four_lepton_only {
            config.z_window_policy = ZWindowPolicy::FourLeptonOnly;
        }
        Ok(config)
    }

    fn mc_weight(&self) -> Option<f64> {
        match (self.luminosity_fb, self.cross_section_fb, self.n_generated) {
            (Some(luminosity), Some(cross_section), Some(n_generated)) => {
                Some(calculate_mc_weight(luminosity, cross_section, n_generated))
            }
            _ => None,
        }
    }
}

fn load_config_file(path: &Path) -> AnalysisResult<SelectionConfig> {
    let contents = fs::read_to_string(path).map_err(|source| AnalysisError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| {
        AnalysisError::config(format!(
            "failed to parse selection configuration '{}': {source}",
            path.display()
        ))
    })
}

pub(super) fn run_select_command(args: SelectArgs) -> Result<i32, CliError> {
    let config = args.selection_config().map_err(CliError::Analysis)?;
    config.validate().map_err(CliError::Analysis)?;
    let weight = args.mc_weight();

    if args.chunked {
        return run_chunked_select(&args, &config, weight);
    }

    let mut leptons: Vec<Lepton> = Vec::new();
    let mut loaded = 0usize;
    for input in &args.inputs {
        match load_input(input, args.source) {
            Ok(file_leptons) => {
                loaded += 1;
                leptons.extend(file_leptons);
            }
            Err(error) => {
                warn!(input = %input.display(), %error, "skipping unloadable input");
            }
        }
    }
    if loaded == 0 {
        return Err(CliError::Analysis(AnalysisError::NoLoadableInput));
    }

    let (candidates, diagnostics) = run_chunk(&leptons, &config);
    let rows: Vec<CandidateRow> = match weight {
        Some(weight) => apply_weight(&candidates, weight)
            .iter()
            .map(CandidateRow::from)
            .collect(),
        None => candidates.iter().map(CandidateRow::from).collect(),
    };
    write_candidate_rows(&args.output, &rows).map_err(CliError::Analysis)?;

    println!(
        "Selected {} candidate(s) from {} lepton(s) across {} input file(s).",
        rows.len(),
        diagnostics.input,
        loaded
    );
    println!("Candidate table: {}", args.output.display());
    Ok(0)
}

fn run_chunked_select(
    args: &SelectArgs,
    config: &SelectionConfig,
    weight: Option<f64>,
) -> Result<i32, CliError> {
    // Per-chunk output units are keyed by chunk index, so chunked runs take
    // exactly one input to keep the unit naming unambiguous.
    let [input] = args.inputs.as_slice() else {
        return Err(CliError::Usage(
            "--chunked requires exactly one input file".to_string(),
        ));
    };
    let source = resolve_source(input, args.source).map_err(CliError::Analysis)?;
    let loader = NtupleLoader::new(input, source);

    let written =
        run_chunked_to_csv(&loader, config, &args.output, weight).map_err(CliError::Analysis)?;
    println!("Wrote {} chunk output unit(s).", written.len());
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(0)
}

fn load_input(path: &Path, source: Option<SourceChoice>) -> AnalysisResult<Vec<Lepton>> {
    let is_flat_table = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_flat_table {
        return read_flat_csv(path, None);
    }
    let source = resolve_source(path, source)?;
    read_ntuple_json(path, source, None)
}

fn resolve_source(path: &Path, choice: Option<SourceChoice>) -> AnalysisResult<LeptonSource> {
    if let Some(choice) = choice {
        return Ok(choice.into());
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(LeptonSource::from_dataset_key)
        .ok_or_else(|| AnalysisError::NtupleShape {
            path: path.to_path_buf(),
            reason: "cannot infer the lepton collection from the file name; pass --source"
                .to_string(),
        })
}

pub(super) fn run_weight_command(args: WeightArgs) -> Result<i32, CliError> {
    if args.per_sample {
        for n_generated in &args.n_generated {
            let weight =
                calculate_mc_weight(args.luminosity_fb, args.cross_section_fb, *n_generated);
            println!("{} {}", n_generated, weight);
        }
        return Ok(0);
    }

    let total: i64 = args.n_generated.iter().sum();
    let weight = calculate_mc_weight(args.luminosity_fb, args.cross_section_fb, total);
    println!("{}", weight);
    Ok(0)
}
