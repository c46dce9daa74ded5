use std::path::PathBuf;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Coarse error categories mapped to stable process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidation,
    IoSystem,
    Computation,
    Internal,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidation => 2,
            Self::IoSystem => 3,
            Self::Computation => 4,
            Self::Internal => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidation => "InputValidation",
            Self::IoSystem => "IoSystem",
            Self::Computation => "Computation",
            Self::Internal => "Internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("failed to read input '{}': {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ntuple '{}': {source}", path.display())]
    NtupleParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing branch '{branch}' in ntuple '{}'", path.display())]
    MissingBranch { path: PathBuf, branch: String },
    #[error("malformed ntuple '{}': {reason}", path.display())]
    NtupleShape { path: PathBuf, reason: String },
    #[error("branch '{branch}' in ntuple '{}' has {actual} entries, expected {expected}", path.display())]
    BranchShape {
        path: PathBuf,
        branch: String,
        expected: usize,
        actual: usize,
    },
    #[error("failed to parse lepton table '{}': {source}", path.display())]
    TableParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write candidate table '{}': {source}", path.display())]
    TableWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
    #[error("no input source could be loaded")]
    NoLoadableInput,
}

impl AnalysisError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InputRead { .. } => ErrorCategory::IoSystem,
            Self::NtupleParse { .. }
            | Self::MissingBranch { .. }
            | Self::NtupleShape { .. }
            | Self::BranchShape { .. }
            | Self::TableParse { .. }
            | Self::Config { .. } => ErrorCategory::InputValidation,
            Self::TableWrite { .. } => ErrorCategory::IoSystem,
            Self::NoLoadableInput => ErrorCategory::Computation,
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}
