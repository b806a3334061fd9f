use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum NmrError {
    #[error("not implemented: {0}")]
    #[diagnostic(help("supported file types are \"Bruker Quantification\" and \"empty\""))]
    NotImplemented(String),

    #[error("parameter `{parameter}` must be {expected}, got {found}")]
    InvalidParameterType {
        parameter: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("invalid load parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid file name pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(
        "unit {requested:?} is not present in the input data, available units: {}",
        .available.join(", ")
    )]
    UnitNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("unknown SOP: {0}")]
    UnknownSop(String),

    #[error("failed to parse SOP {name}: {message}")]
    SopParse { name: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to parse report {path}: {details}")]
    ReportParse { path: Utf8PathBuf, details: String },

    #[error("failed to read worklist {path}: {message}")]
    WorklistRead { path: Utf8PathBuf, message: String },

    #[error("worklist {path} is missing required column {column:?}")]
    WorklistColumn { path: Utf8PathBuf, column: String },

    #[error("dataset is not ready (state: {0})")]
    NotReady(String),

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("sample index {index} out of range for {len} samples")]
    SampleIndex { index: usize, len: usize },

    #[error("invalid sample order: {0}")]
    InvalidOrder(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NmrError {
    pub fn report_parse(path: &Utf8Path, details: impl Into<String>) -> Self {
        Self::ReportParse {
            path: path.to_path_buf(),
            details: details.into(),
        }
    }
}
