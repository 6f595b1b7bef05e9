//! Typed error taxonomy for the mule-detection pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can terminate an analysis invocation.
///
/// Detectors themselves never raise these. On degenerate input they emit
/// empty ring lists (see `cycle`, `smurf`, `shell`). Fatal errors originate
/// only in ingest or in the pipeline's own invariant checks.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AnalysisError {
    #[error("CSV header is missing required column(s): {0:?}")]
    SchemaError(Vec<String>),

    #[error("batch of {observed} transactions exceeds the cap of {cap}")]
    TooManyTransactionsError { observed: usize, cap: usize },

    #[error("no valid transactions remained after row filtering")]
    EmptyBatchError,

    #[error("internal invariant violated in component '{component}': {detail}")]
    InternalError { component: String, detail: String },
}

impl AnalysisError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::SchemaError(_) => "SCHEMA_MISSING_COLUMNS",
            AnalysisError::TooManyTransactionsError { .. } => "TOO_MANY_TRANSACTIONS",
            AnalysisError::EmptyBatchError => "EMPTY_BATCH",
            AnalysisError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    /// Human-readable detail, identical to the `Display` message.
    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub(crate) fn internal(component: &str, detail: impl Into<String>) -> Self {
        AnalysisError::InternalError {
            component: component.to_string(),
            detail: detail.into(),
        }
    }
}
