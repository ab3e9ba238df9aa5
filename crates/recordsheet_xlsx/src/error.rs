//! Error type shared by the configuration, resolution and writer layers.

use rust_xlsxwriter::XlsxError;
use thiserror::Error;

/// Errors raised while configuring or rendering an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A configuration call referenced a key that is not a column.
    #[error("Column not found: {key:?} (available: {available})")]
    UnknownColumn {
        /// Key passed by the caller.
        key: String,
        /// Comma separated list of known keys.
        available: String,
    },

    /// A required argument was absent.
    #[error("Argument must not be None: {param}")]
    MissingArgument {
        /// Name of the missing parameter.
        param: &'static str,
    },

    /// An append placement referenced a worksheet that does not exist.
    #[error("Worksheet not found: {0:?}")]
    SheetNotFound(String),

    /// A text format string could not be applied.
    #[error("Invalid text format {format:?}: {reason}")]
    TextFormat {
        /// The offending format string.
        format: String,
        /// What went wrong.
        reason: String,
    },

    /// Policy values are inconsistent.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// A row or column index exceeds Excel limits.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow {
        /// `row` or `column`.
        axis: &'static str,
        /// Offending zero-based index.
        value: usize,
    },

    /// Error reported by `rust_xlsxwriter`.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
}
