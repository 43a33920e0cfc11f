//! Error types for advisory parsing.

use thiserror::Error;

/// Errors that can occur while parsing an EEW report.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// The XML document could not be read.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A timestamp element did not parse as ISO-8601 with offset.
    #[error("invalid timestamp {value:?}: {source}")]
    Time {
        value: String,
        source: chrono::ParseError,
    },

    /// A coordinate token did not parse as a signed decimal.
    #[error("invalid coordinate token {value:?}")]
    Coordinate { value: String },
}
