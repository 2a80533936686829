//! Error types for report rendering.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::RowsError;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Everything that can stop a report from being rendered.
///
/// Degraded resources (a missing bold font or logo) never show up here; they are
/// resolved to a fallback before the document is assembled.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The required regular font file does not exist.
    #[error("font not found at {}. Place an Arabic-capable TTF file there (see --assets-dir).", path.display())]
    MissingFont { path: PathBuf },

    /// The font file exists but could not be read or parsed.
    #[error("failed to load font {}: {source}", path.display())]
    FontLoad {
        path: PathBuf,
        #[source]
        source: genpdf::error::Error,
    },

    /// The layout engine failed while building or writing the document.
    #[error("failed to lay out the document: {0}")]
    Layout(#[from] genpdf::error::Error),

    /// The rendered bytes could not be reopened to write document metadata.
    #[error("failed to write document metadata: {0}")]
    Metadata(#[from] lopdf::Error),

    /// The rows payload was not a list of `{name, reason}` objects.
    #[error(transparent)]
    MalformedRows(#[from] RowsError),
}

impl ReportError {
    /// Whether the error was caused by the request rather than the deployment.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedRows(_))
    }
}
