use std::fmt;

use crate::layout::DotParseError;

/// Errors surfaced by the viewer.
///
/// Every kind is terminal for the user action that triggered it only: it is shown as a
/// status message and never replaces the graph that is currently displayed.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// The file listing could not be retrieved or was malformed.
    ListUnavailable(String),
    /// The graph description for `file_id` could not be retrieved.
    Fetch { file_id: String, reason: String },
    /// The graph description for `file_id` was empty or whitespace only.
    EmptyGraph { file_id: String },
    /// The graph description is not a well-formed graph.
    Layout(DotParseError),
    /// An operation was invoked on a disposed or unattached viewport.
    InvalidState(&'static str),
}

impl ViewerError {
    pub fn fetch(file_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Fetch {
            file_id: file_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Short category name, used as the status message prefix.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListUnavailable(_) => "list unavailable",
            Self::Fetch { .. } => "fetch error",
            Self::EmptyGraph { .. } => "empty graph",
            Self::Layout(_) => "layout error",
            Self::InvalidState(_) => "invalid state",
        }
    }
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListUnavailable(reason) => write!(f, "file list unavailable: {reason}"),
            Self::Fetch { file_id, reason } => {
                write!(f, "failed to fetch graph for {file_id}: {reason}")
            }
            Self::EmptyGraph { file_id } => write!(f, "graph description for {file_id} is empty"),
            Self::Layout(err) => write!(f, "{err}"),
            Self::InvalidState(op) => write!(f, "viewport is not attached: {op}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DotParseError> for ViewerError {
    fn from(err: DotParseError) -> Self {
        Self::Layout(err)
    }
}
