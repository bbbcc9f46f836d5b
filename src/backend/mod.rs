mod directory;
mod http;

use std::sync::Arc;

pub use directory::DirectoryBackend;
pub use http::HttpBackend;

use crate::{error::ViewerError, settings::SettingsBackend};

/// Source of selectable files and of the graph description for each of them.
///
/// Calls block; the viewer only invokes them from worker threads.
pub trait Backend: Send + Sync {
    /// Identifiers of the files a graph can be requested for, in display order.
    ///
    /// # Errors
    ///
    /// [`ViewerError::ListUnavailable`] when the source is unreachable or answers with
    /// something other than a list of identifiers.
    fn list_files(&self) -> Result<Vec<String>, ViewerError>;

    /// Textual graph description of one file.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Fetch`] when the description cannot be retrieved, including unknown
    /// identifiers.
    fn graph_description(&self, file_id: &str) -> Result<String, ViewerError>;
}

/// Picks the directory backend when a directory is configured, the REST backend otherwise.
pub fn from_settings(settings: &SettingsBackend) -> Arc<dyn Backend> {
    match &settings.directory {
        Some(dir) => {
            log::info!("serving graphs from directory {}", dir.display());
            Arc::new(DirectoryBackend::new(dir.clone()))
        }
        None => {
            log::info!("serving graphs from {}", settings.base_url);
            Arc::new(HttpBackend::new(settings))
        }
    }
}
