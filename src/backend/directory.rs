use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use super::Backend;
use crate::error::ViewerError;

const DEFAULT_EXTENSIONS: &[&str] = &["dot", "gv"];

/// Serves pre-rendered DOT files from a local directory.
///
/// File identifiers are plain file names inside the directory.
pub struct DirectoryBackend {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Extensions, without the dot, of the files that are listed and served.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// Resolves an identifier to a path inside the root, refusing anything that could
    /// point elsewhere.
    fn resolve(&self, file_id: &str) -> Result<PathBuf, ViewerError> {
        let candidate = Path::new(file_id);
        let mut components = candidate.components();
        let single_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_name || file_id.contains(['/', '\\']) {
            return Err(ViewerError::fetch(file_id, "not found"));
        }
        if !self.has_extension(candidate) {
            return Err(ViewerError::fetch(
                file_id,
                format!("unsupported file type, expected one of: {}", self.extensions.join(", ")),
            ));
        }
        Ok(self.root.join(candidate))
    }
}

impl Backend for DirectoryBackend {
    fn list_files(&self) -> Result<Vec<String>, ViewerError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            ViewerError::ListUnavailable(format!("{}: {e}", self.root.display()))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ViewerError::ListUnavailable(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() || !self.has_extension(&path) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(name) => log::warn!("skipping non utf-8 file name {name:?}"),
            }
        }
        files.sort();

        log::debug!("found {} graph files in {}", files.len(), self.root.display());
        Ok(files)
    }

    fn graph_description(&self, file_id: &str) -> Result<String, ViewerError> {
        let path = self.resolve(file_id)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ViewerError::fetch(file_id, "not found"),
            _ => ViewerError::fetch(file_id, e),
        })
    }
}
