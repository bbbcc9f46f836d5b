use crossbeam::channel::Sender;
use egui::{ComboBox, Response, Ui};
use log::{debug, error, info, warn};

use crate::{backend::Backend, error::ViewerError};

const NO_FILES: &str = "no files";

/// Observer of selection changes.
pub trait SelectionSink: Send {
    fn selection_changed(&self, file_id: &str);
}

impl SelectionSink for Sender<String> {
    fn selection_changed(&self, file_id: &str) {
        if self.send(file_id.to_string()).is_err() {
            debug!("selection receiver is gone, dropping change to {file_id}");
        }
    }
}

impl<F: Fn(&str) + Send> SelectionSink for F {
    fn selection_changed(&self, file_id: &str) {
        self(file_id);
    }
}

/// List of selectable files and the current selection.
///
/// The selection, when set, is always one of the listed files. Exactly one observer is
/// notified of changes; the first file becomes the default selection once the list
/// arrives and is announced like any other change.
#[derive(Default)]
pub struct FilePicker {
    files: Vec<String>,
    selected: Option<String>,
    sink: Option<Box<dyn SelectionSink>>,
    /// Announcement waiting for an observer to be registered.
    held: Option<String>,
    initialized: bool,
}

impl FilePicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves the file list from `backend`.
    ///
    /// # Errors
    ///
    /// [`ViewerError::ListUnavailable`] when the backend cannot provide the list.
    pub fn initialize(&mut self, backend: &dyn Backend) -> Result<&[String], ViewerError> {
        let listing = backend.list_files();
        self.install(listing)
    }

    /// Installs a listing that was retrieved elsewhere, e.g. on a worker thread.
    ///
    /// # Errors
    ///
    /// Passes the listing error through; the picker stays as it was.
    pub fn install(
        &mut self,
        listing: Result<Vec<String>, ViewerError>,
    ) -> Result<&[String], ViewerError> {
        let files = match listing {
            Ok(files) => files,
            Err(err) => {
                error!("file list unavailable: {err}");
                return Err(err);
            }
        };

        if self.initialized {
            warn!("file list replaced after initialization");
        }
        self.files = files;
        self.initialized = true;
        info!("{} files available", self.files.len());

        let keep = self
            .selected
            .as_ref()
            .is_some_and(|s| self.files.contains(s));
        if !keep {
            self.selected = self.files.first().cloned();
            if let Some(first) = self.selected.clone() {
                debug!("defaulting selection to {first}");
                self.announce(first);
            }
        }

        Ok(&self.files)
    }

    /// Registers the observer, replacing a previous one. A held default selection is
    /// delivered right away.
    pub fn on_selection_change(&mut self, sink: impl SelectionSink + 'static) {
        let sink: Box<dyn SelectionSink> = Box::new(sink);
        if let Some(file_id) = self.held.take() {
            sink.selection_changed(&file_id);
        }
        self.sink = Some(sink);
    }

    /// Selects `file_id` on behalf of the user. Returns whether the selection changed.
    pub fn select(&mut self, file_id: &str) -> bool {
        if !self.files.iter().any(|f| f == file_id) {
            warn!("ignoring selection of unlisted file {file_id}");
            return false;
        }
        if self.selected.as_deref() == Some(file_id) {
            return false;
        }
        self.selected = Some(file_id.to_string());
        self.announce(file_id.to_string());
        true
    }

    fn announce(&mut self, file_id: String) {
        match &self.sink {
            Some(sink) => sink.selection_changed(&file_id),
            None => self.held = Some(file_id),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Combo box listing the files; picking one goes through [`select`](Self::select).
    pub fn show(&mut self, ui: &mut Ui) -> Response {
        let mut choice = None;
        let text = self.selected.as_deref().unwrap_or(NO_FILES).to_string();
        let inner = ui.add_enabled_ui(!self.files.is_empty(), |ui| {
            ComboBox::from_id_salt("dotview_file_picker")
                .selected_text(text)
                .width(ui.available_width().min(280.))
                .show_ui(ui, |ui| {
                    for f in &self.files {
                        let checked = self.selected.as_ref() == Some(f);
                        if ui.selectable_label(checked, f).clicked() {
                            choice = Some(f.clone());
                        }
                    }
                })
                .response
        });
        if let Some(file_id) = choice {
            self.select(&file_id);
        }
        inner.inner
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crossbeam::channel::unbounded;

    use super::*;

    struct ListBackend(Result<Vec<String>, ViewerError>);

    impl Backend for ListBackend {
        fn list_files(&self) -> Result<Vec<String>, ViewerError> {
            self.0.clone()
        }

        fn graph_description(&self, file_id: &str) -> Result<String, ViewerError> {
            Err(ViewerError::fetch(file_id, "not found"))
        }
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        (seen, move |id: &str| sink_seen.lock().unwrap().push(id.to_string()))
    }

    #[test]
    fn test_default_selection_announced_once() {
        let (seen, sink) = recorder();
        let mut p = FilePicker::new();
        p.on_selection_change(sink);

        let listed = p
            .initialize(&ListBackend(Ok(files(&["a.py", "b.py"]))))
            .unwrap()
            .to_vec();
        assert_eq!(listed, files(&["a.py", "b.py"]));
        assert_eq!(p.selected(), Some("a.py"));
        assert_eq!(*seen.lock().unwrap(), files(&["a.py"]));
    }

    #[test]
    fn test_default_held_until_observer() {
        let mut p = FilePicker::new();
        p.install(Ok(files(&["a.py"]))).unwrap();

        let (tx, rx) = unbounded();
        p.on_selection_change(tx);
        assert_eq!(rx.try_recv().unwrap(), "a.py");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_select_changes_and_rejects() {
        let (seen, sink) = recorder();
        let mut p = FilePicker::new();
        p.install(Ok(files(&["a.py", "b.py"]))).unwrap();
        p.on_selection_change(sink);

        assert!(p.select("b.py"));
        assert!(!p.select("b.py"));
        assert!(!p.select("c.py"));
        assert_eq!(p.selected(), Some("b.py"));
        assert_eq!(*seen.lock().unwrap(), files(&["a.py", "b.py"]));
    }

    #[test]
    fn test_empty_list_is_valid() {
        let (seen, sink) = recorder();
        let mut p = FilePicker::new();
        p.on_selection_change(sink);
        assert!(p.install(Ok(vec![])).unwrap().is_empty());
        assert!(p.is_initialized());
        assert_eq!(p.selected(), None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_list_unavailable() {
        let mut p = FilePicker::new();
        let err = p
            .initialize(&ListBackend(Err(ViewerError::ListUnavailable(
                "connection refused".to_string(),
            ))))
            .unwrap_err();
        assert!(matches!(err, ViewerError::ListUnavailable(_)));
        assert!(!p.is_initialized());
        assert_eq!(p.selected(), None);
    }

    #[test]
    fn test_replacing_observer() {
        let (first, first_sink) = recorder();
        let (second, second_sink) = recorder();
        let mut p = FilePicker::new();
        p.install(Ok(files(&["a.py", "b.py"]))).unwrap();
        p.on_selection_change(first_sink);
        p.on_selection_change(second_sink);
        p.select("b.py");

        assert_eq!(*first.lock().unwrap(), files(&["a.py"]));
        assert_eq!(*second.lock().unwrap(), files(&["b.py"]));
    }

    #[test]
    fn test_show_renders_headless() {
        let mut p = FilePicker::new();
        p.install(Ok(files(&["a.py"]))).unwrap();
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                p.show(ui);
            });
        });
        assert_eq!(p.selected(), Some("a.py"));
    }
}
