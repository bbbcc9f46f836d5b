use log::{debug, warn};
use url::Url;

use super::Backend;
use crate::{error::ViewerError, settings::SettingsBackend};

const LIST_PATH: &str = "list-python-files";
const DOT_PATH: &str = "dot";

/// How much of an error body ends up in the status message.
const MAX_ERROR_BODY: usize = 200;

/// Client of the structure-graph REST API.
///
/// `GET {base}/list-python-files` answers a JSON array of file names,
/// `GET {base}/dot/{file}` answers the DOT text of one file.
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: Result<Url, url::ParseError>,
}

impl HttpBackend {
    /// An unparsable base url is kept as an error and reported by every request.
    pub fn new(settings: &SettingsBackend) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(settings.timeout).build();
        let base_url = Url::parse(settings.base_url.trim_end_matches('/'));
        if let Err(e) = &base_url {
            warn!("invalid backend url {:?}: {e}", settings.base_url);
        }
        Self { agent, base_url }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref().ok()
    }

    /// Base url with `segments` appended, each one percent-encoded as a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self
            .base_url
            .clone()
            .map_err(|e| format!("invalid backend url: {e}"))?;
        url.path_segments_mut()
            .map_err(|()| "backend url cannot take a path".to_string())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: &Url) -> Result<ureq::Response, String> {
        debug!("GET {url}");
        match self.agent.request_url("GET", url).call() {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let msg: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
                warn!("GET {url} answered {code}: {msg}");
                if msg.is_empty() {
                    Err(format!("HTTP {code}"))
                } else {
                    Err(format!("HTTP {code}: {msg}"))
                }
            }
            Err(ureq::Error::Transport(e)) => {
                warn!("GET {url} failed: {e}");
                Err(format!("network error: {e}"))
            }
        }
    }
}

impl Backend for HttpBackend {
    fn list_files(&self) -> Result<Vec<String>, ViewerError> {
        let url = self
            .endpoint(&[LIST_PATH])
            .map_err(ViewerError::ListUnavailable)?;
        let resp = self.get(&url).map_err(ViewerError::ListUnavailable)?;
        serde_json::from_reader(resp.into_reader())
            .map_err(|e| ViewerError::ListUnavailable(format!("malformed file list: {e}")))
    }

    fn graph_description(&self, file_id: &str) -> Result<String, ViewerError> {
        let url = self
            .endpoint(&[DOT_PATH, file_id])
            .map_err(|e| ViewerError::fetch(file_id, e))?;
        let resp = self.get(&url).map_err(|e| ViewerError::fetch(file_id, e))?;
        resp.into_string().map_err(|e| ViewerError::fetch(file_id, e))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread,
        time::Duration,
    };

    use crossbeam::channel::{unbounded, Receiver};

    use super::*;

    /// Serves exactly one canned response and reports the request line it saw.
    fn serve_once(status: &str, body: &str) -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = unbounded();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            tx.send(request_line.trim().to_string()).unwrap();
        });
        (format!("http://{addr}/api"), rx)
    }

    fn backend(base_url: String) -> HttpBackend {
        let mut settings = SettingsBackend::default().with_base_url(base_url);
        settings.timeout = Duration::from_secs(5);
        HttpBackend::new(&settings)
    }

    #[test]
    fn test_list_files() {
        let (url, requests) = serve_once("200 OK", r#"["a.py", "b.py"]"#);
        let files = backend(url).list_files().unwrap();
        assert_eq!(files, vec!["a.py".to_string(), "b.py".to_string()]);
        assert_eq!(requests.recv().unwrap(), "GET /api/list-python-files HTTP/1.1");
    }

    #[test]
    fn test_list_files_malformed() {
        let (url, _requests) = serve_once("200 OK", r#"{"files": 3}"#);
        let err = backend(url).list_files().unwrap_err();
        assert!(matches!(err, ViewerError::ListUnavailable(_)));
    }

    #[test]
    fn test_graph_description() {
        let (url, requests) = serve_once("200 OK", "digraph { a -> b }");
        let text = backend(url).graph_description("my file.py").unwrap();
        assert_eq!(text, "digraph { a -> b }");
        assert_eq!(requests.recv().unwrap(), "GET /api/dot/my%20file.py HTTP/1.1");
    }

    #[test]
    fn test_graph_description_not_found() {
        let (url, _requests) = serve_once("404 Not Found", r#"{"detail":"File not found"}"#);
        let err = backend(url).graph_description("gone.py").unwrap_err();
        match err {
            ViewerError::Fetch { file_id, reason } => {
                assert_eq!(file_id, "gone.py");
                assert!(reason.starts_with("HTTP 404"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_backend() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        // listener dropped, nothing accepts on addr anymore
        let b = backend(format!("http://{addr}/api"));
        assert!(matches!(b.list_files(), Err(ViewerError::ListUnavailable(_))));
        assert!(matches!(
            b.graph_description("a.py"),
            Err(ViewerError::Fetch { .. })
        ));
    }

    #[test]
    fn test_graph_description_escapes_path_separators() {
        let (url, requests) = serve_once("200 OK", "graph { }");
        backend(format!("{url}/")).graph_description("../x y.py").unwrap();
        assert_eq!(requests.recv().unwrap(), "GET /api/dot/..%2Fx%20y.py HTTP/1.1");
    }

    #[test]
    fn test_invalid_base_url_is_reported() {
        let b = backend("not a url".to_string());
        assert!(b.base_url().is_none());
        match b.list_files() {
            Err(ViewerError::ListUnavailable(reason)) => {
                assert!(reason.starts_with("invalid backend url"), "{reason}");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            b.graph_description("a.py"),
            Err(ViewerError::Fetch { .. })
        ));
    }
}
