use std::{collections::VecDeque, time::Duration};

use instant::Instant;

use crate::error::ViewerError;

const TIMEOUT_INFO: Duration = Duration::from_millis(3000);
const TIMEOUT_SUCCESS: Duration = Duration::from_millis(3500);
const TIMEOUT_ERROR: Duration = Duration::from_millis(8000);

/// Oldest messages are dropped beyond this many.
const MAX_MESSAGES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMsg {
    pub kind: StatusKind,
    pub text: String,
    pub at: Instant,
    pub timeout: Duration,
}

impl StatusMsg {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.at) > self.timeout
    }
}

/// User visible messages of the status bar; each one expires after its timeout.
#[derive(Debug, Default)]
pub struct StatusQueue {
    q: VecDeque<StatusMsg>,
}

impl StatusQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.q.clear();
    }

    pub fn push_custom(&mut self, kind: StatusKind, text: impl Into<String>, timeout: Duration) {
        if self.q.len() == MAX_MESSAGES {
            self.q.pop_front();
        }
        self.q.push_back(StatusMsg {
            kind,
            text: text.into(),
            at: Instant::now(),
            timeout,
        });
    }

    pub fn push_info(&mut self, text: impl Into<String>) {
        self.push_custom(StatusKind::Info, text, TIMEOUT_INFO);
    }

    pub fn push_success(&mut self, text: impl Into<String>) {
        self.push_custom(StatusKind::Success, text, TIMEOUT_SUCCESS);
    }

    pub fn push_error(&mut self, err: &ViewerError) {
        self.push_custom(StatusKind::Error, err.to_string(), TIMEOUT_ERROR);
    }

    pub fn retain_active(&mut self) {
        self.retain_active_now(Instant::now());
    }

    pub fn retain_active_now(&mut self, now: Instant) {
        self.q.retain(|m| !m.is_expired_at(now));
    }

    /// Most recent message.
    pub fn latest(&self) -> Option<&StatusMsg> {
        self.q.back()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_and_latest() {
        let mut sq = StatusQueue::new();
        sq.push_custom(StatusKind::Info, "i1", Duration::from_millis(100));
        sq.push_custom(StatusKind::Success, "ok1", Duration::from_millis(200));

        sq.retain_active_now(Instant::now() + Duration::from_millis(150));
        assert_eq!(sq.len(), 1);
        let latest = sq.latest().unwrap();
        assert_eq!(latest.kind, StatusKind::Success);
        assert_eq!(latest.text, "ok1");

        sq.retain_active_now(Instant::now() + Duration::from_millis(250));
        assert!(sq.is_empty());
    }

    #[test]
    fn test_errors_outlive_info() {
        let mut sq = StatusQueue::new();
        sq.push_info("loading a.py");
        sq.push_error(&ViewerError::EmptyGraph {
            file_id: "a.py".to_string(),
        });

        sq.retain_active_now(Instant::now() + Duration::from_secs(5));
        assert_eq!(sq.len(), 1);
        assert_eq!(sq.latest().unwrap().kind, StatusKind::Error);
        assert!(sq.latest().unwrap().text.contains("a.py"));
    }

    #[test]
    fn test_bounded() {
        let mut sq = StatusQueue::new();
        for i in 0..(MAX_MESSAGES + 5) {
            sq.push_info(format!("m{i}"));
        }
        assert_eq!(sq.len(), MAX_MESSAGES);
        assert_eq!(sq.latest().unwrap().text, format!("m{}", MAX_MESSAGES + 4));
    }
}
