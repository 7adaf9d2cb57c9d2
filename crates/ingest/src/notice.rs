//! User-facing notices produced by intake and drain passes.

use std::collections::VecDeque;

use serde::Serialize;

/// Default number of notices retained before the oldest is dropped.
pub const DEFAULT_NOTICE_CAPACITY: usize = 100;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl NoticeLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// One notification for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Bounded notice history with monotonic ids.
///
/// Display timing and dismissal animation belong to the front end; this
/// only keeps the recent history.
#[derive(Debug, Clone)]
pub struct NoticeLog {
    notices: VecDeque<Notice>,
    next_id: u64,
    capacity: usize,
}

impl NoticeLog {
    /// Creates an empty log keeping at most `capacity` notices (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            notices: VecDeque::new(),
            next_id: 0,
            capacity: capacity.max(1),
        }
    }

    /// Records a notice and returns a copy of it.
    pub fn push(
        &mut self,
        level: NoticeLevel,
        title: impl Into<String>,
        detail: Option<String>,
    ) -> Notice {
        let notice = Notice {
            id: self.next_id,
            level,
            title: title.into(),
            detail,
        };
        self.next_id += 1;
        if self.notices.len() == self.capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(notice.clone());
        notice
    }

    pub fn success(&mut self, title: impl Into<String>, detail: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Success, title, Some(detail.into()))
    }

    pub fn error(&mut self, title: impl Into<String>, detail: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Error, title, Some(detail.into()))
    }

    pub fn warning(&mut self, title: impl Into<String>, detail: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Warning, title, Some(detail.into()))
    }

    pub fn info(&mut self, title: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Info, title, None)
    }

    /// Removes a notice by id. Returns `true` if it was present.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let len_before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != len_before
    }

    /// Notices oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

impl Default for NoticeLog {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let mut log = NoticeLog::default();
        let a = log.info("first");
        let b = log.error("second", "detail");
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
        let titles: Vec<_> = log.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn helpers_set_level_and_detail() {
        let mut log = NoticeLog::default();
        assert_eq!(log.success("s", "d").level, NoticeLevel::Success);
        assert_eq!(log.warning("w", "d").level, NoticeLevel::Warning);
        let e = log.error("e", "bad file");
        assert_eq!(e.level, NoticeLevel::Error);
        assert_eq!(e.detail.as_deref(), Some("bad file"));
        assert!(log.info("i").detail.is_none());
    }

    #[test]
    fn oldest_dropped_at_capacity() {
        let mut log = NoticeLog::new(2);
        log.info("a");
        log.info("b");
        log.info("c");
        let titles: Vec<_> = log.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
        // Ids keep counting after eviction.
        assert_eq!(log.info("d").id, 3);
    }

    #[test]
    fn dismiss_by_id() {
        let mut log = NoticeLog::default();
        let a = log.info("a");
        log.info("b");
        assert!(log.dismiss(a.id));
        assert!(!log.dismiss(a.id));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut log = NoticeLog::new(0);
        log.info("a");
        log.info("b");
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }

    #[test]
    fn level_serializes_lowercase() {
        let mut log = NoticeLog::default();
        let n = log.warning("Already queued", "a.xml");
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"level\":\"warning\""));
    }
}
