//! User-visible notices (the dApp's blocking alerts).

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

const MAX_NOTICES: usize = 16;

/// Sink for blocking user notices: wrong network and mint confirmation.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub seq: u64,
    pub message: String,
    /// How many times in a row this message was raised.
    pub repeats: u32,
}

/// Bounded notice log the page reads through `/status`.
///
/// Consecutive identical alerts are coalesced so a polling loop on the wrong
/// network does not flood the page.
#[derive(Default)]
pub struct NoticeBoard {
    inner: Mutex<NoticeLog>,
}

#[derive(Default)]
struct NoticeLog {
    next_seq: u64,
    notices: VecDeque<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self) -> Vec<Notice> {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        log.notices.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Notice> {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        log.notices.back().cloned()
    }

    /// Total alerts raised, repeats included.
    pub fn total(&self) -> u64 {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        log.notices.iter().map(|n| n.repeats as u64).sum()
    }
}

impl Notifier for NoticeBoard {
    fn alert(&self, message: &str) {
        warn!(notice = message, "User notice");
        let mut log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = log.notices.back_mut() {
            if last.message == message {
                last.repeats = last.repeats.saturating_add(1);
                return;
            }
        }
        log.next_seq += 1;
        let seq = log.next_seq;
        log.notices.push_back(Notice {
            seq,
            message: message.to_string(),
            repeats: 1,
        });
        while log.notices.len() > MAX_NOTICES {
            log.notices.pop_front();
        }
    }
}
