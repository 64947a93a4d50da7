use chrono::{DateTime, Utc};
use pdf_brief_core::{SummaryProgress, SummaryResult};
use serde::Serialize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Uploading,
    Summarizing,
    Answering,
}

/// What a session is doing right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityStatus {
    pub busy: bool,
    pub action: Option<Action>,
    pub started_at: Option<DateTime<Utc>>,
    /// Page most recently sent for summarizing.
    pub current_page: Option<u32>,
    pub pages_done: usize,
    pub pages_total: usize,
}

/// Per-session status kept beside the session lock, so it stays readable
/// while a long action holds that lock.
pub struct SessionActivity {
    status: RwLock<ActivityStatus>,
    last_active: RwLock<Instant>,
}

impl Default for SessionActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionActivity {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(ActivityStatus::default()),
            last_active: RwLock::new(Instant::now()),
        }
    }

    pub fn status(&self) -> ActivityStatus {
        self.status
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.status().busy
    }

    pub fn touch(&self) {
        if let Ok(mut guard) = self.last_active.write() {
            *guard = Instant::now();
        }
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        self.last_active
            .read()
            .map(|guard| now.saturating_duration_since(*guard))
            .unwrap_or_default()
    }

    /// Marks the session busy until the returned guard is dropped.
    pub fn begin(&self, action: Action) -> ActivityGuard<'_> {
        self.update(|status| {
            *status = ActivityStatus {
                busy: true,
                action: Some(action),
                started_at: Some(Utc::now()),
                ..ActivityStatus::default()
            }
        });
        ActivityGuard { activity: self }
    }

    fn update(&self, apply: impl FnOnce(&mut ActivityStatus)) {
        if let Ok(mut guard) = self.status.write() {
            apply(&mut *guard);
        }
    }
}

impl SummaryProgress for SessionActivity {
    fn page_started(&self, page: u32, _position: usize, total: usize) {
        self.update(|status| {
            status.current_page = Some(page);
            status.pages_total = total;
        });
    }

    fn page_finished(&self, _result: &SummaryResult) {
        self.update(|status| status.pages_done += 1);
    }
}

pub struct ActivityGuard<'a> {
    activity: &'a SessionActivity,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.activity.update(|status| *status = ActivityStatus::default());
        self.activity.touch();
    }
}
