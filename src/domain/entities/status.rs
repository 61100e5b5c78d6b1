use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub at: DateTime<Local>,
    pub level: StatusLevel,
    pub message: String,
}

impl StatusEntry {
    /// `[HH:MM:SS] message`
    pub fn render(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub step: Option<String>,
    pub progress: f32,
    pub messages: Vec<String>,
    pub entries: Vec<StatusEntry>,
}

#[derive(Debug, Default)]
struct StatusState {
    entries: VecDeque<StatusEntry>,
    progress: f32,
    step: Option<String>,
}

/// Processing log shown to the user while a document is handled.
///
/// Readers may poll it while an operation holds the session, so it carries
/// its own lock. Every entry is mirrored to `tracing`.
#[derive(Debug)]
pub struct StatusLog {
    state: RwLock<StatusState>,
    max_entries: usize,
}

impl StatusLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(StatusState::default()),
            max_entries: max_entries.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StatusState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StatusState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, level: StatusLevel, message: String) {
        match level {
            StatusLevel::Info | StatusLevel::Success => tracing::info!(status = %message),
            StatusLevel::Warning => tracing::warn!(status = %message),
            StatusLevel::Error => tracing::error!(status = %message),
        }

        let mut state = self.write();
        if state.entries.len() == self.max_entries {
            state.entries.pop_front();
        }
        state.entries.push_back(StatusEntry {
            at: Local::now(),
            level,
            message,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(StatusLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(StatusLevel::Success, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(StatusLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(StatusLevel::Error, message.into());
    }

    pub fn set_progress(&self, progress: f32) {
        self.write().progress = progress.clamp(0.0, 1.0);
    }

    pub fn begin_step(&self, label: impl Into<String>, progress: f32) {
        let label = label.into();
        {
            let mut state = self.write();
            state.step = Some(label.clone());
            state.progress = progress.clamp(0.0, 1.0);
        }
        self.info(label);
    }

    pub fn finish_step(&self) {
        self.write().step = None;
    }

    pub fn clear(&self) {
        *self.write() = StatusState::default();
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.read();
        StatusSnapshot {
            step: state.step.clone(),
            progress: state.progress,
            messages: state.entries.iter().map(StatusEntry::render).collect(),
            entries: state.entries.iter().cloned().collect(),
        }
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(500)
    }
}
