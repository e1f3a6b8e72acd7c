//! Status log: the user-facing, tone-tagged message stream.
//!
//! Entries are append-only.  The log retains at most `max_entries` (oldest
//! evicted first); eviction never changes the current tone, which is always
//! the tone of the most recent entry.

use std::collections::VecDeque;

use crate::config::StatusConfig;

/// Styling hint for a status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Neutral,
    Success,
    Error,
}

impl Tone {
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Neutral => "info",
            Tone::Success => "ok",
            Tone::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub text: String,
    pub tone: Tone,
}

impl StatusEntry {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusLog {
    entries: VecDeque<StatusEntry>,
    max_entries: usize,
    appended: u64,
}

impl StatusLog {
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: config.max_entries.max(1),
            appended: 0,
        }
    }

    pub fn append(&mut self, entry: StatusEntry) {
        log::debug!("status [{}]: {}", entry.tone.label(), entry.text);
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.appended += 1;
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.append(StatusEntry::new(text, Tone::Neutral));
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.append(StatusEntry::new(text, Tone::Success));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.append(StatusEntry::new(text, Tone::Error));
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&StatusEntry> {
        self.entries.back()
    }

    /// Tone of the most recent entry; `Neutral` while empty.
    pub fn current_tone(&self) -> Tone {
        self.latest().map(|e| e.tone).unwrap_or_default()
    }

    /// Total number of entries ever appended, including evicted ones.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(&StatusConfig::default())
    }
}
