//! Bounded event logs.
//!
//! Each player has a short log of things that happened to them ("You picked
//! up 4 x Pine Wood"), and the world has a longer one for joins, departures,
//! deaths and chat. Both are [`EventLog`]s: when full, the oldest entry is
//! dropped.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Severity of an event, used by renderers for styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventClass {
    Warning,
    Success,
    Danger,
    Info,
}

/// One log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub class: EventClass,
    pub text: String,
    /// Who said it, for chat lines.
    pub subject: Option<String>,
    /// World time of the event.
    pub at: Duration,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{subject}: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// A fixed-length log, oldest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    limit: usize,
    entries: VecDeque<Event>,
}

impl EventLog {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: VecDeque::with_capacity(limit),
        }
    }

    pub fn push(&mut self, class: EventClass, text: impl Into<String>, at: Duration) {
        self.push_entry(Event {
            class,
            text: text.into(),
            subject: None,
            at,
        });
    }

    pub fn push_with_subject(
        &mut self,
        class: EventClass,
        text: impl Into<String>,
        subject: impl Into<String>,
        at: Duration,
    ) {
        self.push_entry(Event {
            class,
            text: text.into(),
            subject: Some(subject.into()),
            at,
        });
    }

    fn push_entry(&mut self, event: Event) {
        self.entries.push_back(event);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per entry, oldest first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event in &self.entries {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        out
    }
}
