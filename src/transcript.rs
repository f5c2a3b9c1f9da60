//! Conversation transcript and pending indicator.
//!
//! The transcript is the ordered, append-only list of entries a widget shows.
//! Front-ends do not poll it: they subscribe to [`TranscriptEvent`]s and
//! redraw from those, which is how the terminal renderer and the tests observe
//! ordering between entries and the typing indicator.
//!
//! # Example
//!
//! ```rust
//! use chat_widget::transcript::{Origin, Transcript};
//!
//! let transcript = Transcript::new();
//! transcript.append_entry("Hello", Origin::User);
//!
//! assert!(transcript.show_pending_indicator());
//! assert!(!transcript.show_pending_indicator()); // already shown
//! assert!(transcript.hide_pending_indicator());
//!
//! assert_eq!(transcript.entries().len(), 1);
//! ```

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Typed or triggered by the local user.
    User,
    /// Produced from a backend response (or a local failure notice).
    Bot,
}

/// A single displayed transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// Insertion sequence number, strictly increasing.
    pub seq: u64,
    /// Entry text, shown verbatim.
    pub text: String,
    /// Entry origin.
    pub origin: Origin,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// Change notifications emitted in mutation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// A new entry was appended; views scroll to it.
    EntryAppended(TranscriptEntry),
    /// The oldest entry was dropped to honor the size cap.
    EntryEvicted {
        /// Sequence number of the dropped entry.
        seq: u64,
    },
    /// The typing indicator became visible.
    IndicatorShown,
    /// The typing indicator was removed.
    IndicatorHidden,
}

/// Shared, cloneable handle to a transcript.
///
/// Clones refer to the same entries and the same event channel.
#[derive(Debug, Clone)]
pub struct Transcript {
    inner: Arc<Mutex<TranscriptState>>,
    events: broadcast::Sender<TranscriptEvent>,
}

#[derive(Debug)]
struct TranscriptState {
    entries: VecDeque<TranscriptEntry>,
    next_seq: u64,
    pending: bool,
    max_entries: Option<NonZeroUsize>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Create an empty, uncapped transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_entries(None)
    }

    /// Create an empty transcript that keeps at most `max_entries` entries.
    ///
    /// `None` or `Some(0)` means unbounded.
    #[must_use]
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(TranscriptState {
                entries: VecDeque::new(),
                next_seq: 0,
                pending: false,
                max_entries: max_entries.and_then(NonZeroUsize::new),
            })),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, TranscriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Receivers may come and go; a send with no subscribers is not an error.
    fn emit(&self, event: TranscriptEvent) {
        let _ = self.events.send(event);
    }

    /// Subscribe to change events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    /// Append an entry and notify subscribers.
    pub fn append_entry(&self, text: impl Into<String>, origin: Origin) -> TranscriptEntry {
        let mut state = self.state();

        let entry = TranscriptEntry {
            seq: state.next_seq,
            text: text.into(),
            origin,
            timestamp: Utc::now(),
        };
        state.next_seq += 1;
        state.entries.push_back(entry.clone());
        self.emit(TranscriptEvent::EntryAppended(entry.clone()));

        if let Some(max) = state.max_entries {
            while state.entries.len() > max.get() {
                if let Some(evicted) = state.entries.pop_front() {
                    self.emit(TranscriptEvent::EntryEvicted { seq: evicted.seq });
                }
            }
        }

        entry
    }

    /// Show the typing indicator.
    ///
    /// Returns `false` when it was already visible; no second marker is made.
    pub fn show_pending_indicator(&self) -> bool {
        let mut state = self.state();
        if state.pending {
            return false;
        }
        state.pending = true;
        self.emit(TranscriptEvent::IndicatorShown);
        true
    }

    /// Hide the typing indicator.
    ///
    /// Returns `false` when nothing was visible.
    pub fn hide_pending_indicator(&self) -> bool {
        let mut state = self.state();
        if !state.pending {
            return false;
        }
        state.pending = false;
        self.emit(TranscriptEvent::IndicatorHidden);
        true
    }

    /// Whether the typing indicator is currently visible.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state().pending
    }

    /// Snapshot of the retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.state().entries.iter().cloned().collect()
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn last_entry(&self) -> Option<TranscriptEntry> {
        self.state().entries.back().cloned()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Whether no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
