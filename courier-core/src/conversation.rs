//! Conversation reconciliation for Courier.
//!
//! The [`Reconciler`] owns the single materialized [`Conversation`]: the
//! active peer's timeline. It merges two sources:
//! - history fetches, applied once per selection after a stable sort
//! - live `chat_message` events, appended at the tail in arrival order
//!
//! Every history fetch is tagged with a [`FetchTicket`]. Selecting another
//! peer (or the same one again) bumps the generation, so a fetch that
//! resolves late is recognized as stale and discarded.
//!
//! The backend echoes our own messages without naming the receiver. Local
//! sends are therefore kept in a short log, and a receiver-less echo is
//! attributed only through the log entry it matches.

use std::collections::VecDeque;

use courier_types::{LiveMessage, Message, Peer, PeerRef, UserId};

/// How many trailing entries are checked when de-duplicating live events.
pub const DEDUP_WINDOW: usize = 5;

/// How many unechoed local sends are remembered for attribution.
pub const SENT_LOG_LEN: usize = 32;

/// Tag identifying one history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    peer_id: UserId,
    generation: u64,
}

impl FetchTicket {
    /// The peer the fetch targets.
    pub fn peer_id(&self) -> UserId {
        self.peer_id
    }

    /// Selection generation the fetch belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Category of a failed history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential rejected; re-authentication needed.
    Unauthorized,
    /// Backend unavailable; retry by re-selecting the peer.
    Unreachable,
    /// Anything else the backend reported.
    Other,
}

/// Load state of the active timeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryStatus {
    /// No peer selected.
    #[default]
    Idle,
    /// Fetch in flight.
    Loading,
    /// History applied.
    Loaded,
    /// Fetch failed; the timeline only holds live events received since.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// Human-readable reason.
        reason: String,
    },
}

/// The active peer's ordered timeline.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    peer: Option<Peer>,
    entries: Vec<Message>,
    status: HistoryStatus,
}

impl Conversation {
    /// The peer this timeline belongs to.
    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    /// Entries in display order.
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// Load state.
    pub fn status(&self) -> &HistoryStatus {
        &self.status
    }

    /// Whether the last history fetch failed.
    pub fn has_error(&self) -> bool {
        matches!(self.status, HistoryStatus::Failed { .. })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of applying a history fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Timeline replaced; holds this many entries.
    Applied {
        /// Entries after the replace, including carried-over pending sends.
        count: usize,
    },
    /// Failure recorded on the timeline.
    Failed,
    /// The ticket no longer matches the selection; nothing changed.
    Stale,
}

/// Result of applying a live chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveOutcome {
    /// Appended at the tail.
    Appended(Message),
    /// Matched a pending optimistic entry, which is now confirmed.
    Confirmed(Message),
    /// Already present among the trailing entries; dropped.
    Duplicate,
    /// Belongs to a timeline that is not materialized.
    Elsewhere(LiveMessage),
}

/// Merges history and live events into the active conversation.
#[derive(Debug, Clone)]
pub struct Reconciler {
    me: String,
    generation: u64,
    conversation: Conversation,
    sent: VecDeque<Message>,
}

impl Reconciler {
    /// Create a reconciler for the session user `me`.
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            generation: 0,
            conversation: Conversation::default(),
            sent: VecDeque::new(),
        }
    }

    /// Read-only view of the active timeline.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The selected peer, if any.
    pub fn active_peer(&self) -> Option<&Peer> {
        self.conversation.peer()
    }

    /// Switch to `peer`: clears the timeline and issues a ticket for the fetch.
    ///
    /// Selecting the current peer again is the retry path after a failure.
    pub fn select_peer(&mut self, peer: Peer) -> FetchTicket {
        self.generation += 1;
        let ticket = FetchTicket {
            peer_id: peer.id,
            generation: self.generation,
        };
        self.conversation = Conversation {
            peer: Some(peer),
            entries: Vec::new(),
            status: HistoryStatus::Loading,
        };
        ticket
    }

    /// Deselect: no active peer, empty timeline, in-flight fetch invalidated.
    pub fn clear_selection(&mut self) {
        self.generation += 1;
        self.conversation = Conversation::default();
    }

    /// Check whether a fetch result may still be applied.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation
            && self.active_peer().map(|p| p.id) == Some(ticket.peer_id)
    }

    /// Apply a successful fetch.
    ///
    /// Replaces the timeline with `messages`, stable-sorted by send time.
    /// Entries for other peers are dropped. Pending sends appended while the
    /// fetch was in flight stay at the tail unless history already holds them.
    pub fn apply_history(&mut self, ticket: FetchTicket, mut messages: Vec<Message>) -> HistoryOutcome {
        if !self.is_current(&ticket) {
            return HistoryOutcome::Stale;
        }

        messages.retain(|m| m.peer_id == ticket.peer_id);
        messages.sort_by_key(|m| m.sent_at);

        let pending: Vec<Message> = std::mem::take(&mut self.conversation.entries)
            .into_iter()
            .filter(|m| m.is_pending() && !messages.iter().any(|h| h.same_as(m)))
            .collect();
        messages.extend(pending);

        let count = messages.len();
        self.conversation.entries = messages;
        self.conversation.status = HistoryStatus::Loaded;
        HistoryOutcome::Applied { count }
    }

    /// Record a failed fetch as an inline error on the timeline.
    pub fn fail_history(
        &mut self,
        ticket: FetchTicket,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> HistoryOutcome {
        if !self.is_current(&ticket) {
            return HistoryOutcome::Stale;
        }

        self.conversation.status = HistoryStatus::Failed {
            kind,
            reason: reason.into(),
        };
        HistoryOutcome::Failed
    }

    /// Route a live chat message.
    ///
    /// The counterpart is the sender, or the receiver field when the sender
    /// is the session user. A self-sent message without a receiver field is
    /// attributed through the sent log; one that matches no logged send is
    /// only recognized as a replay of an entry already on the timeline.
    /// Matching messages are appended unless they duplicate one of the last
    /// [`DEDUP_WINDOW`] entries.
    pub fn apply_live(&mut self, live: LiveMessage) -> LiveOutcome {
        let counterpart = match live.counterpart(&self.me) {
            Some(counterpart) => Some(counterpart),
            None => self.take_sent(&live).map(PeerRef::Id),
        };
        let Some(active_id) = self.active_peer().map(|p| p.id) else {
            return LiveOutcome::Elsewhere(live);
        };
        let Some(counterpart) = counterpart else {
            return self.replay_or_elsewhere(live, active_id);
        };
        if !self.active_peer().is_some_and(|active| counterpart.matches(active)) {
            return LiveOutcome::Elsewhere(live);
        }

        let message = match live.clone().into_message(active_id) {
            Ok(message) => message,
            Err(_) => return LiveOutcome::Elsewhere(live),
        };

        let entries = &mut self.conversation.entries;
        let start = entries.len().saturating_sub(DEDUP_WINDOW);
        for entry in entries[start..].iter_mut() {
            if entry.same_as(&message) {
                if entry.is_pending() {
                    entry.confirm_with(&message);
                    return LiveOutcome::Confirmed(entry.clone());
                }
                return LiveOutcome::Duplicate;
            }
        }

        entries.push(message.clone());
        LiveOutcome::Appended(message)
    }

    /// Optimistically append a locally sent message.
    ///
    /// The send is logged for echo attribution either way. Returns `false`
    /// (and appends nothing) when the message is not for the active peer.
    pub fn append_local(&mut self, message: Message) -> bool {
        if self.sent.len() == SENT_LOG_LEN {
            self.sent.pop_front();
        }
        self.sent.push_back(message.clone());

        match self.active_peer() {
            Some(peer) if peer.id == message.peer_id => {
                self.conversation.entries.push(message);
                true
            }
            _ => false,
        }
    }

    /// Remove and return the peer of the oldest logged send `live` echoes.
    fn take_sent(&mut self, live: &LiveMessage) -> Option<UserId> {
        let pos = self.sent.iter().position(|sent| {
            live.clone()
                .into_message(sent.peer_id)
                .is_ok_and(|echo| sent.same_as(&echo))
        })?;
        self.sent.remove(pos).map(|sent| sent.peer_id)
    }

    fn replay_or_elsewhere(&self, live: LiveMessage, active_id: UserId) -> LiveOutcome {
        let Ok(message) = live.clone().into_message(active_id) else {
            return LiveOutcome::Elsewhere(live);
        };
        let entries = self.conversation.entries();
        let start = entries.len().saturating_sub(DEDUP_WINDOW);
        if entries[start..].iter().any(|e| !e.is_pending() && e.same_as(&message)) {
            LiveOutcome::Duplicate
        } else {
            LiveOutcome::Elsewhere(live)
        }
    }
}
