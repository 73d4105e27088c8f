//! Event types for the audioform event stream
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission to
//! dashboard viewers. They carry progress only, never personal fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// audioform event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FormEvent {
    /// A visitor opened a tenant route and a session was created
    SessionStarted {
        session_id: Uuid,
        company: String,
        timestamp: DateTime<Utc>,
    },

    /// A session moved forward one step
    StepChanged {
        session_id: Uuid,
        /// Step name (`intro`, `employment`)
        step: String,
        timestamp: DateTime<Utc>,
    },

    /// A submission reached the store
    SubmissionStored {
        session_id: Uuid,
        company: String,
        employment_status: bool,
        timestamp: DateTime<Utc>,
    },

    /// A submission attempt failed and the session stays open for retry
    SubmissionFailed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl FormEvent {
    /// SSE `event:` field value
    pub fn event_type(&self) -> &'static str {
        match self {
            FormEvent::SessionStarted { .. } => "SessionStarted",
            FormEvent::StepChanged { .. } => "StepChanged",
            FormEvent::SubmissionStored { .. } => "SubmissionStored",
            FormEvent::SubmissionFailed { .. } => "SubmissionFailed",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel: publishing never blocks, slow subscribers
/// lag and drop old events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FormEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FormEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
