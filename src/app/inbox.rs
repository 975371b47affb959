//! Inbound event queue for asynchronous collaborators.
//!
//! Uses an `embassy-sync` bounded MPMC channel to bridge threads that
//! finish work on their own (camera warm-up, network buttons) with the
//! single-threaded service loop.  Producers only enqueue; the service
//! drains the inbox and publishes each event on its own thread, so event
//! handling stays serialized.
//!
//! ```text
//! ┌──────────────┐   Event    ┌───────────────────┐
//! │ Camera setup │───────────▶│                   │
//! │ Net button   │───────────▶│   GarageService   │
//! │  (threads)   │  try_send  │ (drain + publish) │
//! └──────────────┘            └───────────────────┘
//! ```
//!
//! Unlike a `static` channel each service owns its inbox, so several
//! services in one process never share state.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::warn;

use crate::events::Event;

/// Inbox depth.  Producers see `Err` when the service falls this far behind.
pub const INBOX_DEPTH: usize = 16;

type EventChannel = Channel<CriticalSectionRawMutex, Event, INBOX_DEPTH>;

/// Consumer side, owned by the service.
pub struct Inbox {
    channel: Arc<EventChannel>,
}

/// Producer side.  Cheap to clone and `Send`.
#[derive(Clone)]
pub struct InboxSender {
    channel: Arc<EventChannel>,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Channel::new()),
        }
    }

    pub fn sender(&self) -> InboxSender {
        InboxSender {
            channel: Arc::clone(&self.channel),
        }
    }

    /// Take the oldest queued event, if any.
    pub fn try_take(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl InboxSender {
    /// Queue an event for the service.  Returns the event back if the
    /// inbox is full.
    pub fn post(&self, event: Event) -> Result<(), Event> {
        self.channel.try_send(event).map_err(|TrySendError::Full(event)| {
            warn!("Inbox: full, dropping {}", event);
            event
        })
    }
}
