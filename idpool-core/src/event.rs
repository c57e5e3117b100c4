//! De-duplicating auth event notifications.
//!
//! [`AuthEventEmitter`] is owned by the application's composition root and
//! shared by whatever layers report auth state changes. It suppresses an event
//! whose name equals the most recently emitted one.

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Credentials were fetched successfully.
pub const CREDENTIALS_FETCHED: &str = "credentials.fetched";

/// A credential fetch failed.
pub const CREDENTIALS_FETCH_FAILED: &str = "credentials.fetch_failed";

/// Cached credentials were cleared.
pub const CREDENTIALS_CLEARED: &str = "credentials.cleared";

const CHANNEL_CAPACITY: usize = 16;

/// An auth state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub name: String,
}

/// Broadcasts auth events, dropping immediate repeats.
///
/// ```
/// use idpool_core::event::AuthEventEmitter;
///
/// let emitter = AuthEventEmitter::new();
/// assert!(emitter.notify("foo"));
/// assert!(!emitter.notify("foo"));
/// assert!(emitter.notify("bar"));
/// assert!(emitter.notify("foo"));
/// ```
#[derive(Debug)]
pub struct AuthEventEmitter {
    last_sent: Mutex<Option<String>>,
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            last_sent: Mutex::new(None),
            sender,
        }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Emit `event_name` unless it was the last event emitted.
    ///
    /// Returns whether the event was emitted. Events emitted with no
    /// subscribers still count as the last event.
    pub fn notify(&self, event_name: &str) -> bool {
        {
            let mut last_sent = self.last_sent.lock();
            if last_sent.as_deref() == Some(event_name) {
                return false;
            }
            *last_sent = Some(event_name.to_string());
        }

        tracing::debug!("Emitting auth event {}", event_name);
        let _ = self.sender.send(AuthEvent {
            name: event_name.to_string(),
        });
        true
    }
}

impl Default for AuthEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
