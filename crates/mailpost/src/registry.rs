//! In-flight session registry.
//!
//! The registry owns every live [`Session`]. Connection tasks hold only a
//! [`SessionId`] and look the session up for each event; once an entry is
//! removed, lookups fail and the event is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mailpost_smtp::{Session, State};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::delivery::Outcome;
use crate::error::DeliveryError;

/// Unique identifier of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry {
    session: Session,
    notify: oneshot::Sender<Outcome>,
    task: Option<AbortHandle>,
}

/// Map from identifier to live session.
///
/// The lock is only held for a map operation or one synchronous state
/// machine step, never across an `.await`.
#[derive(Default)]
pub(crate) struct Registry {
    sessions: Mutex<HashMap<SessionId, Entry>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Entry>> {
        // A panic mid-step leaves at worst one stale session behind.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a session that has not started any I/O yet.
    pub fn insert(&self, id: SessionId, session: Session, notify: oneshot::Sender<Outcome>) {
        let entry = Entry {
            session,
            notify,
            task: None,
        };
        self.lock().insert(id, entry);
    }

    /// Records the task driving `id`, so shutdown can abort it.
    ///
    /// Returns false if the session already finished.
    pub fn attach_task(&self, id: &SessionId, task: AbortHandle) -> bool {
        self.lock().get_mut(id).is_some_and(|entry| {
            entry.task = Some(task);
            true
        })
    }

    /// Runs `f` against the live session, if there is one.
    pub fn with_session<R>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.lock().get_mut(id).map(|entry| f(&mut entry.session))
    }

    /// Removes the session and delivers its outcome.
    ///
    /// This is the only way an entry leaves the registry, so each outcome is
    /// delivered at most once. Returns false if the session was already gone.
    pub fn finish(&self, id: &SessionId, outcome: Outcome) -> bool {
        let Some(entry) = self.lock().remove(id) else {
            tracing::trace!(%id, "session already finished");
            return false;
        };

        match &outcome {
            Ok(receipt) => tracing::info!(%id, "{receipt}"),
            Err(err) => tracing::warn!(%id, state = %entry.session.state(), error = %err, "delivery failed"),
        }

        if let Err(outcome) = entry.notify.send(outcome) {
            tracing::info!(%id, ?outcome, "delivery outcome not observed");
        }
        true
    }

    /// Aborts every session and completes it as cancelled.
    ///
    /// Returns how many sessions were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            if let Some(task) = entry.task {
                task.abort();
            }
            tracing::debug!(%id, state = %entry.session.state(), "session cancelled");
            let _ = entry.notify.send(Err(DeliveryError::Cancelled));
        }
        count
    }

    /// Returns the dialog state of a live session.
    pub fn state(&self, id: &SessionId) -> Option<State> {
        self.lock().get(id).map(|entry| entry.session.state())
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use mailpost_smtp::{Address, ContentType, Credentials, HeaderValue, Message};

    use super::*;
    use crate::delivery::Receipt;

    fn session() -> Session {
        let message = Message {
            from: Address::new("a@example.com").unwrap(),
            to: Address::new("b@example.com").unwrap(),
            subject: HeaderValue::new("Hi").unwrap(),
            body: "Body".to_string(),
            content_type: ContentType::Plain,
        };
        Session::new("client.test", message, Credentials::new("user", "pass"))
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }

    #[test]
    fn test_insert_and_lookup() {
        let registry = Registry::default();
        let id = SessionId::new();
        let (tx, _rx) = oneshot::channel();
        registry.insert(id, session(), tx);

        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state(&id), Some(State::Init));

        let actions = registry.with_session(&id, |s| s.handle_input(b"220 ready\r\n")).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(registry.state(&id), Some(State::Handshake));
    }

    #[test]
    fn test_finish_notifies_once() {
        let registry = Registry::default();
        let id = SessionId::new();
        let (tx, mut rx) = oneshot::channel();
        registry.insert(id, session(), tx);

        assert!(registry.finish(&id, Ok(Receipt { id })));
        assert!(!registry.finish(&id, Err(DeliveryError::TimedOut)));

        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.unwrap().id, id);
        assert!(!registry.contains(&id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_late_events_are_ignored() {
        let registry = Registry::default();
        let id = SessionId::new();
        let (tx, _rx) = oneshot::channel();
        registry.insert(id, session(), tx);
        registry.finish(&id, Err(DeliveryError::TimedOut));

        assert!(registry.with_session(&id, |s| s.handle_input(b"220 late\r\n")).is_none());
        assert!(registry.state(&id).is_none());
    }

    #[test]
    fn test_unobserved_outcome_still_removes() {
        let registry = Registry::default();
        let id = SessionId::new();
        let (tx, rx) = oneshot::channel();
        registry.insert(id, session(), tx);
        drop(rx);

        assert!(registry.finish(&id, Err(DeliveryError::TimedOut)));
        assert!(!registry.contains(&id));
    }

    #[tokio::test]
    async fn test_attach_task_after_finish() {
        let registry = Registry::default();
        let id = SessionId::new();
        let (tx, _rx) = oneshot::channel();
        registry.insert(id, session(), tx);

        let task = tokio::spawn(async {});
        assert!(registry.attach_task(&id, task.abort_handle()));
        registry.finish(&id, Err(DeliveryError::TimedOut));

        let task = tokio::spawn(async {});
        assert!(!registry.attach_task(&id, task.abort_handle()));
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let registry = Registry::default();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = oneshot::channel();
            let id = SessionId::new();
            registry.insert(id, session(), tx);
            let task = tokio::spawn(std::future::pending::<()>());
            registry.attach_task(&id, task.abort_handle());
            receivers.push((rx, task));
        }

        assert_eq!(registry.cancel_all(), 3);
        assert_eq!(registry.len(), 0);
        for (rx, task) in receivers {
            assert!(matches!(rx.await.unwrap(), Err(DeliveryError::Cancelled)));
            assert!(task.await.unwrap_err().is_cancelled());
        }
    }
}
