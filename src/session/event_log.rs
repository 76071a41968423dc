//! Append-only session audit trail

use crate::collaborators::traits::SessionPersistence;
use crate::models::{Session, SessionEvent, SessionEventKind};
use crate::utils::logging::LoggingHelper;
use std::sync::Arc;

/// Writes immutable lifecycle events through the persistence collaborator
///
/// Write failures are logged and swallowed. The event log never mutates a
/// session; it only references its id.
#[derive(Clone)]
pub struct SessionEventLog {
    store: Arc<dyn SessionPersistence>,
}

impl SessionEventLog {
    #[must_use]
    pub fn new(store: Arc<dyn SessionPersistence>) -> Self {
        Self { store }
    }

    /// Append an event of `kind` for `session` and return it
    pub async fn append(&self, session: &Session, kind: SessionEventKind) -> SessionEvent {
        let event = SessionEvent::for_session(session, kind);
        match self.store.append_session_event(&event).await {
            Ok(()) => LoggingHelper::log_session_event(&event),
            Err(e) => LoggingHelper::log_persistence_failure(&event, &e),
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock::RecordingPersistence;

    #[tokio::test]
    async fn test_append_writes_event_with_session_id() {
        let store = Arc::new(RecordingPersistence::default());
        let log = SessionEventLog::new(store.clone());
        let session = Session::open("alice");

        let event = log.append(&session, SessionEventKind::Start).await;

        assert_eq!(event.session_id, session.session_id);
        assert_eq!(store.kinds(), vec![SessionEventKind::Start]);
    }

    #[tokio::test]
    async fn test_write_failure_is_not_propagated() {
        let store = Arc::new(RecordingPersistence::failing());
        let log = SessionEventLog::new(store.clone());
        let session = Session::open("alice");

        let event = log.append(&session, SessionEventKind::Refresh).await;

        assert_eq!(event.kind, SessionEventKind::Refresh);
        assert_eq!(store.attempts(), 1);
        assert!(store.kinds().is_empty());
    }
}
