//! Session tracker
//!
//! Owns the single open [`Session`] of this client. Opening and closing are
//! recorded through the [`SessionEventLog`]; every operation except a conflicting
//! start is total, because teardown and pending timers routinely race.

use crate::errors::{WardenError, WardenResult};
use crate::models::{EndReason, Session, SessionEventKind};
use crate::session::event_log::SessionEventLog;
use chrono::Utc;
use log::{debug, info};
use std::sync::{Mutex, PoisonError};

pub struct SessionTracker {
    current: Mutex<Option<Session>>,
    events: SessionEventLog,
}

impl SessionTracker {
    #[must_use]
    pub fn new(events: SessionEventLog) -> Self {
        Self {
            current: Mutex::new(None),
            events,
        }
    }

    /// Snapshot of the open session, if any
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.lock().clone()
    }

    /// Open a session for `user_id` and record `Start`
    ///
    /// Calling again for the user already tracked returns the open session without
    /// writing anything, which absorbs duplicate auth notifications.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::AlreadyTracking`] if a session is open for a
    /// different user.
    pub async fn start_session_tracking(&self, user_id: &str) -> WardenResult<Session> {
        // The session is installed before the first await so that a concurrent
        // end always observes it.
        let session = {
            let mut current = self.lock();
            if let Some(open) = current.as_ref() {
                if open.user_id == user_id {
                    debug!("Session {} already tracked for {user_id}", open.session_id);
                    return Ok(open.clone());
                }
                return Err(WardenError::AlreadyTracking {
                    active_user: open.user_id.clone(),
                    requested_user: user_id.to_string(),
                });
            }
            let session = Session::open(user_id);
            *current = Some(session.clone());
            session
        };

        info!("🔐 Session {} started for {user_id}", session.session_id);
        self.events.append(&session, SessionEventKind::Start).await;
        Ok(session)
    }

    /// Close the open session with the terminal event for `reason`
    ///
    /// Without an open session this is a no-op that writes nothing.
    pub async fn end_session_tracking(&self, reason: EndReason) -> Option<Session> {
        let ended = {
            let mut session = self.lock().take()?;
            session.ended_at = Some(Utc::now());
            session
        };

        info!(
            "🔒 Session {} ended for {} ({})",
            ended.session_id,
            ended.user_id,
            reason.terminal_event()
        );
        self.events.append(&ended, reason.terminal_event()).await;
        Some(ended)
    }

    /// Record that the inactivity limit was reached
    pub async fn log_inactivity_event(&self) {
        self.log_open(SessionEventKind::InactivityTimeout).await;
    }

    /// Record that the absolute lifetime was reached
    pub async fn log_absolute_timeout_event(&self) {
        self.log_open(SessionEventKind::AbsoluteTimeout).await;
    }

    /// Record a refresh and bump `last_refreshed_at`
    pub async fn log_session_refresh_event(&self) {
        let refreshed = {
            let mut current = self.lock();
            current.as_mut().map(|session| {
                session.last_refreshed_at = Utc::now();
                session.clone()
            })
        };
        if let Some(session) = refreshed {
            self.events.append(&session, SessionEventKind::Refresh).await;
        } else {
            debug!("Refresh ignored: no open session");
        }
    }

    async fn log_open(&self, kind: SessionEventKind) {
        let Some(session) = self.current_session() else {
            debug!("{kind} ignored: no open session");
            return;
        };
        self.events.append(&session, kind).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
