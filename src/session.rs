//! Session-ended notification contract.
//!
//! When credential recovery fails irrecoverably the gateway clears the credential store and
//! emits exactly one [`SessionEnded`] event per failed recovery, so the embedding application can
//! move to its unauthenticated entry point.

// self
use crate::{_prelude::*, error::RefreshError};

/// Event describing why an authenticated session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEnded {
	/// Refresh failure that ended the session.
	pub reason: RefreshError,
	/// Instant at which the gateway tore the session down.
	pub ended_at: OffsetDateTime,
}
impl SessionEnded {
	pub(crate) fn now(reason: RefreshError) -> Self {
		Self { reason, ended_at: OffsetDateTime::now_utc() }
	}
}

/// Receives session-ended events from a gateway.
///
/// Listeners run synchronously on the task that drove the failed refresh, after the credential
/// store has been cleared and every waiter has been rejected. Keep them short; hand long work to
/// another task.
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Called once per failed recovery.
	fn session_ended(&self, event: &SessionEnded);
}
impl<F> SessionListener for F
where
	F: Send + Sync + Fn(&SessionEnded),
{
	fn session_ended(&self, event: &SessionEnded) {
		self(event)
	}
}

/// Listener that keeps every event it receives, for embedding code that polls instead of reacting.
#[derive(Debug, Default)]
pub struct SessionLog(Mutex<Vec<SessionEnded>>);
impl SessionLog {
	/// Returns a snapshot of the recorded events.
	pub fn events(&self) -> Vec<SessionEnded> {
		self.0.lock().clone()
	}

	/// Returns the number of recorded events.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` if no session has ended yet.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}
}
impl SessionListener for SessionLog {
	fn session_ended(&self, event: &SessionEnded) {
		self.0.lock().push(event.clone());
	}
}
