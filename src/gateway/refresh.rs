//! Credential recovery with a single-flight refresh and FIFO waiters.
//!
//! The first request to observe an expired credential becomes the leader: it flips
//! `in_progress`, performs the one refresh call, and settles every waiter that queued up behind
//! it. Requests failing while the refresh is outstanding join the queue instead of refreshing.
//! Joining is a single critical section on a synchronous mutex that is never held across an
//! `.await`, so two failures can never both observe an idle coordinator and both refresh.
//!
//! Settlement order on success: store the new pair, drain the queue and reset `in_progress`,
//! hand the new access token to each waiter in enqueue order (each replays its own request), then
//! replay the leader's request. On failure: clear the store, drain and reject every waiter with
//! the same [`RefreshError`], reset `in_progress`, notify the session listener once, and reject
//! the leader's request.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::{self, RefreshError},
	gateway::{Attempt, Disposition, Gateway, TokenResponse},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::SessionEnded,
};

type RefreshOutcome = std::result::Result<TokenSecret, RefreshError>;

/// Per-gateway refresh coordinator state.
#[derive(Debug, Default)]
pub struct RefreshState {
	in_progress: bool,
	waiters: VecDeque<PendingRequest>,
	next_ticket: u64,
}
impl RefreshState {
	/// Returns `true` while a refresh call is outstanding.
	pub fn in_progress(&self) -> bool {
		self.in_progress
	}

	/// Number of parked waiters.
	pub fn waiting(&self) -> usize {
		self.waiters.len()
	}

	/// Claims the refresh or parks behind the outstanding one, in one step.
	fn join(state: &Arc<Mutex<RefreshState>>) -> Role {
		let mut guard = state.lock();

		if guard.in_progress {
			let (completion, receiver) = oneshot::channel();
			let ticket = guard.next_ticket;

			guard.next_ticket += 1;
			guard.waiters.push_back(PendingRequest { ticket, completion });

			Role::Waiter { ticket, receiver }
		} else {
			guard.in_progress = true;

			Role::Leader(RefreshLease { state: Arc::clone(state), settled: false })
		}
	}

	/// Ends the current refresh and hands back its waiters in enqueue order.
	fn drain(&mut self) -> VecDeque<PendingRequest> {
		self.in_progress = false;

		std::mem::take(&mut self.waiters)
	}
}

/// A request parked behind the outstanding refresh.
#[derive(Debug)]
struct PendingRequest {
	ticket: u64,
	completion: oneshot::Sender<RefreshOutcome>,
}

enum Role {
	Leader(RefreshLease),
	Waiter { ticket: u64, receiver: oneshot::Receiver<RefreshOutcome> },
}

/// Exclusive right to run the refresh, released exactly once.
///
/// Dropping an unsettled lease (the leader's future was cancelled) rejects every waiter with
/// [`RefreshError::Abandoned`] and frees the coordinator without touching the session.
struct RefreshLease {
	state: Arc<Mutex<RefreshState>>,
	settled: bool,
}
impl RefreshLease {
	fn settle(mut self, outcome: RefreshOutcome) -> usize {
		self.release(outcome)
	}

	fn release(&mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		let waiters = self.state.lock().drain();
		let served = waiters.len();

		for waiter in waiters {
			obs::debug("Serving refresh waiter.", Some(waiter.ticket));

			// The waiter's caller may have gone away; nothing to serve then.
			let _ = waiter.completion.send(outcome.clone());
		}

		served
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if !self.settled {
			obs::warn("Refresh leader dropped before settling.", &RefreshError::Abandoned);

			self.release(Err(RefreshError::Abandoned));
		}
	}
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Runs the recovery protocol for an attempt whose one-shot flag is already consumed.
	pub(crate) async fn recover(&self, attempt: Attempt) -> Result<ApiResponse> {
		match RefreshState::join(&self.refresh_state) {
			Role::Waiter { ticket, receiver } => {
				self.refresh_metrics.record_waiter();
				obs::debug("Request joined the in-flight credential refresh.", Some(ticket));

				let access = match receiver.await {
					Ok(Ok(access)) => access,
					Ok(Err(err)) => return Err(err.into()),
					Err(_) => return Err(RefreshError::Abandoned.into()),
				};

				self.replay(&attempt, &access).await
			},
			Role::Leader(lease) => {
				obs::debug("Request started a credential refresh.", None);

				match self.refresh_credentials().await {
					Ok(pair) => {
						lease.settle(Ok(pair.access_token.clone()));

						self.replay(&attempt, &pair.access_token).await
					},
					Err(err) => {
						self.end_session(lease, err.clone());

						Err(err.into())
					},
				}
			},
		}
	}

	/// Performs the single refresh call and stores the rotated pair.
	async fn refresh_credentials(&self) -> Result<CredentialPair, RefreshError> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "refresh_credentials");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async {
				let current = self.store.get().map_err(RefreshError::storage)?;
				let Some((current, refresh_token)) = current.and_then(|pair| {
					let token = pair.refresh_token.clone()?;

					Some((pair, token))
				}) else {
					return Err(RefreshError::MissingRefreshToken);
				};
				let attempt = self.refresh_attempt(&refresh_token)?;
				let call = self.dispatch(&attempt, None);
				let response = match self.config.refresh_timeout {
					Some(limit) => tokio::time::timeout(limit, call)
						.await
						.map_err(|_| RefreshError::Timeout { after: limit })?,
					None => call.await,
				}
				.map_err(|err| match err {
					Error::Transport(e) => RefreshError::Transport { message: error::render_chain(&e) },
					other => RefreshError::Request { message: error::render_chain(&other) },
				})?;

				if !response.status.is_success() {
					return Err(RefreshError::Rejected { status: response.status.as_u16() });
				}

				let tokens = TokenResponse::decode(&response).map_err(|e| {
					RefreshError::MalformedResponse { message: error::render_chain(&e) }
				})?;
				let rotated = current.rotate(tokens.access_token, tokens.refresh_token);

				self.store.set(rotated.clone()).map_err(RefreshError::storage)?;
				obs::credential("Stored refreshed credential.", &rotated.access_token);

				Ok(rotated)
			})
			.await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	fn refresh_attempt(&self, refresh_token: &TokenSecret) -> Result<Attempt, RefreshError> {
		let mut body = serde_json::Map::new();

		body.insert(self.config.refresh_token_field.clone(), refresh_token.expose().into());

		ApiRequest::post(self.config.endpoints.refresh.clone())
			.json(&body)
			.and_then(|request| Attempt::new(request, &self.config))
			.map_err(|e| RefreshError::Request { message: error::render_chain(&e) })
	}

	/// Re-dispatches a request with the refreshed credential; never recovers again.
	async fn replay(&self, attempt: &Attempt, access: &TokenSecret) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Replay;

		let span = OpSpan::new(KIND, "replay");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				obs::credential("Replaying request with refreshed credential.", access);

				let response = self.dispatch(attempt, Some(access)).await?;

				match self.judge(attempt, response) {
					Disposition::Settled(result) => result,
					Disposition::Recover(response) => Err(Error::AuthExpired { response }),
				}
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	fn end_session(&self, lease: RefreshLease, reason: RefreshError) {
		if let Err(e) = self.store.clear() {
			obs::warn("Failed to clear credentials after refresh failure.", &e);
		}

		lease.settle(Err(reason.clone()));
		obs::warn("Credential refresh failed; session ended.", &reason);
		self.listener.session_ended(&SessionEnded::now(reason));
	}
}
