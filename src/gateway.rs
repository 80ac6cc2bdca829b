//! The authenticated request gateway.
//!
//! [`Gateway::send`] attaches the stored access credential to every outbound request. A 401 on a
//! request that is neither an auth endpoint nor an earlier replay enters the recovery protocol in
//! [`refresh`]: exactly one refresh call per outage, every concurrently failing request parked
//! as a waiter, and one replay per request once the new credential is stored.

pub mod refresh;

mod account;
mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use http::{HeaderValue, StatusCode};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{AuthEndpoint, GatewayConfig},
	error::ConfigError,
	gateway::refresh::RefreshState,
	http::{ApiRequest, ApiResponse, HttpTransport, StatusError},
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::{SessionEnded, SessionListener},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Wraps outbound API calls with bearer credentials and coordinated credential recovery.
///
/// Each gateway owns one refresh coordinator. Clones share it (together with the store,
/// transport, and listener), so cloning a gateway into several tasks still yields a single
/// refresh per outage; two independently constructed gateways never coordinate with each other.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// HTTP transport used for original requests, refresh calls, and replays.
	pub transport: Arc<T>,
	/// Credential store holding the active access/refresh pair.
	pub store: Arc<dyn CredentialStore>,
	/// Receives one event per failed recovery.
	pub listener: Arc<dyn SessionListener>,
	/// Validated gateway configuration.
	pub config: GatewayConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_state: Arc<Mutex<RefreshState>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway that dispatches through the caller-provided transport.
	pub fn with_transport(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			listener: Arc::new(|_: &SessionEnded| {}),
			config,
			refresh_metrics: Default::default(),
			refresh_state: Default::default(),
		}
	}

	/// Sets or replaces the session-ended listener.
	pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
		self.listener = listener;

		self
	}

	/// Returns `true` while a refresh call is outstanding.
	pub fn refresh_in_progress(&self) -> bool {
		self.refresh_state.lock().in_progress()
	}

	/// Number of requests currently parked behind the outstanding refresh.
	pub fn pending_waiters(&self) -> usize {
		self.refresh_state.lock().waiting()
	}

	/// Sends `request`, recovering once from an expired access credential.
	///
	/// Error statuses other than a recoverable 401 surface as [`Error::Status`]. Failures of the
	/// refresh itself surface as [`Error::Refresh`] after the session has been torn down.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Send;

		let span = OpSpan::new(KIND, "send");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let attempt = Attempt::new(request, &self.config)?;
				let credentials = self.store.get()?;
				let response = self
					.dispatch(&attempt, credentials.as_ref().map(|pair| &pair.access_token))
					.await?;

				match self.judge(&attempt, response) {
					Disposition::Settled(result) => result,
					Disposition::Recover(_) => self.recover(attempt.retried()).await,
				}
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Authorizes and executes a single resolved attempt without any recovery.
	pub(crate) async fn dispatch(
		&self,
		attempt: &Attempt,
		access: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let authorization = access.map(|token| self.authorization(token)).transpose()?;
		let request = attempt.request.to_http(&attempt.url, authorization)?;
		let response = self.transport.execute(request).await?;

		Ok(response.into())
	}

	/// Classifies a response for `attempt`.
	pub(crate) fn judge(&self, attempt: &Attempt, response: ApiResponse) -> Disposition {
		if response.status != StatusCode::UNAUTHORIZED {
			return Disposition::Settled(if response.is_success() {
				Ok(response)
			} else {
				Err(StatusError::new(&attempt.request, response).into())
			});
		}

		let rejection = StatusError::new(&attempt.request, response);

		if let Some(endpoint) = attempt.endpoint {
			return Disposition::Settled(Err(Error::AuthEndpoint { endpoint, response: rejection }));
		}
		if attempt.already_retried {
			return Disposition::Settled(Err(Error::AuthExpired { response: rejection }));
		}

		Disposition::Recover(rejection)
	}

	fn authorization(&self, access: &TokenSecret) -> Result<HeaderValue, ConfigError> {
		let mut value =
			HeaderValue::from_str(&format!("{} {}", self.config.auth_scheme, access.expose()))
				.map_err(|_| ConfigError::InvalidCredentialHeader)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a new gateway backed by a default reqwest client.
	pub fn new(config: GatewayConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			listener: Arc::clone(&self.listener),
			config: self.config.clone(),
			refresh_metrics: Arc::clone(&self.refresh_metrics),
			refresh_state: Arc::clone(&self.refresh_state),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("config", &self.config)
			.field("refresh_in_progress", &self.refresh_in_progress())
			.field("pending_waiters", &self.pending_waiters())
			.finish()
	}
}

/// A caller's request with its resolved URL and one-shot recovery flag.
#[derive(Clone, Debug)]
pub(crate) struct Attempt {
	pub(crate) request: ApiRequest,
	pub(crate) url: Url,
	/// Auth endpoint targeted by `url`; such requests never recover.
	pub(crate) endpoint: Option<AuthEndpoint>,
	pub(crate) already_retried: bool,
}
impl Attempt {
	pub(crate) fn new(request: ApiRequest, config: &GatewayConfig) -> Result<Self, ConfigError> {
		let url = config.resolve(&request.path)?;
		let endpoint = config.classify(&url);

		Ok(Self { request, url, endpoint, already_retried: false })
	}

	pub(crate) fn retried(self) -> Self {
		Self { already_retried: true, ..self }
	}
}

/// What to do with a dispatched response.
#[derive(Debug)]
pub(crate) enum Disposition {
	/// Hand the result to the caller as-is.
	Settled(Result<ApiResponse>),
	/// Expired credential on a request that may still recover.
	Recover(StatusError),
}

/// Token payload shared by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
	#[serde(
		rename = "accessToken",
		alias = "access_token",
		alias = "token",
		deserialize_with = "non_empty_token"
	)]
	pub(crate) access_token: String,
	#[serde(default, rename = "refreshToken", alias = "refresh_token")]
	pub(crate) refresh_token: Option<String>,
}
impl TokenResponse {
	/// Decodes a token payload; an empty refresh token counts as absent.
	pub(crate) fn decode(response: &ApiResponse) -> Result<Self> {
		let mut tokens: Self = response.json()?;

		tokens.refresh_token = tokens.refresh_token.filter(|token| !token.is_empty());

		Ok(tokens)
	}
}

fn non_empty_token<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = String::deserialize(deserializer)?;

	if value.is_empty() {
		return Err(serde::de::Error::custom("token cannot be empty"));
	}

	Ok(value)
}
