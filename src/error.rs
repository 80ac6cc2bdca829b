//! Gateway-level error types shared across the transport, store, and recovery layers.

// self
use crate::{_prelude::*, config::AuthEndpoint, http::StatusError};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential refresh failed; the session has been torn down.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Upstream answered with a non-success status other than a recoverable 401.
	#[error(transparent)]
	Status(#[from] StatusError),

	/// Request was still unauthorized after its single post-refresh replay.
	#[error("Access credential was rejected after refresh: {response}")]
	AuthExpired {
		/// The 401 response of the replay.
		response: StatusError,
	},
	/// A login, refresh, or logout endpoint answered 401; recovery is never attempted for these.
	#[error("The {endpoint} endpoint rejected the request: {response}")]
	AuthEndpoint {
		/// Which auth endpoint produced the 401.
		endpoint: AuthEndpoint,
		/// The 401 response.
		response: StatusError,
	},
	/// Response body did not match the expected JSON shape.
	#[error("Response body could not be decoded (HTTP {status}).")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status code carried by the error, when there is one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(e) | Self::AuthExpired { response: e } | Self::AuthEndpoint { response: e, .. } =>
				Some(e.status().as_u16()),
			Self::Refresh(RefreshError::Rejected { status }) => Some(*status),
			Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the error ended the authenticated session.
	pub fn is_session_ended(&self) -> bool {
		matches!(self, Self::Refresh(e) if e.ends_session())
	}
}

/// Configuration and request construction failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Gateway configuration failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] crate::config::GatewayConfigError),
	/// Request path cannot be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidRequestPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Stored access credential cannot be placed in an HTTP header.
	#[error("Access credential contains bytes that are not valid in an HTTP header.")]
	InvalidCredentialHeader,
}

/// Transport-level failures where no response arrived.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Reasons a credential refresh failed.
///
/// The value is cloned into every request waiting on the same refresh, so it only carries
/// owned, printable payloads.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// The credential store holds no refresh token; no refresh call was made.
	#[error("No refresh token is available to renew the session.")]
	MissingRefreshToken,
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the refresh token with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// Refresh call failed before a response arrived.
	#[error("Refresh call failed: {message}")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// Refresh request could not be built.
	#[error("Refresh request could not be built: {message}")]
	Request {
		/// Rendered construction failure.
		message: String,
	},
	/// Refresh endpoint answered 2xx with a body that is not a token response.
	#[error("Refresh endpoint returned a malformed token response: {message}")]
	MalformedResponse {
		/// Rendered parsing failure, including the JSON path.
		message: String,
	},
	/// Refresh call did not settle within the configured timeout.
	#[error("Refresh call did not settle within {after:?}.")]
	Timeout {
		/// Configured refresh timeout.
		after: Duration,
	},
	/// Credential store could not be read or written during the refresh.
	#[error("Credential store failed during refresh: {message}")]
	Storage {
		/// Rendered store failure.
		message: String,
	},
	/// The task driving the refresh was dropped before the refresh settled.
	#[error("Refresh was abandoned before it settled.")]
	Abandoned,
}
impl RefreshError {
	/// Returns `true` if the failure tore the session down (credentials cleared, listener notified).
	pub fn ends_session(&self) -> bool {
		!matches!(self, Self::Abandoned)
	}

	pub(crate) fn storage(e: crate::store::StoreError) -> Self {
		Self::Storage { message: e.to_string() }
	}
}

/// Renders an error and its source chain on one line (`outer: inner: root`).
pub(crate) fn render_chain(error: &dyn StdError) -> String {
	let mut rendered = error.to_string();
	let mut source = error.source();

	while let Some(inner) = source {
		rendered.push_str(": ");
		rendered.push_str(&inner.to_string());

		source = inner.source();
	}

	rendered
}
