//! Gateway configuration: API base URL, auth endpoint paths, and refresh behavior.
//!
//! Values are validated once by [`GatewayConfigBuilder::build`] so the request path never has to
//! re-check them. The types derive serde so embedding applications can load them from their own
//! configuration files.

/// Builder API for assembling gateway configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// The auth endpoints that bypass credential recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEndpoint {
	/// Exchanges user credentials for a token pair.
	Login,
	/// Exchanges a refresh token for a new access token.
	Refresh,
	/// Ends the session server-side.
	Logout,
}
impl AuthEndpoint {
	/// Returns a stable label suitable for logs and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthEndpoint::Login => "login",
			AuthEndpoint::Refresh => "refresh",
			AuthEndpoint::Logout => "logout",
		}
	}
}
impl Display for AuthEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request paths of the auth endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// Login endpoint path.
	pub login: String,
	/// Refresh endpoint path.
	pub refresh: String,
	/// Logout endpoint path.
	pub logout: String,
}
impl AuthEndpoints {
	/// Returns the configured path for an endpoint.
	pub fn path(&self, endpoint: AuthEndpoint) -> &str {
		match endpoint {
			AuthEndpoint::Login => &self.login,
			AuthEndpoint::Refresh => &self.refresh,
			AuthEndpoint::Logout => &self.logout,
		}
	}

	/// Finds the endpoint whose path equals `path`, ignoring trailing slashes.
	pub fn find(&self, path: &str) -> Option<AuthEndpoint> {
		let path = path.trim_end_matches('/');

		[AuthEndpoint::Login, AuthEndpoint::Refresh, AuthEndpoint::Logout]
			.into_iter()
			.find(|endpoint| self.path(*endpoint).trim_end_matches('/') == path)
	}
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			login: "/auth/login".into(),
			refresh: "/auth/refresh".into(),
			logout: "/auth/logout".into(),
		}
	}
}

/// Validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Base URL every request path is resolved against.
	pub base_url: Url,
	/// Auth endpoint paths; requests to them never trigger recovery.
	pub endpoints: AuthEndpoints,
	/// Authorization scheme placed before the access token (`Bearer` by default).
	pub auth_scheme: String,
	/// JSON field name carrying the refresh token in the refresh request body.
	pub refresh_token_field: String,
	/// Upper bound for a single refresh call; `None` waits indefinitely.
	pub refresh_timeout: Option<Duration>,
}
impl GatewayConfig {
	/// Default bound for a single refresh call.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Resolves a request path (or absolute URL) against the base URL.
	///
	/// Paths are appended to the base URL's path rather than replacing it, so a base of
	/// `https://api.example.com/v1` turns `/students` into `https://api.example.com/v1/students`.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		if let Ok(absolute) = Url::parse(path)
			&& absolute.has_host()
		{
			return Ok(absolute);
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if path.starts_with('/') {
			format!("{base}{path}")
		} else {
			format!("{base}/{path}")
		};

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidRequestPath { path: path.to_owned(), source })
	}

	/// Identifies which auth endpoint, if any, a resolved URL targets.
	///
	/// Only URLs on the base URL's origin qualify. The URL path, minus the base path, must equal
	/// an endpoint path; query strings, fragments, and trailing slashes are ignored.
	pub fn classify(&self, url: &Url) -> Option<AuthEndpoint> {
		if url.origin() != self.base_url.origin() {
			return None;
		}

		let base = self.base_url.path().trim_end_matches('/');
		let relative = url.path().strip_prefix(base)?;

		if !relative.starts_with('/') {
			return None;
		}

		self.endpoints.find(relative)
	}
}
