// self
use crate::{
	_prelude::*,
	config::{AuthEndpoint, AuthEndpoints, GatewayConfig},
};

/// Errors raised while constructing or validating gateway configurations.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum GatewayConfigError {
	/// Base URL must be able to carry request paths.
	#[error("Base URL cannot carry request paths: {url}.")]
	InvalidBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL must use HTTPS unless it targets a loopback host.
	#[error("Base URL must use HTTPS outside loopback hosts: {url}.")]
	InsecureBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Auth endpoint paths must be absolute.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	InvalidEndpointPath {
		/// Which endpoint failed validation.
		endpoint: AuthEndpoint,
		/// Path that failed validation.
		path: String,
	},
	/// Two auth endpoints share a path, which would make classification ambiguous.
	#[error("The {first} and {second} endpoints share the path {path}.")]
	DuplicateEndpointPath {
		/// First endpoint sharing the path.
		first: AuthEndpoint,
		/// Second endpoint sharing the path.
		second: AuthEndpoint,
		/// Shared path.
		path: String,
	},
	/// Authorization scheme must be a single visible ASCII token.
	#[error("Authorization scheme must be a non-empty ASCII token: {scheme:?}.")]
	InvalidAuthScheme {
		/// Scheme that failed validation.
		scheme: String,
	},
	/// Refresh body field name cannot be empty.
	#[error("Refresh token field name cannot be empty.")]
	EmptyRefreshTokenField,
	/// Refresh timeout must be positive when set.
	#[error("Refresh timeout must be greater than zero.")]
	ZeroRefreshTimeout,
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Base URL for the configuration being constructed.
	pub base_url: Url,
	/// Auth endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Authorization scheme.
	pub auth_scheme: String,
	/// Refresh body field name.
	pub refresh_token_field: String,
	/// Refresh call bound.
	pub refresh_timeout: Option<Duration>,
}
impl GatewayConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: AuthEndpoints::default(),
			auth_scheme: "Bearer".into(),
			refresh_token_field: "refreshToken".into(),
			refresh_timeout: Some(GatewayConfig::DEFAULT_REFRESH_TIMEOUT),
		}
	}

	/// Sets the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Sets the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Overrides the authorization scheme.
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.auth_scheme = scheme.into();

		self
	}

	/// Overrides the JSON field name of the refresh request body.
	pub fn refresh_token_field(mut self, field: impl Into<String>) -> Self {
		self.refresh_token_field = field.into();

		self
	}

	/// Overrides the refresh timeout; `None` disables it.
	pub fn refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let config = GatewayConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			auth_scheme: self.auth_scheme,
			refresh_token_field: self.refresh_token_field,
			refresh_timeout: self.refresh_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl GatewayConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), GatewayConfigError> {
		validate_base_url(&self.base_url)?;
		validate_endpoints(&self.endpoints)?;

		if self.auth_scheme.is_empty() || !self.auth_scheme.bytes().all(|b| b.is_ascii_graphic()) {
			return Err(GatewayConfigError::InvalidAuthScheme { scheme: self.auth_scheme.clone() });
		}
		if self.refresh_token_field.is_empty() {
			return Err(GatewayConfigError::EmptyRefreshTokenField);
		}
		if self.refresh_timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(GatewayConfigError::ZeroRefreshTimeout);
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), GatewayConfigError> {
	if url.cannot_be_a_base() || !url.has_host() {
		return Err(GatewayConfigError::InvalidBaseUrl { url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(GatewayConfigError::InsecureBaseUrl { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn validate_endpoints(endpoints: &AuthEndpoints) -> Result<(), GatewayConfigError> {
	const ALL: [AuthEndpoint; 3] = [AuthEndpoint::Login, AuthEndpoint::Refresh, AuthEndpoint::Logout];

	for endpoint in ALL {
		let path = endpoints.path(endpoint);

		if !path.starts_with('/') || path.trim_end_matches('/').is_empty() {
			return Err(GatewayConfigError::InvalidEndpointPath { endpoint, path: path.to_owned() });
		}
	}
	for (idx, first) in ALL.iter().enumerate() {
		for second in &ALL[idx + 1..] {
			let path = endpoints.path(*first);

			if path.trim_end_matches('/') == endpoints.path(*second).trim_end_matches('/') {
				return Err(GatewayConfigError::DuplicateEndpointPath {
					first: *first,
					second: *second,
					path: path.to_owned(),
				});
			}
		}
	}

	Ok(())
}
