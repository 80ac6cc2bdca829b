// std
use std::time::Duration;
// self
use session_gateway::{
	config::{AuthEndpoint, GatewayConfig, GatewayConfigError},
	url::Url,
};

fn base(url: &str) -> Url {
	Url::parse(url).expect("Base URL fixture should parse.")
}

#[test]
fn defaults_match_the_conventional_auth_layout() {
	let config = GatewayConfig::builder(base("https://api.school.test/v1"))
		.build()
		.expect("Defaults should validate.");

	assert_eq!(config.endpoints.login, "/auth/login");
	assert_eq!(config.endpoints.refresh, "/auth/refresh");
	assert_eq!(config.endpoints.logout, "/auth/logout");
	assert_eq!(config.auth_scheme, "Bearer");
	assert_eq!(config.refresh_token_field, "refreshToken");
	assert_eq!(config.refresh_timeout, Some(GatewayConfig::DEFAULT_REFRESH_TIMEOUT));
}

#[test]
fn plain_http_is_limited_to_loopback_hosts() {
	assert!(GatewayConfig::builder(base("http://127.0.0.1:8080")).build().is_ok());
	assert!(GatewayConfig::builder(base("http://localhost:3000")).build().is_ok());

	let err = GatewayConfig::builder(base("http://api.school.test"))
		.build()
		.expect_err("Remote plain HTTP should be rejected.");

	assert!(matches!(err, GatewayConfigError::InsecureBaseUrl { .. }));
}

#[test]
fn endpoint_paths_must_be_absolute_and_distinct() {
	let err = GatewayConfig::builder(base("https://api.school.test"))
		.refresh_path("token/refresh")
		.build()
		.expect_err("Relative endpoint path should be rejected.");

	assert_eq!(err, GatewayConfigError::InvalidEndpointPath {
		endpoint: AuthEndpoint::Refresh,
		path: "token/refresh".into(),
	});

	let err = GatewayConfig::builder(base("https://api.school.test"))
		.logout_path("/auth/login/")
		.build()
		.expect_err("Shared endpoint path should be rejected.");

	assert!(matches!(err, GatewayConfigError::DuplicateEndpointPath {
		first: AuthEndpoint::Login,
		second: AuthEndpoint::Logout,
		..
	}));
}

#[test]
fn scheme_field_and_timeout_are_validated() {
	let builder = || GatewayConfig::builder(base("https://api.school.test"));

	assert!(matches!(
		builder().auth_scheme("Bearer token").build(),
		Err(GatewayConfigError::InvalidAuthScheme { .. })
	));
	assert_eq!(
		builder().refresh_token_field("").build(),
		Err(GatewayConfigError::EmptyRefreshTokenField)
	);
	assert_eq!(
		builder().refresh_timeout(Some(Duration::ZERO)).build(),
		Err(GatewayConfigError::ZeroRefreshTimeout)
	);

	let unbounded = builder()
		.auth_scheme("Token")
		.refresh_token_field("refresh_token")
		.refresh_timeout(None)
		.build()
		.expect("Custom settings should validate.");

	assert_eq!(unbounded.auth_scheme, "Token");
	assert_eq!(unbounded.refresh_timeout, None);
}

#[test]
fn configuration_round_trips_through_json() {
	let config = GatewayConfig::builder(base("https://api.school.test"))
		.refresh_path("/session/renew")
		.build()
		.expect("Config should validate.");
	let json = serde_json::to_string(&config).expect("Config should serialize.");
	let restored: GatewayConfig = serde_json::from_str(&json).expect("Config should deserialize.");

	assert_eq!(restored, config);
	assert!(restored.validate().is_ok());
}
