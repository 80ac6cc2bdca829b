//! Transport primitives for authenticated API calls.
//!
//! Callers describe requests with [`ApiRequest`] (method, path, headers, body). The gateway
//! resolves the path against its base URL, attaches the access credential, and hands a plain
//! [`HttpRequest`] to an [`HttpTransport`]. Transports report every HTTP status as a response and
//! reserve [`TransportError`] for failures where no response arrived, which keeps status
//! classification (401 recovery, error statuses) in one place inside the gateway.

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Fully resolved request handed to a transport.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Raw response returned by a transport.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway requests.
///
/// The same transport carries original requests, the refresh call, and replays. Implementations
/// must return a response for every HTTP status (including 401 and 5xx) and only fail when the
/// exchange itself failed.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a single request without retries or redirects to other origins.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Outbound request descriptor owned by the caller.
///
/// The gateway never mutates a caller's request; credentials are attached to the resolved
/// [`HttpRequest`] built for each dispatch.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the gateway base URL, or an absolute URL.
	pub path: String,
	/// Caller-supplied headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(|source| ConfigError::RequestBody { source })?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Builds the transport-level request for `url`, optionally carrying an authorization value.
	pub(crate) fn to_http(
		&self,
		url: &Url,
		authorization: Option<HeaderValue>,
	) -> Result<HttpRequest, ConfigError> {
		let mut request = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;

		*request.headers_mut() = self.headers.clone();

		if let Some(value) = authorization {
			request.headers_mut().insert(AUTHORIZATION, value);
		}

		Ok(request)
	}
}

/// Response returned to gateway callers.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx and 3xx statuses.
	pub fn is_success(&self) -> bool {
		!(self.status.is_client_error() || self.status.is_server_error())
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status.as_u16() })
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}

/// A non-success response paired with the request that produced it.
#[derive(Clone, Debug, ThisError)]
#[error("{method} {path} returned HTTP {}.", .response.status.as_u16())]
pub struct StatusError {
	/// Method of the failed request.
	pub method: Method,
	/// Path of the failed request as supplied by the caller.
	pub path: String,
	/// The full response, so callers can inspect error payloads.
	pub response: Box<ApiResponse>,
}
impl StatusError {
	pub(crate) fn new(request: &ApiRequest, response: ApiResponse) -> Self {
		Self { method: request.method.clone(), path: request.path.clone(), response: Box::new(response) }
	}

	/// HTTP status code of the response.
	pub fn status(&self) -> StatusCode {
		self.response.status
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
