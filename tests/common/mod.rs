//! Shared fixtures for integration tests: a scripted in-process transport and gateway builders.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Notify;
// self
use session_gateway::{
	auth::CredentialPair,
	config::GatewayConfig,
	gateway::Gateway,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{StatusCode, header::AUTHORIZATION},
	session::SessionLog,
	store::{CredentialStore, MemoryStore},
	url::Url,
};

pub const BASE_URL: &str = "https://api.school.test";

/// How the scripted refresh endpoint answers.
#[derive(Clone, Debug)]
pub enum RefreshReply {
	/// 200 with a token payload; the access token becomes the only accepted bearer.
	Issue { access: String, refresh: Option<String> },
	/// Bare status without a token payload.
	Status(u16),
	/// Never answers.
	Hang,
}

/// A request observed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct Call {
	pub method: String,
	pub path: String,
	pub authorization: Option<String>,
	pub body: String,
}

/// In-process transport with a scripted refresh endpoint and bearer-checked resources.
///
/// Resource paths answer 401 unless the request carries the currently accepted access token;
/// with it they answer the status configured via [`ScriptedTransport::route`] (200 by default).
pub struct ScriptedTransport {
	refresh_path: String,
	refresh_reply: Mutex<RefreshReply>,
	accepted: Mutex<Option<String>>,
	routes: Mutex<HashMap<String, u16>>,
	public: Mutex<HashSet<String>>,
	gated: bool,
	gate: Notify,
	refresh_calls: AtomicUsize,
	calls: Mutex<Vec<Call>>,
}
impl ScriptedTransport {
	pub fn new(reply: RefreshReply) -> Self {
		Self {
			refresh_path: "/auth/refresh".into(),
			refresh_reply: Mutex::new(reply),
			accepted: Mutex::new(None),
			routes: Mutex::new(HashMap::new()),
			public: Mutex::new(HashSet::new()),
			gated: false,
			gate: Notify::new(),
			refresh_calls: AtomicUsize::new(0),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn issuing(access: &str, refresh: Option<&str>) -> Self {
		Self::new(RefreshReply::Issue {
			access: access.into(),
			refresh: refresh.map(Into::into),
		})
	}

	/// Holds every refresh call until [`ScriptedTransport::release_refresh`].
	pub fn gated(mut self) -> Self {
		self.gated = true;

		self
	}

	pub fn accepting(self, access: &str) -> Self {
		*self.accepted.lock() = Some(access.into());

		self
	}

	pub fn route(self, path: &str, status: u16) -> Self {
		self.routes.lock().insert(path.into(), status);

		self
	}

	pub fn public(self, path: &str) -> Self {
		self.public.lock().insert(path.into());

		self
	}

	pub fn set_refresh_reply(&self, reply: RefreshReply) {
		*self.refresh_reply.lock() = reply;
	}

	/// Invalidates the accepted access token, as a server-side expiry would.
	pub fn expire_access(&self) {
		self.accepted.lock().take();
	}

	pub fn release_refresh(&self) {
		self.gate.notify_one();
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<Call> {
		self.calls().into_iter().filter(|call| call.path == path).collect()
	}

	fn respond(status: u16, body: String) -> HttpResponse {
		let mut response = HttpResponse::new(body.into_bytes());

		*response.status_mut() = StatusCode::from_u16(status).expect("Scripted status is valid.");

		response
	}

	fn answer_resource(&self, path: &str, authorization: Option<&str>) -> HttpResponse {
		if self.public.lock().contains(path) {
			return Self::respond(200, format!("{{\"path\":\"{path}\"}}"));
		}

		let accepted = self.accepted.lock().clone();
		let authorized = match (accepted, authorization) {
			(Some(token), Some(header)) => header == format!("Bearer {token}"),
			_ => false,
		};

		if !authorized {
			return Self::respond(401, "{\"error\":\"unauthorized\"}".into());
		}

		let status = self.routes.lock().get(path).copied().unwrap_or(200);

		Self::respond(status, format!("{{\"path\":\"{path}\"}}"))
	}

	fn answer_refresh(&self, reply: RefreshReply) -> Option<HttpResponse> {
		match reply {
			RefreshReply::Issue { access, refresh } => {
				*self.accepted.lock() = Some(access.clone());

				let body = match refresh {
					Some(refresh) =>
						format!("{{\"accessToken\":\"{access}\",\"refreshToken\":\"{refresh}\"}}"),
					None => format!("{{\"accessToken\":\"{access}\"}}"),
				};

				Some(Self::respond(200, body))
			},
			RefreshReply::Status(status) => Some(Self::respond(status, String::new())),
			RefreshReply::Hang => None,
		}
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let path = request.uri().path().to_owned();
		let authorization = request
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.map(ToOwned::to_owned);

		self.calls.lock().push(Call {
			method: request.method().to_string(),
			path: path.clone(),
			authorization: authorization.clone(),
			body: String::from_utf8_lossy(request.body()).into_owned(),
		});

		Box::pin(async move {
			if path != self.refresh_path {
				return Ok(self.answer_resource(&path, authorization.as_deref()));
			}

			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			if self.gated {
				self.gate.notified().await;
			}

			let reply = self.refresh_reply.lock().clone();

			match self.answer_refresh(reply) {
				Some(response) => Ok(response),
				None => std::future::pending().await,
			}
		})
	}
}

pub fn config() -> GatewayConfig {
	GatewayConfig::builder(Url::parse(BASE_URL).expect("Base URL fixture should parse."))
		.build()
		.expect("Default gateway configuration should validate.")
}

/// Builds a gateway over `transport` with a fresh memory store and session log.
pub fn build_gateway(
	transport: Arc<ScriptedTransport>,
	seed: Option<CredentialPair>,
) -> (Gateway<ScriptedTransport>, Arc<MemoryStore>, Arc<SessionLog>) {
	let store_backend = Arc::new(seed.map(MemoryStore::with_credentials).unwrap_or_default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let sessions = Arc::new(SessionLog::default());
	let gateway =
		Gateway::with_transport(config(), store, transport).with_listener(sessions.clone());

	(gateway, store_backend, sessions)
}

/// Builds a reqwest-backed gateway pointed at `base_url`.
#[cfg(feature = "reqwest")]
pub fn build_reqwest_gateway(
	base_url: &str,
	seed: Option<CredentialPair>,
) -> (session_gateway::gateway::ReqwestGateway, Arc<MemoryStore>, Arc<SessionLog>) {
	let store_backend = Arc::new(seed.map(MemoryStore::with_credentials).unwrap_or_default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let sessions = Arc::new(SessionLog::default());
	let config = GatewayConfig::builder(Url::parse(base_url).expect("Mock server URL should parse."))
		.build()
		.expect("Loopback gateway configuration should validate.");
	let gateway = Gateway::new(config, store).with_listener(sessions.clone());

	(gateway, store_backend, sessions)
}

/// Yields until `condition` holds, failing the test if it never does.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
	for _ in 0..10_000 {
		if condition() {
			return;
		}

		tokio::task::yield_now().await;
	}

	panic!("Condition was not reached while yielding.");
}

/// Current access token held by `store`.
pub fn stored_access(store: &MemoryStore) -> Option<String> {
	store
		.get()
		.expect("Memory store reads never fail.")
		.map(|pair| pair.access_token.expose().to_owned())
}

/// Current refresh token held by `store`.
pub fn stored_refresh(store: &MemoryStore) -> Option<String> {
	store
		.get()
		.expect("Memory store reads never fail.")
		.and_then(|pair| pair.refresh_token.map(|token| token.expose().to_owned()))
}
