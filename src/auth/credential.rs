//! Access/refresh credential pair held by a credential store.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// The single active access/refresh credential pair of an authenticated session.
///
/// Writing a pair into a [`CredentialStore`](crate::store::CredentialStore) replaces the
/// previous one as a whole; the gateway never patches individual fields in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived access token attached to every request.
	pub access_token: TokenSecret,
	/// Longer-lived refresh token, used solely to obtain a new access token.
	pub refresh_token: Option<TokenSecret>,
	/// Instant at which the pair was minted or last rotated.
	pub issued_at: OffsetDateTime,
}
impl CredentialPair {
	/// Creates a pair stamped with the current clock.
	pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new),
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Convenience constructor for a pair that carries both tokens.
	pub fn with_refresh(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self::new(access_token, Some(refresh_token.into()))
	}

	/// Produces the successor pair after a refresh.
	///
	/// The refresh token is replaced only when the server rotated it.
	pub fn rotate(&self, access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new).or_else(|| self.refresh_token.clone()),
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Returns `true` if the pair can be renewed.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.finish()
	}
}
