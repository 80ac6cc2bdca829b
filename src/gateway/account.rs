//! Session entry and exit helpers built on the gateway's dispatch path.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	config::AuthEndpoint,
	gateway::{Attempt, Disposition, Gateway, TokenResponse},
	http::{ApiRequest, HttpTransport},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Seeds the store with credentials obtained outside the gateway.
	pub fn establish(&self, pair: CredentialPair) -> Result<()> {
		self.store.set(pair)?;

		Ok(())
	}

	/// Posts `body` to the login endpoint and stores the returned credential pair.
	///
	/// The call never carries a bearer credential and a 401 surfaces as [`Error::AuthEndpoint`].
	pub async fn login<B>(&self, body: &B) -> Result<CredentialPair>
	where
		B: ?Sized + Serialize,
	{
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let request = ApiRequest::post(self.config.endpoints.login.clone()).json(body)?;
				let attempt = Attempt::new(request, &self.config)?;
				let response = self.dispatch(&attempt, None).await?;
				let response = match self.judge(&attempt, response) {
					Disposition::Settled(result) => result?,
					Disposition::Recover(response) =>
						return Err(Error::AuthEndpoint { endpoint: AuthEndpoint::Login, response }),
				};
				let tokens = TokenResponse::decode(&response)?;
				let pair = CredentialPair::new(tokens.access_token, tokens.refresh_token);

				self.store.set(pair.clone())?;

				Ok(pair)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Notifies the logout endpoint and clears the stored credentials.
	///
	/// Credentials are cleared even when the logout call fails; that failure is still returned.
	/// A caller-initiated logout does not emit a session-ended event.
	pub async fn logout(&self) -> Result<()> {
		const KIND: OpKind = OpKind::Logout;

		let span = OpSpan::new(KIND, "logout");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let outcome = match self.store.get()? {
					Some(pair) => self.notify_logout(&pair).await,
					None => Ok(()),
				};

				self.store.clear()?;

				outcome
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	async fn notify_logout(&self, pair: &CredentialPair) -> Result<()> {
		let request = ApiRequest::post(self.config.endpoints.logout.clone());
		let attempt = Attempt::new(request, &self.config)?;
		let response = self.dispatch(&attempt, Some(&pair.access_token)).await?;

		match self.judge(&attempt, response) {
			Disposition::Settled(result) => result.map(|_| ()),
			Disposition::Recover(response) =>
				Err(Error::AuthEndpoint { endpoint: AuthEndpoint::Logout, response }),
		}
	}
}
