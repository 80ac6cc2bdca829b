// self
use crate::{_prelude::*, auth::TokenSecret, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by gateway operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_gateway.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event on the recovery path (when tracing is enabled).
pub(crate) fn debug(message: &'static str, ticket: Option<u64>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(ticket, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (message, ticket);
	}
}

/// Emits a debug event tagged with a credential's fingerprint (when tracing is enabled).
///
/// The fingerprint is only computed when the event can be recorded.
pub(crate) fn credential(message: &'static str, token: &TokenSecret) {
	#[cfg(feature = "tracing")]
	{
		if tracing::enabled!(tracing::Level::DEBUG) {
			tracing::debug!(fingerprint = %token.fingerprint(), "{message}");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (message, token);
	}
}

/// Emits a warning carrying a rendered error (when tracing is enabled).
pub(crate) fn warn(message: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (message, error);
	}
}
