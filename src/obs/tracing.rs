// self
use crate::{_prelude::*, obs::AuthStage};

/// Future wrapper produced by [`AuthSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Future wrapper produced by [`AuthSpan::instrument`]; a passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// Span covering one auth stage invocation.
#[derive(Clone, Debug)]
pub struct AuthSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AuthSpan {
	/// Opens a `gateway_auth.stage` span; `name` fills the `site` field.
	pub fn new(stage: AuthStage, name: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("gateway_auth.stage", stage = stage.as_str(), site = name);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, name);

			Self {}
		}
	}

	/// Enters the span for a synchronous section.
	pub fn entered(self) -> AuthSpanGuard {
		#[cfg(feature = "tracing")]
		{
			AuthSpanGuard { _guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			AuthSpanGuard {}
		}
	}

	/// Attaches the span to an async body without holding a guard across `.await`.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
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

/// Guard returned by [`AuthSpan::entered`].
pub struct AuthSpanGuard {
	#[cfg(feature = "tracing")]
	_guard: tracing::span::EnteredSpan,
}
impl Debug for AuthSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuthSpanGuard(..)")
	}
}

/// Emits one event for a rejected request.
///
/// Auth verdicts log at `debug`; infrastructure failures log at `warn`. Only the error
/// text is recorded, and [`Secret`](crate::auth::Secret) values redact themselves.
pub fn record_rejection(stage: AuthStage, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		let status = error.status().as_u16();

		if error.is_auth_failure() {
			tracing::debug!(stage = stage.as_str(), status, %error, "request rejected");
		} else {
			tracing::warn!(stage = stage.as_str(), status, %error, "request failed");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}
