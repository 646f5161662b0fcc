//! Optional observability for the gateway auth stages.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits `gateway_auth.stage` spans carrying `stage` and `site` fields,
//!   plus one event per rejected request.
//! - `metrics` increments `gateway_auth_total`, labeled by `stage` and `outcome`.
//!
//! With both features off every helper compiles to a no-op.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Stage of the auth pipeline an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthStage {
	/// Bearer token check performed by a role filter.
	RoleFilter,
	/// Credential header handling on the exchange path.
	CredentialExchange,
	/// Upstream client-credentials call that regenerates a cached token.
	TokenRefresh,
}
impl AuthStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthStage::RoleFilter => "role_filter",
			AuthStage::CredentialExchange => "credential_exchange",
			AuthStage::TokenRefresh => "token_refresh",
		}
	}
}
impl Display for AuthStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome recorded per stage invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOutcome {
	/// Stage entered.
	Attempt,
	/// Request allowed or token produced.
	Success,
	/// Request rejected or exchange failed.
	Failure,
}
impl AuthOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthOutcome::Attempt => "attempt",
			AuthOutcome::Success => "success",
			AuthOutcome::Failure => "failure",
		}
	}

	/// Picks [`AuthOutcome::Success`] or [`AuthOutcome::Failure`] from a result.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { AuthOutcome::Success } else { AuthOutcome::Failure }
	}
}
impl Display for AuthOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
