//! Classification of token endpoint failures.
//!
//! A [`ProviderStrategy`] turns what the provider said (OAuth `error` code, description,
//! HTTP status) into a [`ProviderErrorKind`]. Rejections of the presented credentials become
//! `403` at the gateway; everything else is an upstream failure.

// self
use crate::_prelude::*;

/// Maps provider error responses onto the exchange error taxonomy.
pub trait ProviderStrategy
where
	Self: Send + Sync,
{
	/// Classifies one failed token response.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Grant rejected.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Scope refused.
	InsufficientScope,
	/// Provider-side failure unrelated to the credentials.
	Transient,
}

/// What the provider returned for a failed token request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
}
impl ProviderErrorContext {
	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}
}

/// RFC 6749 section 5.2 error codes first, then the HTTP status.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(classify_code)
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_code(code: &str) -> Option<ProviderErrorKind> {
	const TABLE: &[(&str, ProviderErrorKind)] = &[
		("invalid_client", ProviderErrorKind::InvalidClient),
		("unauthorized_client", ProviderErrorKind::InvalidClient),
		("invalid_grant", ProviderErrorKind::InvalidGrant),
		("access_denied", ProviderErrorKind::InvalidGrant),
		("invalid_scope", ProviderErrorKind::InsufficientScope),
		("insufficient_scope", ProviderErrorKind::InsufficientScope),
		// Malformed requests and unsupported grants point at gateway configuration.
		("invalid_request", ProviderErrorKind::Transient),
		("unsupported_grant_type", ProviderErrorKind::Transient),
		("server_error", ProviderErrorKind::Transient),
		("temporarily_unavailable", ProviderErrorKind::Transient),
	];

	TABLE.iter().find(|(name, _)| code.eq_ignore_ascii_case(name)).map(|(_, kind)| *kind)
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
