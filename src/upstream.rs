//! Upstream OAuth capability: the client-credentials exchange against an identity provider.
//!
//! [`OAuthClient`] is the seam the token exchange depends on. [`OAuth2Client`] implements it
//! with the `oauth2` crate over any [`TokenHttpClient`] transport; tests substitute fakes.

pub mod oauth;
pub mod provider;
pub mod strategy;
pub mod transport;

pub use oauth::*;
pub use provider::*;
pub use strategy::*;
pub use transport::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by [`OAuthClient::exchange`].
pub type ExchangeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IssuedToken, ExchangeError>> + 'a + Send>>;

/// Performs client-credentials grants.
pub trait OAuthClient
where
	Self: Send + Sync,
{
	/// Trades the request's client credentials for an access token. Never retries.
	fn exchange<'a>(&'a self, request: &'a ExchangeRequest) -> ExchangeFuture<'a>;
}

/// OAuth grant types the gateway can request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Client Credentials grant.
	#[default]
	ClientCredentials,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Form fields of one token request: `scope`, `client_id`, `client_secret`, `grant_type`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeRequest {
	/// Client identifier sent as `client_id`.
	pub client_id: ClientId,
	/// Client secret sent as `client_secret`.
	pub client_secret: Secret,
	/// Scope string sent as `scope`.
	pub scope: String,
	/// Grant sent as `grant_type`.
	pub grant_type: GrantType,
}

/// Token handed back by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
	/// Value of `access_token`.
	pub access_token: Secret,
	/// Value of `expires_in`, when present. Informational; the cache TTL is independent.
	pub expires_in: Option<Duration>,
}

/// Failures of the client-credentials exchange.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Client authentication failed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason.
		reason: String,
	},
	/// Provider rejected the grant.
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason.
		reason: String,
	},
	/// Requested scope was refused.
	#[error("Provider refused the requested scope: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason.
		reason: String,
	},
	/// Unexpected or malformed token endpoint response.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Network or I/O failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The HTTP request could not be built.
	#[error("Token request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
}
impl ExchangeError {
	/// Returns `true` when the provider's verdict rejects the presented credentials.
	pub fn is_credential_rejection(&self) -> bool {
		matches!(
			self,
			Self::InvalidClient { .. } | Self::InvalidGrant { .. } | Self::InsufficientScope { .. }
		)
	}
}

/// Unexpected token endpoint behavior.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected, non-OAuth response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint body could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Network-level failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific error.
		#[source]
		source: BoxError,
	},
	/// I/O failure surfaced by the transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn provider_verdicts_are_credential_rejections() {
		assert!(ExchangeError::InvalidClient { reason: "x".into() }.is_credential_rejection());
		assert!(ExchangeError::InvalidGrant { reason: "x".into() }.is_credential_rejection());
		assert!(ExchangeError::InsufficientScope { reason: "x".into() }.is_credential_rejection());
		assert!(
			!ExchangeError::from(TransportError::Io(std::io::Error::other("reset")))
				.is_credential_rejection()
		);
	}

	#[test]
	fn grant_type_serializes_as_rfc_identifier() {
		assert_eq!(
			serde_json::to_string(&GrantType::ClientCredentials)
				.expect("Grant type should serialize."),
			"\"client_credentials\""
		);
		assert!(serde_json::from_str::<GrantType>("\"password\"").is_err());
	}
}
