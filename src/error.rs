//! Gateway-level error taxonomy shared by filters, the exchange cache, and the endpoint.

// crates.io
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, CredentialError, IdentifierError},
	cache::CacheError,
	token::InvalidReason,
	upstream::ExchangeError,
};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error.
///
/// Authentication and authorization failures map to `403`; infrastructure failures map to
/// the `5xx` class through [`Error::status`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// A required header is absent.
	#[error("Required header `{header}` is missing.")]
	MissingHeader {
		/// Header name.
		header: &'static str,
	},
	/// The credential header could not be decoded.
	#[error("Client credentials are malformed: {0}")]
	MalformedCredential(#[from] CredentialError),
	/// The token failed verification for a reason other than expiry.
	#[error("Token is invalid: {0}.")]
	SignatureInvalid(InvalidReason),
	/// The token signature is valid but its expiry has passed.
	#[error("Token has expired.")]
	TokenExpired,
	/// The token subject is not whitelisted for the route.
	#[error("Client `{client_id}` is not authorized for this route.")]
	RoleNotAuthorized {
		/// Subject taken from the `clientId` claim.
		client_id: ClientId,
	},
	/// The client-credentials exchange failed.
	#[error(transparent)]
	UpstreamExchange(#[from] ExchangeError),
	/// The distributed cache could not be reached.
	#[error(transparent)]
	CacheUnavailable(#[from] CacheError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// HTTP status the gateway answers with for this error.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::MissingHeader { .. }
			| Self::MalformedCredential(_)
			| Self::SignatureInvalid(_)
			| Self::TokenExpired
			| Self::RoleNotAuthorized { .. } => StatusCode::FORBIDDEN,
			Self::UpstreamExchange(e) if e.is_credential_rejection() => StatusCode::FORBIDDEN,
			Self::UpstreamExchange(_) => StatusCode::BAD_GATEWAY,
			Self::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Returns `true` when the failure is an authentication or authorization verdict rather
	/// than an infrastructure fault.
	pub fn is_auth_failure(&self) -> bool {
		self.status() == StatusCode::FORBIDDEN
	}
}

/// Configuration and bootstrap failures. None of these are produced per request.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Public key material could not be parsed; the process cannot start.
	#[error("Public key material is malformed: {reason}.")]
	KeyFormat {
		/// Parser message.
		reason: String,
	},
	/// The configuration document could not be parsed.
	#[error("Configuration is invalid at `{path}`: {message}.")]
	Parse {
		/// Path to the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// A configured client identifier is invalid.
	#[error("Configured client identifier `{field}` is invalid.")]
	InvalidClientId {
		/// Configuration field that failed.
		field: &'static str,
		/// Validation failure.
		#[source]
		source: IdentifierError,
	},
	/// The token endpoint URL is unusable.
	#[error("Token endpoint `{url}` is invalid: {reason}.")]
	InvalidEndpoint {
		/// Offending URL text.
		url: String,
		/// Why it was rejected.
		reason: &'static str,
	},
	/// A configured signing algorithm is not an RSA JWS algorithm.
	#[error("Signing algorithm `{algorithm}` is not supported; use an RSA algorithm.")]
	UnsupportedAlgorithm {
		/// Offending algorithm name.
		algorithm: String,
	},
	/// The OAuth scope is empty.
	#[error("OAuth scope must not be empty.")]
	EmptyScope,
	/// Cache TTL must be positive.
	#[error("Cache TTL must be positive.")]
	NonPositiveTtl,
	/// Cache TTL exceeds the supported maximum.
	#[error("Cache TTL of {secs}s exceeds the maximum of {max_secs}s.")]
	TtlOutOfRange {
		/// Configured TTL in seconds.
		secs: i64,
		/// Largest accepted TTL in seconds.
		max_secs: i64,
	},
	/// Clock-skew leeway exceeds the supported maximum.
	#[error("Token leeway of {secs}s exceeds the maximum of {max_secs}s.")]
	LeewayOutOfRange {
		/// Configured leeway in seconds.
		secs: u64,
		/// Largest accepted leeway in seconds.
		max_secs: u64,
	},
	/// Cache key prefix must not be empty or contain `:`.
	#[error("Cache key prefix `{prefix}` is invalid.")]
	InvalidKeyPrefix {
		/// Offending prefix.
		prefix: String,
	},
	/// Credential path prefix must be absolute.
	#[error("Credential path `{path}` must start with `/`.")]
	InvalidCredentialPath {
		/// Offending path.
		path: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
