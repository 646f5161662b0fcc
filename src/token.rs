//! Signed token validation.
//!
//! [`TokenValidator`] verifies a token against a fixed RSA public key and classifies the
//! result as a closed [`ValidationOutcome`]. Callers branch on all three cases; claims are
//! only reachable through [`ValidationOutcome::Valid`].

pub mod claims;
pub mod key;

pub use claims::*;
pub use key::*;

// crates.io
use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::ConfigError};

/// Why a token was classified as [`ValidationOutcome::Invalid`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InvalidReason {
	/// Signature does not match the configured public key.
	#[error("signature verification failed")]
	Signature,
	/// The token header names an algorithm the validator does not accept.
	#[error("token algorithm is not accepted")]
	Algorithm,
	/// The token is structurally broken (segments, base64, JSON).
	#[error("token is malformed: {detail}")]
	Malformed {
		/// Decoder message.
		detail: String,
	},
	/// The token is not valid yet (`nbf` in the future).
	#[error("token is not valid yet")]
	NotYetValid,
	/// A registered claim the validator requires (such as `exp`) is absent.
	#[error("token is missing the `{claim}` claim")]
	MissingClaim {
		/// Name of the missing claim.
		claim: String,
	},
	/// The `clientId` claim is absent.
	#[error("token is missing the `clientId` claim")]
	MissingClientId,
	/// The `clientId` claim is not a string.
	#[error("token `clientId` claim is not a string")]
	NonStringClientId,
	/// Any other verification failure.
	#[error("token rejected: {detail}")]
	Other {
		/// Verifier message.
		detail: String,
	},
}

/// Result of validating one token. Produced fresh on every call and never cached.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
	/// Signature and expiry checked out and `clientId` is a string.
	Valid(Claims),
	/// Signature is valid but the token has expired.
	Expired,
	/// Any other failure.
	Invalid(InvalidReason),
}
impl ValidationOutcome {
	/// Returns `true` only for [`ValidationOutcome::Valid`].
	pub fn is_valid(&self) -> bool {
		matches!(self, Self::Valid(_))
	}

	/// Converts the outcome into the crate error taxonomy.
	pub fn into_result(self) -> Result<Claims> {
		match self {
			Self::Valid(claims) => Ok(claims),
			Self::Expired => Err(Error::TokenExpired),
			Self::Invalid(reason) => Err(Error::SignatureInvalid(reason)),
		}
	}
}

/// Largest clock skew tolerance, in seconds, a validator applies.
pub const MAX_LEEWAY_SECS: u64 = 86_400;

/// Verifies signed tokens against one immutable public key.
///
/// Safe to share across tasks behind an [`Arc`]; validation never mutates state.
#[derive(Clone)]
pub struct TokenValidator {
	key: PublicKey,
	validation: Validation,
}
impl TokenValidator {
	/// Creates an RS256 validator with zero clock leeway.
	pub fn new(key: PublicKey) -> Self {
		let mut validation = Validation::new(Algorithm::RS256);

		validation.leeway = 0;
		// Audience and issuer are not part of the gateway contract.
		validation.validate_aud = false;

		Self { key, validation }
	}

	/// Parses key material and creates a validator; malformed material fails fast.
	pub fn from_key_material(material: &str) -> Result<Self, ConfigError> {
		Ok(Self::new(PublicKey::parse(material)?))
	}

	/// Replaces the accepted signing algorithms.
	pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
		let algorithms = algorithms.into_iter().collect::<Vec<_>>();

		if !algorithms.is_empty() {
			self.validation.algorithms = algorithms;
		}

		self
	}

	/// Sets the clock skew tolerance applied to `exp` and `nbf`, capped at
	/// [`MAX_LEEWAY_SECS`].
	pub fn with_leeway(mut self, seconds: u64) -> Self {
		self.validation.leeway = seconds.min(MAX_LEEWAY_SECS);

		self
	}

	/// Verifies and classifies `token`.
	pub fn validate(&self, token: &str) -> ValidationOutcome {
		match jsonwebtoken::decode::<Map<String, Value>>(
			token,
			self.key.decoding_key(),
			&self.validation,
		) {
			Ok(data) => match Claims::from_payload(data.claims) {
				Ok(claims) => ValidationOutcome::Valid(claims),
				Err(reason) => ValidationOutcome::Invalid(reason),
			},
			Err(err) => classify_error(&err),
		}
	}
}
impl Debug for TokenValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenValidator")
			.field("algorithms", &self.validation.algorithms)
			.field("leeway", &self.validation.leeway)
			.finish()
	}
}

fn classify_error(err: &jsonwebtoken::errors::Error) -> ValidationOutcome {
	let reason = match err.kind() {
		ErrorKind::ExpiredSignature => return ValidationOutcome::Expired,
		ErrorKind::InvalidSignature => InvalidReason::Signature,
		ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => InvalidReason::Algorithm,
		ErrorKind::ImmatureSignature => InvalidReason::NotYetValid,
		ErrorKind::MissingRequiredClaim(claim) => InvalidReason::MissingClaim { claim: claim.clone() },
		ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) =>
			InvalidReason::Malformed { detail: err.to_string() },
		_ => InvalidReason::Other { detail: err.to_string() },
	};

	ValidationOutcome::Invalid(reason)
}
