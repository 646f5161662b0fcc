//! Decoding of the `X-Client-Data` credential header.
//!
//! The header carries `base64("clientId:secret")`. Decoding validates the split before any
//! field is read, so malformed input always ends in a [`CredentialError`] instead of a panic.

// crates.io
use base64::{
	Engine as _,
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
};

/// Separator between the client identifier and the secret.
pub const CREDENTIALS_SEPARATOR: char = ':';

// Standard alphabet; trailing `=` padding is optional.
const CREDENTIAL_ENGINE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Reasons a credential header value is rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// The header value is not valid base64 text.
	#[error("Credential header is not valid base64.")]
	InvalidBase64,
	/// The decoded bytes are not UTF-8.
	#[error("Decoded credentials are not valid UTF-8.")]
	InvalidUtf8,
	/// The decoded value does not split into exactly two parts.
	#[error("Decoded credentials split into {parts} part(s); expected exactly 2.")]
	WrongPartCount {
		/// Number of `:`-separated parts found.
		parts: usize,
	},
	/// The client identifier part is empty.
	#[error("Decoded credentials carry an empty client identifier.")]
	EmptyClientId,
	/// The secret part is empty.
	#[error("Decoded credentials carry an empty secret.")]
	EmptySecret,
}

/// Per-request `(clientId, secret)` pair. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredential {
	/// Client identifier used as the cache key and the `client_id` form field.
	pub client_id: ClientId,
	/// Client secret forwarded to the provider as `client_secret`.
	pub secret: Secret,
}
impl ClientCredential {
	/// Builds a credential from already-validated parts.
	pub fn new(client_id: ClientId, secret: Secret) -> Self {
		Self { client_id, secret }
	}

	/// Decodes a raw `X-Client-Data` header value.
	pub fn from_header_value(value: &str) -> Result<Self, CredentialError> {
		let bytes =
			CREDENTIAL_ENGINE.decode(value.trim()).map_err(|_| CredentialError::InvalidBase64)?;
		let decoded = String::from_utf8(bytes).map_err(|_| CredentialError::InvalidUtf8)?;
		let parts = decoded.split(CREDENTIALS_SEPARATOR).collect::<Vec<_>>();
		let [client_id, secret] = parts.as_slice() else {
			return Err(CredentialError::WrongPartCount { parts: parts.len() });
		};
		if client_id.is_empty() {
			return Err(CredentialError::EmptyClientId);
		}
		if secret.is_empty() {
			return Err(CredentialError::EmptySecret);
		}

		Ok(Self { client_id: ClientId::presented(*client_id), secret: Secret::new(*secret) })
	}

	/// Encodes the credential the way clients send it (padded standard base64).
	pub fn to_header_value(&self) -> String {
		base64::engine::general_purpose::STANDARD.encode(format!(
			"{}{CREDENTIALS_SEPARATOR}{}",
			self.client_id,
			self.secret.expose()
		))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
	// self
	use super::*;

	#[test]
	fn decodes_well_formed_header() {
		let credential = ClientCredential::from_header_value(&STANDARD.encode("alice:s3cr3t"))
			.expect("Well-formed credentials should decode.");

		assert_eq!(credential.client_id.as_str(), "alice");
		assert_eq!(credential.secret.expose(), "s3cr3t");
	}

	#[test]
	fn client_identifier_is_any_non_empty_text() {
		let credential = ClientCredential::from_header_value(&STANDARD.encode("alice smith:pw"))
			.expect("Identifier with a space should decode.");

		assert_eq!(credential.client_id.as_str(), "alice smith");
		assert_eq!(credential.secret.expose(), "pw");
	}

	#[test]
	fn padding_is_optional() {
		let credential = ClientCredential::from_header_value(&STANDARD_NO_PAD.encode("bob:pw"))
			.expect("Unpadded base64 should decode.");

		assert_eq!(credential.client_id.as_str(), "bob");
	}

	#[test]
	fn rejects_malformed_values_without_panicking() {
		assert_eq!(
			ClientCredential::from_header_value("%%%not-base64%%%"),
			Err(CredentialError::InvalidBase64)
		);
		assert_eq!(
			ClientCredential::from_header_value(&STANDARD.encode("no-separator")),
			Err(CredentialError::WrongPartCount { parts: 1 })
		);
		assert_eq!(
			ClientCredential::from_header_value(&STANDARD.encode("a:b:c")),
			Err(CredentialError::WrongPartCount { parts: 3 })
		);
		assert_eq!(
			ClientCredential::from_header_value(&STANDARD.encode("alice:")),
			Err(CredentialError::EmptySecret)
		);
		assert_eq!(
			ClientCredential::from_header_value(&STANDARD.encode(":secret")),
			Err(CredentialError::EmptyClientId)
		);
		assert_eq!(
			ClientCredential::from_header_value(&STANDARD.encode([0xff, 0x3a, 0x61])),
			Err(CredentialError::InvalidUtf8)
		);
		assert_eq!(
			ClientCredential::from_header_value(""),
			Err(CredentialError::WrongPartCount { parts: 1 })
		);
	}

	#[test]
	fn header_value_round_trips() {
		let credential = ClientCredential::new(
			ClientId::new("courier").expect("Fixture should be valid."),
			Secret::new("pa55"),
		);

		assert_eq!(ClientCredential::from_header_value(&credential.to_header_value()), Ok(credential));
	}
}
