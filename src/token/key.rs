//! Public key material parsing.
//!
//! Keys arrive either as PEM (`-----BEGIN PUBLIC KEY-----`) or, as identity providers such as
//! Keycloak publish them, as bare base64 SubjectPublicKeyInfo text that may contain line
//! breaks. Both forms are parsed once at startup.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use jsonwebtoken::DecodingKey;
// self
use crate::{_prelude::*, error::ConfigError};

const PEM_MARKER: &str = "-----BEGIN";
const PEM_LINE_WIDTH: usize = 64;

/// Parsed RSA verification key. Immutable once built.
#[derive(Clone)]
pub struct PublicKey(DecodingKey);
impl PublicKey {
	/// Parses PEM or bare base64 SPKI key material.
	pub fn parse(material: &str) -> Result<Self, ConfigError> {
		let material = material.trim();

		if material.is_empty() {
			return Err(ConfigError::KeyFormat { reason: "public key material is empty".into() });
		}

		let pem = if material.contains(PEM_MARKER) {
			material.to_owned()
		} else {
			wrap_spki(material)?
		};
		let key = DecodingKey::from_rsa_pem(pem.as_bytes())
			.map_err(|e| ConfigError::KeyFormat { reason: e.to_string() })?;

		Ok(Self(key))
	}

	pub(crate) fn decoding_key(&self) -> &DecodingKey {
		&self.0
	}
}
impl Debug for PublicKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("PublicKey(..)")
	}
}

fn wrap_spki(material: &str) -> Result<String, ConfigError> {
	let compact = material.chars().filter(|c| !c.is_whitespace()).collect::<String>();

	// Decode first so garbage fails with a base64 reason instead of a PEM one.
	STANDARD
		.decode(&compact)
		.map_err(|e| ConfigError::KeyFormat { reason: format!("invalid base64: {e}") })?;

	let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");

	for line in compact.as_bytes().chunks(PEM_LINE_WIDTH) {
		// Base64 text is ASCII, so every chunk is valid UTF-8.
		pem.push_str(&String::from_utf8_lossy(line));
		pem.push('\n');
	}

	pem.push_str("-----END PUBLIC KEY-----\n");

	Ok(pem)
}
