//! Client identifier shared by tokens, whitelists, and cache keys.
//!
//! Configured identifiers go through [`ClientId::new`]; identifiers presented by callers
//! (token claims, credential headers) are taken as-is via [`ClientId::presented`].

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const CLIENT_ID_MAX_LEN: usize = 128;

/// Error returned when a client identifier fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Client identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Client identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier contains the `:` credential separator.
	#[error("Client identifier contains the `:` separator.")]
	ContainsSeparator,
	/// The identifier exceeded the allowed byte length.
	#[error("Client identifier exceeds {max} bytes.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}

/// OAuth client identity carried in the `clientId` claim and in `X-Client-Data`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);
impl ClientId {
	/// Creates a configured identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Wraps an identifier presented by a caller without validating its shape.
	///
	/// Such an identifier only ever matches a whitelist entry built with [`ClientId::new`].
	pub fn presented(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Borrows the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for ClientId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ClientId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for ClientId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<ClientId> for String {
	fn from(value: ClientId) -> Self {
		value.0
	}
}
impl TryFrom<String> for ClientId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for ClientId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ClientId({})", self.0)
	}
}
impl Display for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.contains(':') {
		return Err(IdentifierError::ContainsSeparator);
	}
	if view.len() > CLIENT_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { max: CLIENT_ID_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_separator_and_empty() {
		assert_eq!(ClientId::new(""), Err(IdentifierError::Empty));
		assert_eq!(ClientId::new(" alice"), Err(IdentifierError::ContainsWhitespace));
		assert_eq!(ClientId::new("al\u{00A0}ice"), Err(IdentifierError::ContainsWhitespace));
		assert_eq!(ClientId::new("alice:bob"), Err(IdentifierError::ContainsSeparator));

		let alice = ClientId::new("alice").expect("Plain identifier should be valid.");

		assert_eq!(alice.as_str(), "alice");
		assert_eq!(alice.to_string(), "alice");
	}

	#[test]
	fn length_limit_is_enforced() {
		ClientId::new("a".repeat(CLIENT_ID_MAX_LEN)).expect("Exact length should succeed.");

		assert_eq!(
			ClientId::new("a".repeat(CLIENT_ID_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: CLIENT_ID_MAX_LEN })
		);
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: ClientId =
			serde_json::from_str("\"gateway-admin\"").expect("Identifier should deserialize.");

		assert_eq!(id.as_str(), "gateway-admin");
		assert!(serde_json::from_str::<ClientId>("\"with space\"").is_err());
	}

	#[test]
	fn presented_identifiers_keep_their_raw_value() {
		let spaced = ClientId::presented("alice smith");
		let namespaced = ClientId::presented("svc:alice");

		assert_eq!(spaced.as_str(), "alice smith");
		assert_eq!(namespaced.to_string(), "svc:alice");
		assert_ne!(ClientId::presented("alice"), ClientId::presented("alice "));
	}

	#[test]
	fn borrow_supports_set_lookup() {
		let set: HashSet<ClientId> =
			HashSet::from_iter([ClientId::new("courier").expect("Fixture should be valid.")]);

		assert!(set.contains("courier"));
		assert!(!set.contains("admin"));
	}
}
