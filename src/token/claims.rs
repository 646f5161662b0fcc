//! Claims extracted from a verified token.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::ClientId, token::InvalidReason};

/// Claim that names the calling client.
pub const CLIENT_ID_CLAIM: &str = "clientId";

/// Decoded payload of a token whose signature and expiry checked out.
///
/// A `Claims` value only exists inside [`ValidationOutcome::Valid`](crate::token::ValidationOutcome::Valid),
/// so holding one means `clientId` was present and a string.
#[derive(Clone, Debug, PartialEq)]
pub struct Claims {
	/// Value of the `clientId` claim.
	pub client_id: ClientId,
	/// Expiry from the `exp` claim, when it is a representable timestamp.
	pub expires_at: Option<OffsetDateTime>,
	/// Full payload, including the fields above.
	pub payload: Map<String, Value>,
}
impl Claims {
	pub(crate) fn from_payload(payload: Map<String, Value>) -> Result<Self, InvalidReason> {
		let client_id = match payload.get(CLIENT_ID_CLAIM) {
			None | Some(Value::Null) => return Err(InvalidReason::MissingClientId),
			Some(Value::String(raw)) => ClientId::presented(raw.as_str()),
			Some(_) => return Err(InvalidReason::NonStringClientId),
		};
		let expires_at = payload
			.get("exp")
			.and_then(Value::as_i64)
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok());

		Ok(Self { client_id, expires_at, payload })
	}

	/// Looks up an arbitrary claim.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.payload.get(name)
	}
}
