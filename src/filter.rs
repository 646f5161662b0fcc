//! Role filters: one bearer-token check parameterized by a whitelist of client identities.
//!
//! Every preset (admin-only, any known client, courier-only) is the same [`RoleFilter`]
//! built with a different [`RoleWhitelist`]. A filter never rewrites the request it allows.

// crates.io
use http::{HeaderMap, Request};
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	obs::{self, AuthOutcome, AuthSpan, AuthStage},
	token::{Claims, InvalidReason, TokenValidator},
};

/// Header carrying the bearer token checked by role filters (matched case-insensitively).
pub const CLIENT_TOKEN_HEADER: &str = "Client_Token";

/// Immutable set of client identities allowed through a filter. Clones share the set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleWhitelist(Arc<HashSet<ClientId>>);
impl RoleWhitelist {
	/// Builds a whitelist from identities; duplicates collapse.
	pub fn new(clients: impl IntoIterator<Item = ClientId>) -> Self {
		Self(Arc::new(clients.into_iter().collect()))
	}

	/// Returns `true` when `client_id` is allowed.
	pub fn contains(&self, client_id: &str) -> bool {
		self.0.contains(client_id)
	}

	/// Number of allowed identities.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when nothing is allowed.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates allowed identities in arbitrary order.
	pub fn iter(&self) -> impl Iterator<Item = &ClientId> {
		self.0.iter()
	}
}
impl FromIterator<ClientId> for RoleWhitelist {
	fn from_iter<I: IntoIterator<Item = ClientId>>(iter: I) -> Self {
		Self::new(iter)
	}
}

/// The configured role client identities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClients {
	/// Administrator client.
	pub admin: ClientId,
	/// Standard user client.
	pub user: ClientId,
	/// Courier client.
	pub courier: ClientId,
}
impl RoleClients {
	/// Whitelist for `preset`.
	pub fn whitelist(&self, preset: RolePreset) -> RoleWhitelist {
		match preset {
			RolePreset::Admin => RoleWhitelist::new([self.admin.clone()]),
			RolePreset::AnyClient =>
				RoleWhitelist::new([self.admin.clone(), self.user.clone(), self.courier.clone()]),
			RolePreset::Courier => RoleWhitelist::new([self.courier.clone()]),
		}
	}
}

/// Route presets shipped with the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RolePreset {
	/// Admin module routes: admin only.
	Admin,
	/// Client module routes: admin, standard user, and courier.
	AnyClient,
	/// Courier module routes: courier only.
	Courier,
}
impl RolePreset {
	/// All presets.
	pub const ALL: [RolePreset; 3] = [RolePreset::Admin, RolePreset::AnyClient, RolePreset::Courier];

	/// Stable filter name used in spans and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			RolePreset::Admin => "admin",
			RolePreset::AnyClient => "client",
			RolePreset::Courier => "courier",
		}
	}
}
impl Display for RolePreset {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Verdict of [`RoleFilter::apply`].
#[derive(Debug)]
pub enum FilterDecision<B> {
	/// The request, unchanged.
	Allow(Request<B>),
	/// Why the request was rejected; [`Error::status`] gives the response code.
	Reject(Error),
}
impl<B> FilterDecision<B> {
	/// Returns `true` for [`FilterDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow(_))
	}

	/// Converts the decision into a result.
	pub fn into_result(self) -> Result<Request<B>> {
		match self {
			Self::Allow(request) => Ok(request),
			Self::Reject(error) => Err(error),
		}
	}
}

/// Bearer-token role check.
#[derive(Clone, Debug)]
pub struct RoleFilter {
	name: String,
	validator: Arc<TokenValidator>,
	whitelist: RoleWhitelist,
}
impl RoleFilter {
	/// Creates a filter named `name` admitting only `whitelist`.
	pub fn new(
		name: impl Into<String>,
		validator: Arc<TokenValidator>,
		whitelist: RoleWhitelist,
	) -> Self {
		Self { name: name.into(), validator, whitelist }
	}

	/// Creates the filter for a route preset.
	pub fn preset(preset: RolePreset, validator: Arc<TokenValidator>, clients: &RoleClients) -> Self {
		Self::new(preset.as_str(), validator, clients.whitelist(preset))
	}

	/// Filter name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Allowed identities.
	pub fn whitelist(&self) -> &RoleWhitelist {
		&self.whitelist
	}

	/// Runs the check against request headers and returns the verified claims.
	pub fn evaluate(&self, headers: &HeaderMap) -> Result<Claims> {
		let _guard = AuthSpan::new(AuthStage::RoleFilter, &self.name).entered();

		obs::record_outcome(AuthStage::RoleFilter, AuthOutcome::Attempt);

		let result = self.check(headers);

		obs::record_outcome(AuthStage::RoleFilter, AuthOutcome::of(&result));

		if let Err(e) = &result {
			obs::record_rejection(AuthStage::RoleFilter, e);
		}

		result
	}

	/// Allows the request unchanged or rejects it.
	pub fn apply<B>(&self, request: Request<B>) -> FilterDecision<B> {
		match self.evaluate(request.headers()) {
			Ok(_) => FilterDecision::Allow(request),
			Err(e) => FilterDecision::Reject(e),
		}
	}

	fn check(&self, headers: &HeaderMap) -> Result<Claims> {
		let value = headers
			.get(CLIENT_TOKEN_HEADER)
			.ok_or(Error::MissingHeader { header: CLIENT_TOKEN_HEADER })?;
		let token = value.to_str().map_err(|_| {
			Error::SignatureInvalid(InvalidReason::Malformed {
				detail: "token header is not visible ASCII".into(),
			})
		})?;
		let claims = self.validator.validate(token).into_result()?;

		if self.whitelist.contains(&claims.client_id) {
			Ok(claims)
		} else {
			Err(Error::RoleNotAuthorized { client_id: claims.client_id })
		}
	}
}
