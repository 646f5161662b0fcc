//! Identity provider descriptor: where the token endpoint lives and how clients authenticate.

// self
use crate::_prelude::*;

const KEYCLOAK_TOKEN_PATH: &str = "protocol/openid-connect/token";

/// How the client authenticates on the token request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// `client_id` and `client_secret` as form fields.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Errors raised while building a [`ProviderDescriptor`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// No token endpoint was configured.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Token endpoint is not HTTPS and insecure HTTP was not allowed.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Offending URL.
		url: String,
	},
	/// Token endpoint scheme is neither HTTP nor HTTPS.
	#[error("The token endpoint scheme `{scheme}` is not supported.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Keycloak base URL or realm could not form a valid endpoint.
	#[error("Keycloak realm endpoint is invalid: {reason}.")]
	InvalidRealmEndpoint {
		/// Parser message or validation reason.
		reason: String,
	},
}

/// Immutable provider metadata consumed by [`OAuth2Client`](crate::upstream::OAuth2Client).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Token endpoint receiving the client-credentials POST.
	pub token_endpoint: Url,
	/// Client authentication placement.
	pub client_auth: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Derives the realm token endpoint of a Keycloak server:
	/// `<auth_server_url>/auth/realms/<realm>/protocol/openid-connect/token`.
	pub fn keycloak_token_endpoint(
		auth_server_url: &Url,
		realm: &str,
	) -> Result<Url, ProviderDescriptorError> {
		let realm = realm.trim();

		if realm.is_empty() || realm.contains('/') {
			return Err(ProviderDescriptorError::InvalidRealmEndpoint {
				reason: format!("realm `{realm}` must be a single non-empty path segment"),
			});
		}

		let base = auth_server_url.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}/auth/realms/{realm}/{KEYCLOAK_TOKEN_PATH}"))
			.map_err(|e| ProviderDescriptorError::InvalidRealmEndpoint { reason: e.to_string() })
	}
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	token_endpoint: Option<Url>,
	client_auth: ClientAuthMethod,
	allow_insecure_http: bool,
}
impl ProviderDescriptorBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint from a Keycloak base URL and realm.
	pub fn keycloak_realm(
		mut self,
		auth_server_url: &Url,
		realm: &str,
	) -> Result<Self, ProviderDescriptorError> {
		let endpoint = ProviderDescriptor::keycloak_token_endpoint(auth_server_url, realm)?;

		self.token_endpoint = Some(endpoint);

		Ok(self)
	}

	/// Overrides the client authentication placement.
	pub fn client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Permits a plain `http` token endpoint (local development and tests).
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Validates and builds the descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;

		match token_endpoint.scheme() {
			"https" => {},
			"http" if self.allow_insecure_http => {},
			"http" =>
				return Err(ProviderDescriptorError::InsecureEndpoint {
					url: token_endpoint.to_string(),
				}),
			other =>
				return Err(ProviderDescriptorError::UnsupportedScheme { scheme: other.to_owned() }),
		}

		Ok(ProviderDescriptor { token_endpoint, client_auth: self.client_auth })
	}
}
