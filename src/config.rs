//! Configuration surface and bootstrap.
//!
//! [`GatewayConfig`] is parsed from JSON with `kebab-case` keys; parse failures name the
//! offending field path. Each accessor validates only its own part, so [`GatewayConfig::build`]
//! parses the public key exactly once.

// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	cache::{ACCESS_TOKEN_PREFIX, DistributedCache},
	endpoint::{CredentialAuthEndpoint, DEFAULT_CREDENTIAL_PATH},
	exchange::{ExchangeSettings, SingleFlightLease, TokenExchangeCache},
	filter::{RoleClients, RoleFilter, RolePreset},
	token::{MAX_LEEWAY_SECS, TokenValidator},
	upstream::{
		ClientAuthMethod, GrantType, OAuthClient, ProviderDescriptor, ProviderDescriptorError,
	},
};

/// Largest accepted `cache.ttl-secs` (one year).
pub const MAX_CACHE_TTL_SECS: i64 = 365 * 86_400;

/// Root configuration document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GatewayConfig {
	/// PEM or bare base64 SPKI verification key.
	pub public_key: String,
	/// Accepted signing algorithms.
	#[serde(default = "default_algorithms")]
	pub algorithms: Vec<Algorithm>,
	/// Clock skew tolerance for `exp` and `nbf`, in seconds.
	#[serde(default)]
	pub leeway_secs: u64,
	/// Role client identities.
	pub clients: ClientSettings,
	/// Token endpoint and exchange parameters.
	pub oauth: OAuthSettings,
	/// Token cache parameters.
	#[serde(default)]
	pub cache: CacheSettings,
	/// Path prefix served by the credential endpoint.
	#[serde(default = "default_credential_path")]
	pub credential_path: String,
	/// Serializes regenerations per client.
	#[serde(default)]
	pub single_flight: bool,
}
impl GatewayConfig {
	/// Parses a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(json);
		let config = serde_path_to_error::deserialize::<_, Self>(&mut de).map_err(|e| {
			ConfigError::Parse { path: e.path().to_string(), message: e.inner().to_string() }
		})?;

		de.end().map_err(|e| ConfigError::Parse { path: ".".into(), message: e.to_string() })?;

		Ok(config)
	}

	/// Checks every part of the configuration, including the public key.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.token_validator()?;
		self.clients.role_clients()?;
		self.provider_descriptor()?;
		self.exchange_settings()?;
		self.checked_credential_path()?;

		Ok(())
	}

	/// Parses the key and builds the shared validator.
	pub fn token_validator(&self) -> Result<TokenValidator, ConfigError> {
		for algorithm in &self.algorithms {
			if !is_rsa(*algorithm) {
				return Err(ConfigError::UnsupportedAlgorithm { algorithm: format!("{algorithm:?}") });
			}
		}
		if self.leeway_secs > MAX_LEEWAY_SECS {
			return Err(ConfigError::LeewayOutOfRange {
				secs: self.leeway_secs,
				max_secs: MAX_LEEWAY_SECS,
			});
		}

		Ok(TokenValidator::from_key_material(&self.public_key)?
			.with_algorithms(self.algorithms.iter().copied())
			.with_leeway(self.leeway_secs))
	}

	/// Resolves the token endpoint.
	pub fn provider_descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		self.oauth.provider_descriptor()
	}

	/// Exchange parameters derived from the `oauth` and `cache` sections.
	pub fn exchange_settings(&self) -> Result<ExchangeSettings, ConfigError> {
		let scope = self.oauth.scope.trim();

		if scope.is_empty() {
			return Err(ConfigError::EmptyScope);
		}

		Ok(ExchangeSettings::new(scope)
			.with_grant_type(self.oauth.grant_type)
			.with_ttl(self.cache.ttl()?)
			.with_key_prefix(self.cache.checked_key_prefix()?))
	}

	/// Wires filters, the exchange cache, and the credential endpoint over the given backends.
	pub fn build(
		&self,
		cache: Arc<dyn DistributedCache>,
		oauth: Arc<dyn OAuthClient>,
	) -> Result<GatewayAuth, ConfigError> {
		let validator = Arc::new(self.token_validator()?);
		let clients = self.clients.role_clients()?;
		let mut exchange =
			TokenExchangeCache::new(validator.clone(), cache, oauth, self.exchange_settings()?);

		if self.single_flight {
			exchange = exchange.with_lease(Arc::new(SingleFlightLease::default()));
		}

		let exchange = Arc::new(exchange);
		let endpoint =
			Arc::new(CredentialAuthEndpoint::new(self.checked_credential_path()?, exchange.clone()));
		let [admin, any_client, courier] =
			RolePreset::ALL.map(|preset| RoleFilter::preset(preset, validator.clone(), &clients));

		Ok(GatewayAuth { validator, admin, any_client, courier, exchange, endpoint })
	}

	/// Same as [`build`](Self::build) with the `oauth2` client over reqwest.
	#[cfg(feature = "reqwest")]
	pub fn build_with_reqwest(
		&self,
		cache: Arc<dyn DistributedCache>,
	) -> Result<GatewayAuth, ConfigError> {
		// self
		use crate::upstream::{ReqwestHttpClient, ReqwestOAuthClient};

		let descriptor = self.provider_descriptor()?;
		let oauth = ReqwestOAuthClient::reqwest(&descriptor, ReqwestHttpClient::new()?)?;

		self.build(cache, Arc::new(oauth))
	}

	fn checked_credential_path(&self) -> Result<&str, ConfigError> {
		if self.credential_path.starts_with('/') {
			Ok(&self.credential_path)
		} else {
			Err(ConfigError::InvalidCredentialPath { path: self.credential_path.clone() })
		}
	}
}
impl FromStr for GatewayConfig {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_json_str(s)
	}
}

/// Raw role client identities; validated by [`ClientSettings::role_clients`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSettings {
	/// Administrator client.
	pub admin: String,
	/// Standard user client.
	pub user: String,
	/// Courier client.
	pub courier: String,
}
impl ClientSettings {
	/// Validates the identities.
	pub fn role_clients(&self) -> Result<RoleClients, ConfigError> {
		let parse = |field: &'static str, value: &str| {
			ClientId::new(value).map_err(|source| ConfigError::InvalidClientId { field, source })
		};

		Ok(RoleClients {
			admin: parse("clients.admin", &self.admin)?,
			user: parse("clients.user", &self.user)?,
			courier: parse("clients.courier", &self.courier)?,
		})
	}
}

/// Token endpoint location and exchange parameters.
///
/// Exactly one of `token-endpoint` or `auth-server-url` plus `realm` must be set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OAuthSettings {
	/// Absolute token endpoint URL.
	#[serde(default)]
	pub token_endpoint: Option<Url>,
	/// Keycloak server base URL.
	#[serde(default)]
	pub auth_server_url: Option<Url>,
	/// Keycloak realm.
	#[serde(default)]
	pub realm: Option<String>,
	/// Scope sent on every exchange.
	pub scope: String,
	/// Grant sent on every exchange.
	#[serde(default)]
	pub grant_type: GrantType,
	/// Client authentication placement.
	#[serde(default)]
	pub client_auth: ClientAuthMethod,
	/// Permits a plain `http` token endpoint.
	#[serde(default)]
	pub allow_insecure_http: bool,
}
impl OAuthSettings {
	/// Resolves and checks the token endpoint.
	pub fn provider_descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		let builder = ProviderDescriptor::builder()
			.client_auth(self.client_auth)
			.allow_insecure_http(self.allow_insecure_http);
		let builder = match (&self.token_endpoint, &self.auth_server_url, &self.realm) {
			(Some(url), None, None) => builder.token_endpoint(url.clone()),
			(None, Some(base), Some(realm)) => builder
				.keycloak_realm(base, realm)
				.map_err(|e| endpoint_error(format!("{base} (realm `{realm}`)"), e))?,
			(None, None, None) =>
				return Err(ConfigError::InvalidEndpoint {
					url: String::new(),
					reason: "set `token-endpoint` or `auth-server-url` with `realm`",
				}),
			(Some(url), _, _) =>
				return Err(ConfigError::InvalidEndpoint {
					url: url.to_string(),
					reason: "`token-endpoint` excludes `auth-server-url` and `realm`",
				}),
			(None, base, _) =>
				return Err(ConfigError::InvalidEndpoint {
					url: base.as_ref().map(Url::to_string).unwrap_or_default(),
					reason: "`auth-server-url` and `realm` must be set together",
				}),
		};

		builder.build().map_err(|e| {
			let url = self
				.token_endpoint
				.as_ref()
				.or(self.auth_server_url.as_ref())
				.map(Url::to_string)
				.unwrap_or_default();

			endpoint_error(url, e)
		})
	}
}

/// Token cache parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CacheSettings {
	/// Key prefix; keys are `<prefix>:<clientId>`.
	#[serde(default = "default_key_prefix")]
	pub key_prefix: String,
	/// TTL of stored tokens, in seconds.
	#[serde(default = "default_ttl_secs")]
	pub ttl_secs: i64,
}
impl CacheSettings {
	fn ttl(&self) -> Result<Duration, ConfigError> {
		if self.ttl_secs <= 0 {
			return Err(ConfigError::NonPositiveTtl);
		}
		if self.ttl_secs > MAX_CACHE_TTL_SECS {
			return Err(ConfigError::TtlOutOfRange {
				secs: self.ttl_secs,
				max_secs: MAX_CACHE_TTL_SECS,
			});
		}

		Ok(Duration::seconds(self.ttl_secs))
	}

	fn checked_key_prefix(&self) -> Result<&str, ConfigError> {
		let prefix = self.key_prefix.as_str();

		if prefix.is_empty() || prefix.contains(':') || prefix.chars().any(char::is_whitespace) {
			return Err(ConfigError::InvalidKeyPrefix { prefix: prefix.to_owned() });
		}

		Ok(prefix)
	}
}
impl Default for CacheSettings {
	fn default() -> Self {
		Self { key_prefix: default_key_prefix(), ttl_secs: default_ttl_secs() }
	}
}

/// Everything a gateway needs at runtime, sharing one validator.
#[derive(Clone, Debug)]
pub struct GatewayAuth {
	/// Shared token validator.
	pub validator: Arc<TokenValidator>,
	/// Admin-only filter.
	pub admin: RoleFilter,
	/// Filter admitting every configured client.
	pub any_client: RoleFilter,
	/// Courier-only filter.
	pub courier: RoleFilter,
	/// Token exchange cache.
	pub exchange: Arc<TokenExchangeCache>,
	/// Credential exchange endpoint.
	pub endpoint: Arc<CredentialAuthEndpoint>,
}
impl GatewayAuth {
	/// Filter for `preset`.
	pub fn filter(&self, preset: RolePreset) -> &RoleFilter {
		match preset {
			RolePreset::Admin => &self.admin,
			RolePreset::AnyClient => &self.any_client,
			RolePreset::Courier => &self.courier,
		}
	}
}

fn default_algorithms() -> Vec<Algorithm> {
	vec![Algorithm::RS256]
}

fn default_key_prefix() -> String {
	ACCESS_TOKEN_PREFIX.into()
}

fn default_ttl_secs() -> i64 {
	ExchangeSettings::DEFAULT_TTL.whole_seconds()
}

fn default_credential_path() -> String {
	DEFAULT_CREDENTIAL_PATH.into()
}

fn is_rsa(algorithm: Algorithm) -> bool {
	matches!(
		algorithm,
		Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512
	)
}

fn endpoint_error(url: String, error: ProviderDescriptorError) -> ConfigError {
	let reason = match error {
		ProviderDescriptorError::MissingTokenEndpoint => "no token endpoint configured",
		ProviderDescriptorError::InsecureEndpoint { .. } =>
			"HTTPS is required unless `allow-insecure-http` is set",
		ProviderDescriptorError::UnsupportedScheme { .. } => "scheme must be http or https",
		ProviderDescriptorError::InvalidRealmEndpoint { .. } =>
			"realm endpoint could not be derived",
	};

	ConfigError::InvalidEndpoint { url, reason }
}
