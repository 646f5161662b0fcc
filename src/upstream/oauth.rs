//! [`OAuthClient`] implementation built on the `oauth2` crate.

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, HttpClientError, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
#[cfg(feature = "reqwest")] use crate::upstream::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::Secret,
	upstream::{
		ClientAuthMethod, DefaultProviderStrategy, ExchangeError, ExchangeFuture, ExchangeRequest,
		GrantType, IssuedToken, OAuthClient, ProviderDescriptor, ProviderErrorContext,
		ProviderErrorKind, ProviderStrategy, ResponseStatusSlot, TokenHttpClient, TransientError,
		TransportError,
	},
};

/// Client type used with the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestOAuthClient = OAuth2Client<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Maps transport failures into [`ExchangeError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts a transport error; `status` is the HTTP status seen before the failure.
	fn map_transport_error(&self, status: Option<u16>, error: HttpClientError<E>) -> ExchangeError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		status: Option<u16>,
		error: HttpClientError<ReqwestError>,
	) -> ExchangeError {
		match error {
			HttpClientError::Reqwest(inner) if inner.is_timeout() => TransientError::TokenEndpoint {
				message: "Request timed out while calling the token endpoint".into(),
				status: status.or_else(|| inner.status().map(|code| code.as_u16())),
			}
			.into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ExchangeError::Request(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => generic_transport_error(status, &other),
		}
	}
}

/// Client-credentials exchange over the `oauth2` crate.
///
/// One `oauth2` client is assembled per exchange because the client identity arrives with
/// each request; the token URL and authentication placement are fixed at construction.
pub struct OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	token_url: TokenUrl,
	auth_type: AuthType,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client for `descriptor` using the default error strategy.
	pub fn new(
		descriptor: &ProviderDescriptor,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(descriptor.token_endpoint.to_string()).map_err(|_| {
			ConfigError::InvalidEndpoint {
				url: descriptor.token_endpoint.to_string(),
				reason: "not a valid token URL",
			}
		})?;
		let auth_type = match descriptor.client_auth {
			ClientAuthMethod::ClientSecretPost => AuthType::RequestBody,
			ClientAuthMethod::ClientSecretBasic => AuthType::BasicAuth,
		};

		Ok(Self {
			token_url,
			auth_type,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			strategy: Arc::new(DefaultProviderStrategy),
		})
	}

	/// Replaces the provider error strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Token endpoint the client posts to.
	pub fn token_url(&self) -> &str {
		self.token_url.as_str()
	}

	fn map_request_error(
		&self,
		status: Option<u16>,
		error: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> ExchangeError {
		match error {
			RequestTokenError::ServerResponse(response) => self.map_server_response(status, response),
			RequestTokenError::Request(error) => self.error_mapper.map_transport_error(status, error),
			RequestTokenError::Parse(source, _) => match status {
				Some(code) if !is_success(code) => self.classify(
					ProviderErrorContext::default().with_http_status(code),
					format!("Token endpoint answered HTTP {code} without an OAuth error body"),
				),
				_ => TransientError::TokenResponseParse { source, status }.into(),
			},
			RequestTokenError::Other(message) => match status {
				Some(code) if !is_success(code) => self.classify(
					ProviderErrorContext::default().with_http_status(code),
					format!("Token endpoint answered HTTP {code}: {message}"),
				),
				_ => TransientError::TokenEndpoint { message, status }.into(),
			},
		}
	}

	fn map_server_response(
		&self,
		status: Option<u16>,
		response: BasicErrorResponse,
	) -> ExchangeError {
		let code = response.error().as_ref().to_owned();
		let message = match response.error_description() {
			Some(description) => format!("{code}: {description}"),
			None => code.clone(),
		};
		let mut ctx = ProviderErrorContext::default().with_oauth_error(code);

		if let Some(description) = response.error_description() {
			ctx = ctx.with_error_description(description.clone());
		}
		if let Some(status) = status {
			ctx = ctx.with_http_status(status);
		}

		self.classify(ctx, message)
	}

	fn classify(&self, ctx: ProviderErrorContext, reason: String) -> ExchangeError {
		match self.strategy.classify_token_error(&ctx) {
			ProviderErrorKind::InvalidClient => ExchangeError::InvalidClient { reason },
			ProviderErrorKind::InvalidGrant => ExchangeError::InvalidGrant { reason },
			ProviderErrorKind::InsufficientScope => ExchangeError::InsufficientScope { reason },
			ProviderErrorKind::Transient =>
				TransientError::TokenEndpoint { message: reason, status: ctx.http_status }.into(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2Client<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client over the reqwest transport.
	pub fn reqwest(
		descriptor: &ProviderDescriptor,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		Self::new(descriptor, http_client, ReqwestTransportErrorMapper)
	}
}
impl<C, M> OAuthClient for OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange<'a>(&'a self, request: &'a ExchangeRequest) -> ExchangeFuture<'a> {
		let slot = ResponseStatusSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_status_slot(slot.clone());
			let client = BasicClient::new(OAuthClientId::new(request.client_id.to_string()))
				.set_client_secret(ClientSecret::new(request.client_secret.expose().to_owned()))
				.set_token_uri(self.token_url.clone())
				.set_auth_type(self.auth_type.clone());
			let token_request = match request.grant_type {
				GrantType::ClientCredentials => client.exchange_client_credentials(),
			};
			let response = token_request
				.add_scope(Scope::new(request.scope.clone()))
				.request_async(&handle)
				.await
				.map_err(|e| self.map_request_error(slot.take(), e))?;

			Ok(IssuedToken {
				access_token: Secret::new(response.access_token().secret().to_owned()),
				expires_in: response.expires_in().and_then(|d| Duration::try_from(d).ok()),
			})
		})
	}
}
impl<C, M> Debug for OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Client")
			.field("token_url", &self.token_url.as_str())
			.field("auth_type", &self.auth_type)
			.finish_non_exhaustive()
	}
}

fn is_success(code: u16) -> bool {
	(200..300).contains(&code)
}

fn generic_transport_error<E>(status: Option<u16>, error: &HttpClientError<E>) -> ExchangeError
where
	E: 'static + Send + Sync + StdError,
{
	TransientError::TokenEndpoint {
		message: format!("HTTP client error occurred while calling the token endpoint: {error}"),
		status,
	}
	.into()
}
