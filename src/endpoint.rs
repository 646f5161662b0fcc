//! Terminal handler for the credential-exchange path.
//!
//! Requests under the configured prefix carry `X-Client-Data: base64("clientId:secret")`.
//! A well-formed credential is exchanged through [`TokenExchangeCache`] and the access token
//! is returned as a plain-text body. Every failure becomes an empty-bodied response whose
//! status comes from [`Error::status`].

// crates.io
use http::{
	HeaderMap, HeaderValue, Response, StatusCode,
	header::{CACHE_CONTROL, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredential, CredentialError, Secret},
	exchange::TokenExchangeCache,
	obs::{self, AuthOutcome, AuthSpan, AuthStage},
};

/// Header carrying the encoded client credentials (matched case-insensitively).
pub const CLIENT_DATA_HEADER: &str = "X-Client-Data";
/// Path prefix served when none is configured.
pub const DEFAULT_CREDENTIAL_PATH: &str = "/base/auth";

/// Credential exchange endpoint bound to one path prefix.
#[derive(Clone, Debug)]
pub struct CredentialAuthEndpoint {
	path_prefix: String,
	exchange: Arc<TokenExchangeCache>,
}
impl CredentialAuthEndpoint {
	/// Serves `path_prefix` and every path below it. Trailing slashes are ignored.
	pub fn new(path_prefix: impl Into<String>, exchange: Arc<TokenExchangeCache>) -> Self {
		let path_prefix = path_prefix.into().trim_end_matches('/').to_owned();

		Self { path_prefix, exchange }
	}

	/// Normalized path prefix; empty when the endpoint serves `/`.
	pub fn path_prefix(&self) -> &str {
		&self.path_prefix
	}

	/// Exchange cache used for lookups.
	pub fn exchange(&self) -> &TokenExchangeCache {
		&self.exchange
	}

	/// Returns `true` when `path` is the prefix or lies below it on a segment boundary.
	pub fn matches(&self, path: &str) -> bool {
		match path.strip_prefix(self.path_prefix.as_str()) {
			Some(rest) => rest.is_empty() || rest.starts_with('/'),
			None => false,
		}
	}

	/// Decodes the credential header and returns an access token for it.
	pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Secret> {
		const STAGE: AuthStage = AuthStage::CredentialExchange;

		let span = AuthSpan::new(STAGE, &self.path_prefix);

		obs::record_outcome(STAGE, AuthOutcome::Attempt);

		let result = span
			.instrument(async {
				let credential = decode_header(headers)?;

				self.exchange.check_and_get_token(&credential.client_id, &credential.secret).await
			})
			.await;

		obs::record_outcome(STAGE, AuthOutcome::of(&result));

		if let Err(e) = &result {
			obs::record_rejection(STAGE, e);
		}

		result
	}

	/// Runs [`authenticate`](Self::authenticate) and renders the HTTP response.
	pub async fn respond(&self, headers: &HeaderMap) -> Response<String> {
		match self.authenticate(headers).await {
			Ok(token) => token_response(token),
			Err(e) => rejection_response(&e),
		}
	}
}

/// `200` response carrying `token` as its plain-text body.
pub fn token_response(token: Secret) -> Response<String> {
	let mut response = Response::new(token.into_inner());
	let headers = response.headers_mut();

	headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
	headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

	response
}

/// Empty-bodied response with the status mapped from `error`.
pub fn rejection_response(error: &Error) -> Response<String> {
	status_response(error.status())
}

pub(crate) fn status_response(status: StatusCode) -> Response<String> {
	let mut response = Response::new(String::new());

	*response.status_mut() = status;

	response
}

fn decode_header(headers: &HeaderMap) -> Result<ClientCredential> {
	let value =
		headers.get(CLIENT_DATA_HEADER).ok_or(Error::MissingHeader { header: CLIENT_DATA_HEADER })?;
	let text = value.to_str().map_err(|_| CredentialError::InvalidBase64)?;

	Ok(ClientCredential::from_header_value(text)?)
}
