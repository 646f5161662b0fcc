#![cfg(feature = "reqwest")]

// std
use std::{collections::HashMap, io, sync::Arc};
// crates.io
use httpmock::prelude::*;
use parking_lot::Mutex;
// self
use gateway_auth::{
	auth::{ClientId, Secret},
	error::Error,
	http::{StatusCode, header::AUTHORIZATION},
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	upstream::{
		ClientAuthMethod, ExchangeError, ExchangeRequest, GrantType, OAuth2Client, OAuthClient,
		ProviderDescriptor, ReqwestHttpClient, ReqwestOAuthClient, ResponseStatusSlot,
		TokenHttpClient, TransientError, TransportErrorMapper,
	},
	url::{Url, form_urlencoded},
};

const TOKEN_BODY: &str =
	"{\"access_token\":\"upstream-token\",\"token_type\":\"bearer\",\"expires_in\":300}";

fn request() -> ExchangeRequest {
	ExchangeRequest {
		client_id: ClientId::new("alice").expect("Fixture identifier should be valid."),
		client_secret: Secret::new("s3cr3t"),
		scope: "openid profile".into(),
		grant_type: GrantType::ClientCredentials,
	}
}

fn descriptor(url: &str, method: ClientAuthMethod) -> ProviderDescriptor {
	ProviderDescriptor::builder()
		.token_endpoint(Url::parse(url).expect("Mock token endpoint should parse."))
		.client_auth(method)
		.allow_insecure_http(true)
		.build()
		.expect("Descriptor should build.")
}

fn reqwest_client(server: &MockServer) -> ReqwestOAuthClient {
	ReqwestOAuthClient::reqwest(
		&descriptor(&server.url("/token"), ClientAuthMethod::ClientSecretPost),
		ReqwestHttpClient::new().expect("Reqwest client should build."),
	)
	.expect("OAuth client should build.")
}

async fn exchange_against(status: u16, body: &'static str) -> ExchangeError {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(status).header("content-type", "application/json").body(body);
		})
		.await;
	let error = reqwest_client(&server)
		.exchange(&request())
		.await
		.expect_err("Exchange should fail.");

	mock.assert_calls_async(1).await;

	error
}

#[derive(Clone, Default)]
struct RecordingHttpClient {
	requests: Arc<Mutex<Vec<HttpRequest>>>,
}
impl RecordingHttpClient {
	fn form(&self) -> HashMap<String, String> {
		let requests = self.requests.lock();
		let body = requests.last().expect("A request should have been sent.").body();

		form_urlencoded::parse(body).into_owned().collect()
	}

	fn authorization(&self) -> Option<String> {
		let requests = self.requests.lock();
		let request = requests.last().expect("A request should have been sent.");

		request.headers().get(AUTHORIZATION).map(|value| {
			value.to_str().expect("Authorization header should be ASCII.").to_owned()
		})
	}
}
impl TokenHttpClient for RecordingHttpClient {
	type Handle = RecordingHandle;
	type TransportError = io::Error;

	fn with_status_slot(&self, slot: ResponseStatusSlot) -> Self::Handle {
		RecordingHandle { requests: self.requests.clone(), slot }
	}
}

struct RecordingHandle {
	requests: Arc<Mutex<Vec<HttpRequest>>>,
	slot: ResponseStatusSlot,
}
impl<'c> AsyncHttpClient<'c> for RecordingHandle {
	type Error = HttpClientError<io::Error>;
	type Future = std::pin::Pin<
		Box<dyn std::future::Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>,
	>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.requests.lock().push(request);
			self.slot.store(200);

			let mut response = HttpResponse::new(TOKEN_BODY.as_bytes().to_vec());

			response.headers_mut().insert(
				"content-type",
				"application/json".parse().expect("Static header value should parse."),
			);

			Ok(response)
		})
	}
}

struct IoErrorMapper;
impl TransportErrorMapper<io::Error> for IoErrorMapper {
	fn map_transport_error(
		&self,
		status: Option<u16>,
		error: HttpClientError<io::Error>,
	) -> ExchangeError {
		TransientError::TokenEndpoint { message: error.to_string(), status }.into()
	}
}

fn recording_client(
	method: ClientAuthMethod,
) -> (OAuth2Client<RecordingHttpClient, IoErrorMapper>, RecordingHttpClient) {
	let http = RecordingHttpClient::default();
	let client = OAuth2Client::<RecordingHttpClient, IoErrorMapper>::new(
		&descriptor("https://sso.example.com/token", method),
		http.clone(),
		IoErrorMapper,
	)
	.expect("OAuth client should build.");

	(client, http)
}

#[tokio::test]
async fn client_secret_post_sends_all_form_fields() {
	let (client, http) = recording_client(ClientAuthMethod::ClientSecretPost);
	let issued = client.exchange(&request()).await.expect("Exchange should succeed.");
	let form = http.form();

	assert_eq!(issued.access_token.expose(), "upstream-token");
	assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
	assert_eq!(form.get("client_id").map(String::as_str), Some("alice"));
	assert_eq!(form.get("client_secret").map(String::as_str), Some("s3cr3t"));
	assert_eq!(form.get("scope").map(String::as_str), Some("openid profile"));
	assert_eq!(http.authorization(), None);
}

#[tokio::test]
async fn client_secret_basic_moves_credentials_to_the_header() {
	let (client, http) = recording_client(ClientAuthMethod::ClientSecretBasic);

	client.exchange(&request()).await.expect("Exchange should succeed.");

	let form = http.form();

	assert!(http.authorization().is_some_and(|value| value.starts_with("Basic ")));
	assert!(!form.contains_key("client_secret"));
	assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
}

#[tokio::test]
async fn successful_response_yields_token_and_lifetime() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let issued = reqwest_client(&server)
		.exchange(&request())
		.await
		.expect("Exchange should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(issued.access_token.expose(), "upstream-token");
	assert_eq!(issued.expires_in, Some(time::Duration::seconds(300)));
}

#[tokio::test]
async fn invalid_client_is_a_forbidden_rejection() {
	let error = exchange_against(
		401,
		"{\"error\":\"invalid_client\",\"error_description\":\"Invalid client secret\"}",
	)
	.await;

	assert!(matches!(
		&error,
		ExchangeError::InvalidClient { reason } if reason.contains("Invalid client secret")
	));
	assert_eq!(Error::from(error).status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_scope_is_a_forbidden_rejection() {
	let error = exchange_against(400, "{\"error\":\"invalid_scope\"}").await;

	assert!(matches!(error, ExchangeError::InsufficientScope { .. }));
}

#[tokio::test]
async fn gateway_misconfiguration_is_bad_gateway() {
	for body in ["{\"error\":\"invalid_request\"}", "{\"error\":\"unsupported_grant_type\"}"] {
		let error = exchange_against(400, body).await;

		assert!(
			matches!(
				error,
				ExchangeError::Transient(TransientError::TokenEndpoint { status: Some(400), .. })
			),
			"{body}"
		);
		assert_eq!(Error::from(error).status(), StatusCode::BAD_GATEWAY);
	}
}

#[tokio::test]
async fn bodiless_unauthorized_is_classified_by_status() {
	let error = exchange_against(401, "").await;

	assert!(matches!(error, ExchangeError::InvalidClient { .. }));
}

#[tokio::test]
async fn server_errors_are_bad_gateway() {
	let error = exchange_against(500, "{\"error\":\"server_error\"}").await;

	assert!(matches!(
		error,
		ExchangeError::Transient(TransientError::TokenEndpoint { status: Some(500), .. })
	));
	assert_eq!(Error::from(error).status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn unparsable_success_body_is_bad_gateway() {
	let error = exchange_against(200, "{\"unexpected\":true}").await;

	assert!(matches!(
		error,
		ExchangeError::Transient(TransientError::TokenResponseParse { status: Some(200), .. })
	));
	assert_eq!(Error::from(error).status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
	let client = ReqwestOAuthClient::reqwest(
		&descriptor("http://127.0.0.1:1/token", ClientAuthMethod::ClientSecretPost),
		ReqwestHttpClient::new().expect("Reqwest client should build."),
	)
	.expect("OAuth client should build.");
	let error = client.exchange(&request()).await.expect_err("Exchange should fail.");

	assert!(matches!(error, ExchangeError::Transport(_)));
	assert_eq!(Error::from(error).status(), StatusCode::BAD_GATEWAY);
}
