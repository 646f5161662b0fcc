//! HTTP transport seam for the token endpoint call.
//!
//! [`TokenHttpClient`] hands the `oauth2` crate an [`AsyncHttpClient`] handle per request.
//! Each handle writes the response status into a [`ResponseStatusSlot`] so server errors can
//! be classified with the status the provider actually returned.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;

/// HTTP stack used for token exchanges.
///
/// Implementations are shared behind [`Arc`] and must produce handles whose request futures
/// are `Send`, so the boxed exchange future can move across executor threads.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Per-request [`AsyncHttpClient`] handle.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records the response status in `slot`.
	///
	/// Handles clear the slot before sending and store the status once a response arrives,
	/// whether or not it is a success.
	fn with_status_slot(&self, slot: ResponseStatusSlot) -> Self::Handle;
}

/// Shared cell holding the HTTP status of the latest token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseStatusSlot(Arc<Mutex<Option<u16>>>);
impl ResponseStatusSlot {
	/// Records the status for the current request.
	pub fn store(&self, status: u16) {
		*self.0.lock() = Some(status);
	}

	/// Takes the recorded status, leaving the slot empty.
	pub fn take(&self) -> Option<u16> {
		self.0.lock().take()
	}
}

/// reqwest-backed transport.
///
/// Token endpoints answer directly, so clients built by [`ReqwestHttpClient::new`] never
/// follow redirects. Wrapped clients should be configured the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Borrows the wrapped client.
	pub fn client(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_status_slot(&self, slot: ResponseStatusSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// Handle returned by [`ReqwestHttpClient`]; records the response status.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseStatusSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(status.as_u16());

			let mut mapped = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*mapped.status_mut() = status;
			*mapped.headers_mut() = headers;

			Ok(mapped)
		})
	}
}
