//! axum and tower adapters.
//!
//! [`RoleFilterLayer`] wraps any route with a [`RoleFilter`]; rejected requests get an empty
//! response with the mapped status and never reach the inner service. The
//! [`credential_exchange`] middleware answers requests under the credential path and passes
//! everything else through.
//!
//! ```ignore
//! let router = Router::new()
//! 	.nest("/admin", admin_routes.layer(RoleFilterLayer::new(auth.admin.clone())))
//! 	.layer(axum::middleware::from_fn_with_state(auth.endpoint.clone(), credential_exchange));
//! ```

// std
use std::task::{Context, Poll};
// crates.io
use axum::{
	body::Body,
	extract::{Request, State},
	http::HeaderMap,
	middleware::Next,
	response::{IntoResponse, Response},
};
use tower::{Layer, Service};
// self
use crate::{
	_prelude::*,
	endpoint::CredentialAuthEndpoint,
	filter::{FilterDecision, RoleFilter},
};

/// Boxed response future of [`RoleFilterService`].
pub type RoleFilterFuture<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

/// Applies one [`RoleFilter`] to every request of the wrapped service.
#[derive(Clone, Debug)]
pub struct RoleFilterLayer {
	filter: Arc<RoleFilter>,
}
impl RoleFilterLayer {
	/// Wraps `filter`.
	pub fn new(filter: RoleFilter) -> Self {
		Self { filter: Arc::new(filter) }
	}
}
impl From<RoleFilter> for RoleFilterLayer {
	fn from(filter: RoleFilter) -> Self {
		Self::new(filter)
	}
}
impl<S> Layer<S> for RoleFilterLayer {
	type Service = RoleFilterService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		RoleFilterService { inner, filter: self.filter.clone() }
	}
}

/// Service produced by [`RoleFilterLayer`].
#[derive(Clone, Debug)]
pub struct RoleFilterService<S> {
	inner: S,
	filter: Arc<RoleFilter>,
}
impl<S, B> Service<Request<B>> for RoleFilterService<S>
where
	S: 'static + Clone + Send + Service<Request<B>, Response = Response>,
	S::Future: Send,
	B: 'static + Send,
{
	type Error = S::Error;
	type Future = RoleFilterFuture<S::Error>;
	type Response = Response;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, request: Request<B>) -> Self::Future {
		match self.filter.apply(request) {
			FilterDecision::Allow(request) => {
				// The polled-ready service handles this call; a fresh clone takes its place.
				let clone = self.inner.clone();
				let mut ready = std::mem::replace(&mut self.inner, clone);

				Box::pin(async move { ready.call(request).await })
			},
			FilterDecision::Reject(error) => {
				let status = error.status();

				Box::pin(async move { Ok(status.into_response()) })
			},
		}
	}
}

/// Middleware for `axum::middleware::from_fn_with_state`: answers the credential path and
/// forwards every other request to `next`.
pub async fn credential_exchange(
	State(endpoint): State<Arc<CredentialAuthEndpoint>>,
	request: Request,
	next: Next,
) -> Response {
	if !endpoint.matches(request.uri().path()) {
		return next.run(request).await;
	}

	endpoint.respond(request.headers()).await.map(Body::from)
}

/// Route handler form of the credential endpoint; ignores the request path.
pub async fn credential_handler(
	State(endpoint): State<Arc<CredentialAuthEndpoint>>,
	headers: HeaderMap,
) -> Response {
	endpoint.respond(&headers).await.map(Body::from)
}
