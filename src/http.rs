//! Transport primitives for the token exchange.
//!
//! The module exposes [`TokenHttpClient`] so hosts can integrate custom HTTP stacks:
//! the broker only needs to POST one URL-encoded form and read back the status code,
//! reason phrase, and body bytes. A reqwest-backed implementation ships behind the
//! `reqwest` feature.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`TokenHttpClient::post_form`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<FormResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing the token exchange.
///
/// Implementations must be `Send + Sync + 'static` so a single client can be shared
/// across broker instances, and the returned future must be `Send` so broker flows can
/// hop executors.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends a `POST` with an `application/x-www-form-urlencoded` body and collects the
	/// full response. Transport-level failures map to [`TransportError`]; failure HTTP
	/// statuses are returned as ordinary responses for the broker to interpret.
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(String, String)]) -> HttpFuture<'a>;
}

/// Raw token endpoint response captured by the transport.
#[derive(Clone, Debug)]
pub struct FormResponse {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase for the status, when the transport knows one.
	pub reason: Option<String>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl FormResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// `reqwest` sets the form content type itself; configure any custom client to disable
/// redirect following, since token endpoints return results directly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(String, String)]) -> HttpFuture<'a> {
		Box::pin(async move {
			let response = self
				.0
				.post(url.clone())
				.form(form)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(FormResponse {
				status: status.as_u16(),
				reason: status.canonical_reason().map(str::to_owned),
				body,
			})
		})
	}
}
