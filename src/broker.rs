//! Token lifecycle orchestration with caching + singleflight guards.
//!
//! [`Broker::ensure_token`] resolves an access token for one credential set: it reads the
//! fail-open cache, performs the client-credentials grant on a miss, writes the fresh
//! token back best-effort, and returns it. A per-cache-key singleflight guard ensures
//! concurrent misses piggy-back on the same in-flight fetch instead of stampeding the
//! token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{ImsCredentials, TokenSecret},
	cache::CacheAdapter,
	error::{ConfigError, TransientError},
	http::{FormResponse, TokenHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProviderDescriptor, TokenResponse},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Renders the outbound bearer header value for a resolved token.
pub fn authorization_header(token: &TokenSecret) -> String {
	format!("Bearer {}", token.expose())
}

/// Coordinates the token lifecycle against a single provider descriptor.
///
/// The broker owns the HTTP client and the singleflight guard map; the cache handle is
/// supplied per call because the host runtime passes its state store with each hook
/// invocation.
pub struct Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Provider descriptor that defines the token endpoint and scope.
	pub descriptor: ProviderDescriptor,
	flow_guards: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}
impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(descriptor: ProviderDescriptor, http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), descriptor, flow_guards: Default::default() }
	}

	/// Resolves an access token for the credential set, fetching on a cache miss.
	///
	/// A cached token is returned without local expiry re-validation; freshness is the
	/// store's TTL responsibility. Credential validation happens before this call, in
	/// [`ImsCredentials`] construction, so no network traffic occurs for incomplete
	/// credentials.
	pub async fn ensure_token(
		&self,
		credentials: &ImsCredentials,
		cache: &CacheAdapter,
	) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::EnsureToken;

		let span = FlowSpan::new(KIND, "ensure_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let key = credentials.cache_key();
				let guard = self.flow_guard(&key);
				let _singleflight = guard.lock().await;

				if let Some(token) = cache.load(&key).await.token() {
					return Ok(token);
				}

				let issued = self.request_token(credentials).await?;

				if let Some(ttl) = issued.expires_in {
					cache.store(&key, &issued.token, ttl).await;
				}

				Ok(issued.token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn request_token(&self, credentials: &ImsCredentials) -> Result<IssuedToken> {
		let url = self.descriptor.token_url_for(credentials.client_id());
		let form = [
			("client_secret".to_owned(), credentials.client_secret().expose().to_owned()),
			("grant_type".to_owned(), "client_credentials".to_owned()),
			("scope".to_owned(), self.descriptor.scope.clone()),
		];
		let response = self.http_client.post_form(&url, &form).await?;
		let parsed = parse_token_response(&response)?;

		if !response.is_success() {
			return Err(Error::ProviderRejected {
				reason: parsed.rejection_reason(response.reason.as_deref()),
			});
		}

		let token = parsed
			.access_token
			.filter(|value| !value.is_empty())
			.map(TokenSecret::new)
			.ok_or(ConfigError::MissingAccessToken)?;
		// A missing or non-positive lifetime skips the write-back; the token itself is
		// still usable by the caller.
		let expires_in = parsed.expires_in.filter(|seconds| *seconds > 0).map(Duration::seconds);

		Ok(IssuedToken { token, expires_in })
	}

	/// Returns (and creates on demand) the singleflight guard for a cache key.
	fn flow_guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Creates a new broker for the provided descriptor.
	///
	/// The broker provisions its own reqwest-backed transport so callers do not need to
	/// pass HTTP handles explicitly.
	pub fn new(descriptor: ProviderDescriptor) -> Self {
		Self::with_http_client(descriptor, ReqwestHttpClient::default())
	}
}
impl<C> Clone for Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			descriptor: self.descriptor.clone(),
			flow_guards: self.flow_guards.clone(),
		}
	}
}
impl<C> Debug for Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker").field("descriptor", &self.descriptor).finish()
	}
}

struct IssuedToken {
	token: TokenSecret,
	expires_in: Option<Duration>,
}

fn parse_token_response(response: &FormResponse) -> Result<TokenResponse> {
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::TokenResponseParse { source, status: response.status }.into()
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		http::HttpFuture,
		store::{MemoryStore, StoreError, StoreFuture, TokenStore},
	};

	struct ScriptedClient {
		status: u16,
		reason: Option<&'static str>,
		body: &'static str,
		delay: std::time::Duration,
		calls: AtomicUsize,
	}
	impl ScriptedClient {
		fn new(status: u16, reason: Option<&'static str>, body: &'static str) -> Arc<Self> {
			Arc::new(Self {
				status,
				reason,
				body,
				delay: std::time::Duration::ZERO,
				calls: AtomicUsize::new(0),
			})
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenHttpClient for ScriptedClient {
		fn post_form<'a>(&'a self, _url: &'a Url, _form: &'a [(String, String)]) -> HttpFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				if !self.delay.is_zero() {
					tokio::time::sleep(self.delay).await;
				}

				Ok(FormResponse {
					status: self.status,
					reason: self.reason.map(str::to_owned),
					body: self.body.as_bytes().to_vec(),
				})
			})
		}
	}

	struct ReadRefusingStore(MemoryStore);
	impl TokenStore for ReadRefusingStore {
		fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<String>> {
			Box::pin(async { Err(StoreError::Backend { message: "read refused".into() }) })
		}

		fn put<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> StoreFuture<'a, ()> {
			self.0.put(key, value, ttl)
		}
	}

	fn credentials() -> ImsCredentials {
		ImsCredentials::new("client-1", "s3cret").expect("Credential fixture should be valid.")
	}

	fn broker(client: Arc<ScriptedClient>) -> Broker<ScriptedClient> {
		Broker::with_http_client(ProviderDescriptor::ims(), client)
	}

	#[tokio::test]
	async fn cache_hit_returns_without_a_provider_call() {
		let client = ScriptedClient::new(200, Some("OK"), "{}");
		let broker = broker(client.clone());
		let credentials = credentials();
		let store = Arc::new(MemoryStore::default());

		store
			.put(&credentials.cache_key(), "cached-token", Duration::seconds(600))
			.await
			.expect("Seeding the store should succeed.");

		let cache = CacheAdapter::new(Some(store));
		let token = broker
			.ensure_token(&credentials, &cache)
			.await
			.expect("Cache hits should resolve successfully.");

		assert_eq!(token.expose(), "cached-token");
		assert_eq!(client.calls(), 0);
	}

	#[tokio::test]
	async fn miss_fetches_and_writes_back_with_the_provider_ttl() {
		let client =
			ScriptedClient::new(200, Some("OK"), "{\"access_token\":\"abc\",\"expires_in\":3600}");
		let broker = broker(client.clone());
		let credentials = credentials();
		let store = Arc::new(MemoryStore::default());
		let cache = CacheAdapter::new(Some(store.clone()));
		let token = broker
			.ensure_token(&credentials, &cache)
			.await
			.expect("Cache misses should fall through to a fetch.");

		assert_eq!(token.expose(), "abc");
		assert_eq!(client.calls(), 1);

		let written = store
			.get(&credentials.cache_key())
			.await
			.expect("Store reads should succeed.")
			.expect("Fetched token should be written back.");

		assert_eq!(written, "abc");

		let remaining = store
			.remaining_ttl(&credentials.cache_key())
			.expect("Written entry should carry a TTL.");

		assert!(remaining > Duration::seconds(3_590));
		assert!(remaining <= Duration::seconds(3_600));
	}

	#[tokio::test]
	async fn rejection_prefers_the_provider_description() {
		let client = ScriptedClient::new(
			400,
			Some("Bad Request"),
			"{\"error\":\"invalid_client\",\"error_description\":\"bad secret\"}",
		);
		let broker = broker(client);
		let err = broker
			.ensure_token(&credentials(), &CacheAdapter::detached())
			.await
			.expect_err("Provider rejections should surface to the caller.");

		assert!(matches!(&err, Error::ProviderRejected { reason } if reason == "bad secret"));
		assert_eq!(err.to_string(), "bad secret");
	}

	#[tokio::test]
	async fn rejection_falls_back_to_code_then_status_text() {
		let code_only = broker(ScriptedClient::new(
			400,
			Some("Bad Request"),
			"{\"error\":\"invalid_client\"}",
		));
		let err = code_only
			.ensure_token(&credentials(), &CacheAdapter::detached())
			.await
			.expect_err("Provider rejections should surface to the caller.");

		assert_eq!(err.to_string(), "invalid_client");

		let bare = broker(ScriptedClient::new(401, Some("Unauthorized"), "{}"));
		let err = bare
			.ensure_token(&credentials(), &CacheAdapter::detached())
			.await
			.expect_err("Provider rejections should surface to the caller.");

		assert_eq!(err.to_string(), "Unauthorized");
	}

	#[tokio::test]
	async fn malformed_bodies_map_to_parse_errors() {
		let client = ScriptedClient::new(200, Some("OK"), "<html>not json</html>");
		let broker = broker(client);
		let err = broker
			.ensure_token(&credentials(), &CacheAdapter::detached())
			.await
			.expect_err("Malformed bodies should fail the exchange.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenResponseParse { status: 200, .. }),
		));
	}

	#[tokio::test]
	async fn success_without_a_token_is_rejected() {
		let client = ScriptedClient::new(200, Some("OK"), "{\"expires_in\":3600}");
		let broker = broker(client);
		let err = broker
			.ensure_token(&credentials(), &CacheAdapter::detached())
			.await
			.expect_err("Tokenless success bodies should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingAccessToken)));
	}

	#[tokio::test]
	async fn missing_expiry_skips_the_write_back() {
		let client = ScriptedClient::new(200, Some("OK"), "{\"access_token\":\"abc\"}");
		let broker = broker(client);
		let credentials = credentials();
		let store = Arc::new(MemoryStore::default());
		let cache = CacheAdapter::new(Some(store.clone()));
		let token = broker
			.ensure_token(&credentials, &cache)
			.await
			.expect("Missing expiry should not fail the exchange.");

		assert_eq!(token.expose(), "abc");
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn unavailable_store_reads_behave_like_clean_misses() {
		let client =
			ScriptedClient::new(200, Some("OK"), "{\"access_token\":\"abc\",\"expires_in\":60}");
		let broker = broker(client.clone());
		let credentials = credentials();
		let backing = MemoryStore::default();
		let cache = CacheAdapter::new(Some(Arc::new(ReadRefusingStore(backing.clone()))));
		let token = broker
			.ensure_token(&credentials, &cache)
			.await
			.expect("Unavailable stores should degrade to always-fetch.");

		assert_eq!(token.expose(), "abc");
		assert_eq!(client.calls(), 1);
		// The write path still succeeded.
		assert_eq!(backing.len(), 1);
	}

	#[tokio::test]
	async fn concurrent_misses_share_one_fetch() {
		let client = Arc::new(ScriptedClient {
			status: 200,
			reason: Some("OK"),
			body: "{\"access_token\":\"guard-token\",\"expires_in\":900}",
			delay: std::time::Duration::from_millis(50),
			calls: AtomicUsize::new(0),
		});
		let broker = broker(client.clone());
		let credentials = credentials();
		let cache = CacheAdapter::new(Some(Arc::new(MemoryStore::default())));
		let (first, second) = tokio::join!(
			broker.ensure_token(&credentials, &cache),
			broker.ensure_token(&credentials, &cache),
		);
		let first = first.expect("First concurrent call should succeed.");
		let second = second.expect("Second concurrent call should succeed.");

		assert_eq!(first.expose(), "guard-token");
		assert_eq!(second.expose(), "guard-token");
		assert_eq!(client.calls(), 1);
	}

	#[test]
	fn authorization_header_prefixes_bearer() {
		assert_eq!(authorization_header(&TokenSecret::new("abc")), "Bearer abc");
	}
}
