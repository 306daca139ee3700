//! Fail-open adapter between the broker and the host's TTL key-value store.
//!
//! A cache outage must degrade to "always fetch," never to a hard failure: reads report
//! [`CacheLookup::Unavailable`] instead of erroring, and writes are best-effort. Both
//! degradations emit warn events when the `tracing` feature is enabled.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	obs,
	store::{StoreError, TokenStore},
};

/// Tagged outcome of a cache read, so callers can distinguish an absent key from a
/// broken store.
#[derive(Debug)]
pub enum CacheLookup {
	/// A non-empty token was found under the key.
	Hit(TokenSecret),
	/// The key is absent, expired, empty, or no store is configured.
	Miss,
	/// The store failed; the broker treats this as a miss.
	Unavailable(StoreError),
}
impl CacheLookup {
	/// Collapses the lookup into an optional token, treating `Unavailable` as a miss.
	pub fn token(self) -> Option<TokenSecret> {
		match self {
			CacheLookup::Hit(token) => Some(token),
			CacheLookup::Miss | CacheLookup::Unavailable(_) => None,
		}
	}

	/// Returns `true` when the store itself failed.
	pub fn is_unavailable(&self) -> bool {
		matches!(self, CacheLookup::Unavailable(_))
	}
}

/// Token Cache Adapter wrapping an optional host-provided [`TokenStore`].
#[derive(Clone, Default)]
pub struct CacheAdapter {
	store: Option<Arc<dyn TokenStore>>,
}
impl CacheAdapter {
	/// Wraps the host's store handle; `None` disables caching entirely.
	pub fn new(store: Option<Arc<dyn TokenStore>>) -> Self {
		Self { store }
	}

	/// Adapter with no backing store; every read misses and every write is a no-op.
	pub fn detached() -> Self {
		Self::default()
	}

	/// Fail-open read of the token under `key`.
	pub async fn load(&self, key: &str) -> CacheLookup {
		let Some(store) = &self.store else {
			return CacheLookup::Miss;
		};

		match store.get(key).await {
			Ok(Some(value)) if !value.is_empty() => CacheLookup::Hit(TokenSecret::new(value)),
			Ok(_) => CacheLookup::Miss,
			Err(error) => {
				obs::cache_read_degraded(&error);

				CacheLookup::Unavailable(error)
			},
		}
	}

	/// Best-effort write of `token` under `key`, expiring `ttl` from now.
	///
	/// No-op when no store is configured or the token is empty; a backend write error is
	/// logged and discarded.
	pub async fn store(&self, key: &str, token: &TokenSecret, ttl: Duration) {
		if token.is_empty() {
			return;
		}

		let Some(store) = &self.store else {
			return;
		};

		if let Err(error) = store.put(key, token.expose(), ttl).await {
			obs::cache_write_discarded(&error);
		}
	}
}
impl Debug for CacheAdapter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CacheAdapter").field("store_set", &self.store.is_some()).finish()
	}
}
