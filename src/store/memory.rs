//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<String, Entry>>>;

#[derive(Clone, Debug)]
struct Entry {
	value: String,
	expires_at: OffsetDateTime,
}

/// Thread-safe TTL store that keeps entries in-process for tests and demos.
///
/// Entries expire passively: an expired entry is removed the next time its key is read
/// or overwritten.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn get_now(map: StoreMap, key: &str) -> Option<String> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		match guard.get(key) {
			Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
			Some(_) => {
				guard.remove(key);

				None
			},
			None => None,
		}
	}

	fn put_now(map: StoreMap, key: &str, value: &str, ttl: Duration) {
		let entry =
			Entry { value: value.to_owned(), expires_at: OffsetDateTime::now_utc() + ttl };

		map.write().insert(key.to_owned(), entry);
	}

	/// Remaining lifetime of the entry under `key`, if present and unexpired.
	pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
		let now = OffsetDateTime::now_utc();

		self.0.read().get(key).map(|entry| entry.expires_at - now).filter(|ttl| ttl.is_positive())
	}

	/// Number of entries currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn put<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::put_now(map, key, value, ttl);

			Ok(())
		})
	}
}
