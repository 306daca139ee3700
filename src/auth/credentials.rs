//! IMS client credentials and their cache-key derivation.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::secret::TokenSecret, error::ConfigError};

/// Secrets-map key carrying the IMS client identifier.
pub const CLIENT_ID_KEY: &str = "IMS_CLIENT_ID";
/// Secrets-map key carrying the IMS client secret.
pub const CLIENT_SECRET_KEY: &str = "IMS_CLIENT_SECRET";

const CACHE_KEY_PREFIX: &str = "ims:access_token";

/// Validated IMS client-credentials pair, immutable for one hook invocation.
///
/// Cache entries are keyed by [`cache_key`](Self::cache_key), a derivation of the client
/// identifier, so distinct credential sets never collide in a shared store.
#[derive(Clone, PartialEq, Eq)]
pub struct ImsCredentials {
	client_id: String,
	client_secret: TokenSecret,
}
impl ImsCredentials {
	/// Creates a credentials pair, rejecting empty components.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.into();
		let client_secret: String = client_secret.into();

		match (client_id.is_empty(), client_secret.is_empty()) {
			(true, true) =>
				Err(ConfigError::MissingCredentials { which: "client_id and client_secret" }),
			(true, false) => Err(ConfigError::MissingCredentials { which: "client_id" }),
			(false, true) => Err(ConfigError::MissingCredentials { which: "client_secret" }),
			(false, false) =>
				Ok(Self { client_id, client_secret: TokenSecret::new(client_secret) }),
		}
	}

	/// Extracts credentials from a host-supplied secrets map.
	///
	/// Absent and empty entries are treated the same way, so the error names every
	/// component the map failed to provide.
	pub fn from_secrets(secrets: &HashMap<String, String>) -> Result<Self, ConfigError> {
		let fetch = |key: &str| secrets.get(key).map(String::as_str).unwrap_or_default();

		Self::new(fetch(CLIENT_ID_KEY), fetch(CLIENT_SECRET_KEY))
	}

	/// Returns the client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns the wrapped client secret.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}

	/// Stable fingerprint of the credential identity.
	///
	/// A base64 (no padding) SHA-256 digest of the client identifier; safe to log in
	/// place of the credential material itself.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.client_id.as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}

	/// Store key under which this credential set's access token is cached.
	pub fn cache_key(&self) -> String {
		format!("{CACHE_KEY_PREFIX}:{}", self.fingerprint())
	}
}
impl Debug for ImsCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ImsCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}
