//! IMS provider descriptor and token endpoint wire types.

// self
use crate::{_prelude::*, error::ConfigError};

/// IMS token endpoint used by the default descriptor.
pub const IMS_TOKEN_URL: &str = "https://ims-na1.adobelogin.com/ims/token/v3";
/// Fixed multi-claim scope string requested with every client-credentials grant.
pub const IMS_SCOPE: &str = "openid,AdobeID,additional_info.roles,profile,commerce.accs.org.read,additional_info.projectedProductContext,email";

const GENERIC_REJECTION: &str = "IMS token request failed";

/// Token endpoint location and scope configuration for one identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
	/// Token endpoint receiving the client-credentials grant.
	pub token_endpoint: Url,
	/// Scope string sent verbatim in the form body.
	pub scope: String,
}
impl ProviderDescriptor {
	/// Creates a descriptor for the provided endpoint and scope.
	pub fn new(token_endpoint: Url, scope: impl Into<String>) -> Self {
		Self { token_endpoint, scope: scope.into() }
	}

	/// Parses a descriptor from a raw endpoint string.
	pub fn parse(token_endpoint: &str, scope: impl Into<String>) -> Result<Self, ConfigError> {
		let token_endpoint =
			Url::parse(token_endpoint).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Ok(Self::new(token_endpoint, scope))
	}

	/// Default production IMS descriptor.
	pub fn ims() -> Self {
		Self::parse(IMS_TOKEN_URL, IMS_SCOPE)
			.expect("Hard-coded IMS token endpoint must be a valid URL.")
	}

	/// Token endpoint URL with the client identifier attached as a query parameter.
	///
	/// IMS expects `client_id` in the query string while the remaining grant parameters
	/// travel in the form body.
	pub fn token_url_for(&self, client_id: &str) -> Url {
		let mut url = self.token_endpoint.clone();

		url.query_pairs_mut().append_pair("client_id", client_id);

		url
	}
}
impl Default for ProviderDescriptor {
	fn default() -> Self {
		Self::ims()
	}
}

/// JSON body returned by the token endpoint for both success and failure statuses.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenResponse {
	/// Issued access token on success.
	pub access_token: Option<String>,
	/// Token lifetime in whole seconds on success.
	pub expires_in: Option<i64>,
	/// Short provider error code on failure.
	pub error: Option<String>,
	/// Human-readable provider error detail on failure.
	pub error_description: Option<String>,
}
impl TokenResponse {
	/// Builds the rejection reason for a failure status.
	///
	/// Prefers the provider's `error_description`, then its `error` code, then the HTTP
	/// reason phrase, then a generic fallback.
	pub fn rejection_reason(&self, reason_phrase: Option<&str>) -> String {
		[self.error_description.as_deref(), self.error.as_deref(), reason_phrase]
			.into_iter()
			.find_map(|candidate| candidate.filter(|value| !value.is_empty()))
			.unwrap_or(GENERIC_REJECTION)
			.to_owned()
	}
}
