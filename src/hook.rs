//! Host-runtime hook contract and the bearer-injection entry point.
//!
//! The host invokes [`Broker::inject_auth`] once per outgoing request with a
//! [`HookInvocation`] carrying the secrets map and an optional state-store handle. The
//! entry point never returns an error: every lifecycle failure is converted into a
//! structured [`HookResult`] so the host process is never escalated to.

// self
use crate::{
	_prelude::*,
	auth::{ImsCredentials, TokenSecret},
	broker::{Broker, authorization_header},
	cache::CacheAdapter,
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

/// Fixed confirmation message returned on success.
pub const HOOK_SUCCESS_MESSAGE: &str = "Authorized";

const AUTHORIZATION_HEADER: &str = "Authorization";

/// One hook invocation as delivered by the host runtime.
#[derive(Clone)]
pub struct HookInvocation {
	/// Invocation context; the hook reports a structured error when absent.
	pub context: Option<HookContext>,
	/// Identifier of the invoking source. Informational only; it appears in log events
	/// but never changes behavior.
	pub source_name: String,
}

/// Secrets and state handle supplied with each invocation.
///
/// The original hook contract also carried a logger; this crate emits through `tracing`
/// instead, so hosts install a subscriber rather than passing a handle.
#[derive(Clone, Default)]
pub struct HookContext {
	/// Host-provisioned secrets (`IMS_CLIENT_ID`, `IMS_CLIENT_SECRET`).
	pub secrets: HashMap<String, String>,
	/// TTL key-value store owned by the host, when one is configured.
	pub state: Option<Arc<dyn TokenStore>>,
}
impl Debug for HookContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HookContext")
			.field("secret_keys", &self.secrets.keys().collect::<Vec<_>>())
			.field("state_set", &self.state.is_some())
			.finish()
	}
}

/// Hook status discriminant serialized as `SUCCESS`/`ERROR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookStatus {
	/// The request was authorized and headers were attached.
	Success,
	/// Token resolution failed; the message carries the cause.
	Error,
}

/// Structured result returned to the host runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResult {
	/// Overall invocation status.
	pub status: HookStatus,
	/// Fixed confirmation string on success, failure detail on error.
	pub message: String,
	/// Request mutations to apply; present only on success.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<HookData>,
}
impl HookResult {
	/// Builds the success result carrying the bearer header.
	pub fn authorized(token: &TokenSecret) -> Self {
		let headers =
			BTreeMap::from([(AUTHORIZATION_HEADER.to_owned(), authorization_header(token))]);

		Self {
			status: HookStatus::Success,
			message: HOOK_SUCCESS_MESSAGE.to_owned(),
			data: Some(HookData { request: RequestPatch { headers } }),
		}
	}

	/// Builds an error result with the provided message.
	pub fn rejected(message: impl Into<String>) -> Self {
		Self { status: HookStatus::Error, message: message.into(), data: None }
	}
}

/// Success payload wrapper mandated by the host wire contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookData {
	/// Mutations applied to the outgoing request.
	pub request: RequestPatch,
}

/// Header mutations for the outgoing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPatch {
	/// Headers merged into the outgoing request.
	pub headers: BTreeMap<String, String>,
}

impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Resolves a token for the invocation and injects it as a bearer-auth header.
	///
	/// Never panics and never returns `Err`; every failure becomes a structured
	/// [`HookStatus::Error`] result. Success is logged without the token value, only its
	/// length and the credential fingerprint.
	pub async fn inject_auth(&self, invocation: HookInvocation) -> HookResult {
		const KIND: FlowKind = FlowKind::InjectAuth;

		let span = FlowSpan::new(KIND, "inject_auth");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let source = invocation.source_name;
		let result = span
			.instrument(async move {
				let Some(context) = invocation.context else {
					return HookResult::rejected("Hook context is unavailable");
				};
				let cache = CacheAdapter::new(context.state.clone());
				let outcome = async {
					let credentials = ImsCredentials::from_secrets(&context.secrets)?;
					let token = self.ensure_token(&credentials, &cache).await?;

					Ok::<_, Error>((credentials, token))
				}
				.await;

				match outcome {
					Ok((credentials, token)) => {
						obs::hook_authorized(
							&source,
							&credentials.fingerprint(),
							token.expose().len(),
						);

						HookResult::authorized(&token)
					},
					Err(error) => {
						let message = format!("Unable to obtain IMS token: {error}");

						obs::hook_rejected(&source, &message);

						HookResult::rejected(message)
					},
				}
			})
			.await;

		match result.status {
			HookStatus::Success => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			HookStatus::Error => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
