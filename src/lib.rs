//! IMS credential broker—fetch, cache, and inject OAuth 2.0 client-credentials access tokens
//! behind a host-defined hook contract.
//!
//! The broker resolves an access token in three steps: a fail-open read against an external
//! TTL key-value store, a client-credentials grant against the IMS token endpoint on a miss,
//! and a best-effort write-back of the fresh token. [`hook::HookInvocation`] and
//! [`hook::HookResult`] carry the host runtime's wire contract; everything else is reusable
//! library surface.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod cache;
pub mod error;
pub mod hook;
pub mod http;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{broker::Broker, http::ReqwestHttpClient, provider::ProviderDescriptor};

	/// Broker type alias used by reqwest-backed tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient>;

	/// Constructs a [`Broker`] backed by the default reqwest transport for tests.
	pub fn build_reqwest_test_broker(descriptor: ProviderDescriptor) -> ReqwestTestBroker {
		Broker::with_http_client(descriptor, ReqwestHttpClient::default())
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
