// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("ims_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Warns that a cache read failed and the broker fell back to a miss.
pub(crate) fn cache_read_degraded(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %error, "Cache read failed; treating as a miss.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Warns that a best-effort cache write was discarded.
pub(crate) fn cache_write_discarded(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %error, "Cache write failed; token returned without caching.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Records a successful hook authorization without exposing the token value.
pub(crate) fn hook_authorized(source: &str, fingerprint: &str, token_len: usize) {
	#[cfg(feature = "tracing")]
	tracing::info!(source, fingerprint, token_len, "Authorized.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (source, fingerprint, token_len);
	}
}

/// Records a hook failure message.
pub(crate) fn hook_rejected(source: &str, message: &str) {
	#[cfg(feature = "tracing")]
	tracing::error!(source, message, "IMS auth hook failed.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (source, message);
	}
}
