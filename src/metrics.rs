//! prometheus meters for the webhook receiver

use once_cell::sync::OnceCell;
use prometheus::{
	opts, register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
};

static RECEIVER_METRICS: OnceCell<ReceiverMetrics> = OnceCell::new();

#[derive(Debug)]
/// prometheus meters for the webhook receiver
pub(crate) struct ReceiverMetrics {
	/// received payloads by outcome (`ok`, or the kind of failure)
	pub(crate) payloads: IntCounterVec,
	/// total number of entries rendered into feeds
	pub(crate) entries: IntCounter,
}

impl ReceiverMetrics {
	/// the meters, registered with the default registry on first use
	pub(crate) fn global() -> Result<&'static Self, prometheus::Error> {
		RECEIVER_METRICS.get_or_try_init(Self::new)
	}

	/// construct prometheus meters
	fn new() -> Result<Self, prometheus::Error> {
		let payloads = register_int_counter_vec!(
			opts!("payloads_total", "received webhook payloads by outcome")
				.namespace("alertfeed")
				.subsystem("webhook"),
			&["outcome"]
		)?;

		let entries = register_int_counter!(opts!(
			"entries_total",
			"feed entries rendered from received alerts"
		)
		.namespace("alertfeed")
		.subsystem("webhook"))?;

		Ok(Self { payloads, entries })
	}

	/// counts a payload answered with a feed of `entries` entries
	pub(crate) fn record_feed(&self, entries: usize) {
		self.payloads.with_label_values(&["ok"]).inc();
		self.entries.inc_by(entries as u64);
	}

	/// counts a rejected payload
	pub(crate) fn record_failure(&self, outcome: &str) {
		self.payloads.with_label_values(&[outcome]).inc();
	}
}
