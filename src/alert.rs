//! data structures for deserializing incoming grafana alert webhooks
use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::FeedError;
use crate::timestamp::Timestamp;

#[derive(Clone, Debug, Deserialize)]
/// notification received by the webhook receiver. grafana sends a lot more
/// (receiver, group labels, external url, ...) which we ignore.
pub struct Data {
	/// the alerts of this notification in the order grafana sent them
	pub alerts: Vec<Alert>,
}

impl Data {
	/// Deserializes a raw webhook body.
	///
	/// # Arguments
	///
	/// * `payload` - the json text sent by grafana
	pub fn parse(payload: &str) -> Result<Self, FeedError> {
		Ok(serde_json::from_str(payload)?)
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// a single alert of a notification
pub struct Alert {
	/// alert state, e.g. `firing` or `resolved`
	pub status: String,
	pub labels: Labels,
	/// stable identifier of the alerting condition
	pub fingerprint: String,
	pub starts_at: Timestamp,
	/// evaluated query values, kept in payload order
	pub values: IndexMap<String, MetricValue>,
	#[serde(rename = "silenceURL")]
	pub silence_url: String,
}

#[derive(Clone, Debug, Deserialize)]
/// alert labels. `alertname` and `filter_group` are needed to title an entry,
/// any other label is ignored whatever its type
#[allow(clippy::missing_docs_in_private_items)]
pub struct Labels {
	pub alertname: String,
	pub filter_group: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
/// a value of an alert. grafana sends numbers, but anything json goes
pub struct MetricValue(pub serde_json::Value);

impl fmt::Display for MetricValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			serde_json::Value::String(value) => f.write_str(value),
			value => write!(f, "{value}"),
		}
	}
}
