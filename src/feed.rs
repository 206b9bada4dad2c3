//! Renders webhook payloads into atom feeds.
//!
//! Every alert of a payload becomes one [FeedEntry], the rendered entries are
//! wrapped into the feed envelope configured in [FeedSettings].

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tera::Tera;
use url::Url;

use crate::{
	alert::{Alert, Data},
	entry::FeedEntry,
	error::FeedError,
	settings::Settings,
	templates::{self, TemplateSettings, FEED_TEMPLATE},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
/// the static parts of the feed envelope
pub struct FeedSettings {
	pub title: String,
	/// `<id>` of the feed
	pub id: Url,
	pub author_name: String,
	pub author_email: String,
	/// `<link rel="alternate">` of the feed
	pub self_link: Url,
}

impl FeedSettings {
	pub fn global() -> &'static Self {
		&Settings::global().feed
	}
}

impl Default for FeedSettings {
	#[allow(clippy::expect_used)]
	fn default() -> Self {
		Self {
			title: String::from("From Grafana Alert"),
			id: Url::parse("https://example.com/feed.atom").expect("valid default feed id"),
			author_name: String::from("Your Name or Organization"),
			author_email: String::from("your.email@example.com"),
			self_link: Url::parse("https://example.com").expect("valid default feed link"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// a rendered feed document
pub struct RenderedFeed {
	/// number of `<entry>` elements in the document
	pub entries: usize,
	/// the atom document
	pub document: String,
}

/// Feed renderer
pub struct FeedRenderer {
	tera: Tera,
	settings: FeedSettings,
}

impl FeedRenderer {
	/// Constructs a renderer, compiling the templates.
	///
	/// # Arguments
	///
	/// * `settings` - envelope of the feed
	///
	/// * `templates` - template files overriding the built-in templates
	pub fn new(settings: FeedSettings, templates: &TemplateSettings) -> Result<Self> {
		let tera = templates::load(templates).context("could not load feed templates")?;

		Ok(Self { tera, settings })
	}

	/// Renders a raw webhook payload, stamping the feed with the current time.
	pub fn render(&self, payload: &str) -> Result<RenderedFeed, FeedError> {
		self.render_at(payload, Utc::now())
	}

	/// Renders a raw webhook payload. The first alert that can't be rendered
	/// fails the whole payload.
	///
	/// # Arguments
	///
	/// * `payload` - json body of the webhook
	///
	/// * `now` - `<updated>` of the feed
	pub fn render_at(&self, payload: &str, now: DateTime<Utc>) -> Result<RenderedFeed, FeedError> {
		let data = Data::parse(payload)?;

		self.render_alerts(&data.alerts, now)
	}

	/// Renders already deserialized alerts, keeping their order.
	pub fn render_alerts(
		&self,
		alerts: &[Alert],
		now: DateTime<Utc>,
	) -> Result<RenderedFeed, FeedError> {
		let entries = alerts
			.iter()
			.map(|alert| FeedEntry::from(alert).render(&self.tera))
			.collect::<Result<Vec<_>, _>>()?;

		let render_error = |source| FeedError::Render { template: FEED_TEMPLATE, source };

		let mut context = tera::Context::from_serialize(&self.settings).map_err(render_error)?;
		context.insert("updated", &now.to_rfc3339_opts(SecondsFormat::Secs, false));
		context.insert("entries", &entries.join("\n"));

		let document = self.tera.render(FEED_TEMPLATE, &context).map_err(render_error)?;

		tracing::debug!("rendered feed with {} entries", entries.len());

		Ok(RenderedFeed { entries: entries.len(), document })
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	const HIGH_CPU: &str = r#"{"alerts":[{"status":"firing","labels":{"alertname":"HighCPU","filter_group":"prod"},"fingerprint":"abc123","startsAt":"2024-06-01T12:00:00+00:00","values":{"cpu":"95%"},"silenceURL":"https://example.com/silence/abc123"}]}"#;

	fn renderer() -> FeedRenderer {
		FeedRenderer::new(FeedSettings::default(), &TemplateSettings::default()).unwrap()
	}

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
	}

	fn alert(status: &str, name: &str, fingerprint: &str) -> String {
		format!(
			r#"{{"status":"{status}","labels":{{"alertname":"{name}","filter_group":"prod"}},"fingerprint":"{fingerprint}","startsAt":"2024-06-01T12:00:00Z","values":{{}},"silenceURL":"https://example.com/silence/{fingerprint}"}}"#
		)
	}

	fn payload(alerts: &[String]) -> String {
		format!(r#"{{"receiver":"feed","status":"firing","alerts":[{}]}}"#, alerts.join(","))
	}

	#[test]
	fn renders_single_alert() {
		let feed = renderer().render_at(HIGH_CPU, now()).unwrap();

		assert_eq!(feed.entries, 1);
		assert_eq!(feed.document.matches("<entry>").count(), 1);
		assert!(feed.document.contains("<title>FIRING: HighCPU - prod</title>"));
		assert!(feed.document.contains("<id>abc123.1717243200.firing</id>"));
		assert!(feed.document.contains("<summary>cpu: 95%</summary>"));
		assert!(feed
			.document
			.contains(r#"<link href="https://example.com/silence/abc123" rel="alternate"/>"#));
	}

	#[test]
	fn renders_envelope() {
		let feed = renderer().render_at(HIGH_CPU, now()).unwrap();
		let document = feed.document;

		assert!(document.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
		assert!(document.contains(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#));
		assert!(document.contains("<title>From Grafana Alert</title>"));
		assert!(document.contains("<id>https://example.com/feed.atom</id>"));
		assert!(document.contains("<updated>2024-06-01T12:30:00+00:00</updated>"));
		assert!(document.contains("<name>Your Name or Organization</name>"));
		assert!(document.contains("<email>your.email@example.com</email>"));
		assert!(document.contains(r#"<link href="https://example.com/" rel="alternate"/>"#));
		assert!(document.trim_end().ends_with("</entry>\n</feed>"));
	}

	#[test]
	fn empty_batch_renders_envelope_only() {
		let feed = renderer().render_at(r#"{"alerts": []}"#, now()).unwrap();

		assert_eq!(feed.entries, 0);
		assert!(!feed.document.contains("<entry>"));
		assert!(feed.document.trim_end().ends_with("rel=\"alternate\"/>\n</feed>"));
	}

	#[test]
	fn keeps_alert_order() {
		let alerts = [
			alert("firing", "Zeta", "z1"),
			alert("resolved", "Alpha", "a1"),
			alert("firing", "Mid", "m1"),
		];
		let feed = renderer().render_at(&payload(&alerts), now()).unwrap();

		assert_eq!(feed.entries, 3);
		assert_eq!(feed.document.matches("<entry>").count(), 3);

		let zeta = feed.document.find("FIRING: Zeta").unwrap();
		let alpha = feed.document.find("RESOLVED: Alpha").unwrap();
		let mid = feed.document.find("FIRING: Mid").unwrap();
		assert!(zeta < alpha && alpha < mid);
	}

	#[test]
	fn output_is_deterministic() {
		let renderer = renderer();
		let alerts = [alert("firing", "A", "a"), alert("firing", "B", "b")];

		let first = renderer.render_at(&payload(&alerts), now()).unwrap();
		let second = renderer.render_at(&payload(&alerts), now()).unwrap();

		assert_eq!(first, second);
	}

	#[test]
	fn uses_configured_envelope() {
		let settings = FeedSettings {
			title: String::from("Ops & Alerts"),
			id: Url::parse("https://alerts.example.org/feed.atom").unwrap(),
			author_name: String::from("Ops"),
			author_email: String::from("ops@example.org"),
			self_link: Url::parse("https://grafana.example.org/alerting/list").unwrap(),
		};
		let renderer = FeedRenderer::new(settings, &TemplateSettings::default()).unwrap();
		let document = renderer.render_at(HIGH_CPU, now()).unwrap().document;

		assert!(document.contains("<title>Ops &amp; Alerts</title>"));
		assert!(document.contains("<id>https://alerts.example.org/feed.atom</id>"));
		assert!(document.contains("<name>Ops</name>"));
		assert!(document.contains("<email>ops@example.org</email>"));
		assert!(document.contains(r#"<link href="https://grafana.example.org/alerting/list" rel="alternate"/>"#));
	}

	#[test]
	fn escapes_payload_values() {
		let payload = r#"{"alerts":[{"status":"firing","labels":{"alertname":"Disk <90%>","filter_group":"a&b"},"fingerprint":"f\"1","startsAt":"2024-06-01T12:00:00Z","values":{"<k>":"'v'"},"silenceURL":"https://example.com/silence?a=1&b=2"}]}"#;
		let document = renderer().render_at(payload, now()).unwrap().document;

		assert!(document.contains("<title>FIRING: Disk &lt;90%&gt; - a&amp;b</title>"));
		assert!(document.contains("<id>f&quot;1.1717243200.firing</id>"));
		assert!(document.contains("<summary>&lt;k&gt;: &apos;v&apos;</summary>"));
		assert!(document.contains(r#"href="https://example.com/silence?a=1&amp;b=2""#));
	}

	#[test]
	fn missing_alertname_fails_whole_batch() {
		let broken = r#"{"status":"firing","labels":{"filter_group":"prod"},"fingerprint":"x","startsAt":"2024-06-01T12:00:00Z","values":{},"silenceURL":"https://example.com"}"#;
		let alerts = [alert("firing", "Fine", "ok"), broken.to_owned()];

		let err = renderer().render_at(&payload(&alerts), now()).unwrap_err();

		assert!(matches!(err, FeedError::InvalidPayload(_)), "{err:?}");
		assert!(err.to_string().contains("alertname"), "{err}");
	}

	#[test]
	fn invalid_timestamp_fails() {
		let payload = HIGH_CPU.replace("2024-06-01T12:00:00+00:00", "last tuesday");
		let err = renderer().render_at(&payload, now()).unwrap_err();

		assert!(matches!(err, FeedError::InvalidPayload(_)), "{err:?}");
		assert!(err.to_string().contains("last tuesday"), "{err}");
	}

	#[test]
	fn missing_alerts_fails() {
		let err = renderer().render_at(r#"{"status":"firing"}"#, now()).unwrap_err();

		assert!(matches!(err, FeedError::InvalidPayload(_)), "{err:?}");
	}

	#[test]
	fn malformed_payload_fails() {
		let err = renderer().render_at("alerts=[]", now()).unwrap_err();

		assert!(matches!(err, FeedError::MalformedPayload(_)), "{err:?}");
	}

	#[test]
	fn render_stamps_current_time() {
		let before = Utc::now().timestamp();
		let document = renderer().render(r#"{"alerts":[]}"#).unwrap().document;
		let after = Utc::now().timestamp();

		let start = document.find("<updated>").unwrap() + "<updated>".len();
		let end = document.find("</updated>").unwrap();
		let updated = DateTime::parse_from_rfc3339(&document[start..end]).unwrap().timestamp();

		assert!(before <= updated && updated <= after);
		assert!(document[start..end].ends_with("+00:00"));
	}
}
