//! Turns a single alert into an atom `<entry>`.

use serde::Serialize;
use tera::Tera;

use crate::{alert::Alert, error::FeedError, templates::ENTRY_TEMPLATE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// the fields of an `<entry>` derived from an alert, also the template context
pub struct FeedEntry {
	/// `FIRING: alertname - filter_group`
	pub title: String,
	/// `fingerprint.epoch_seconds.status`, stable for redeliveries of an alert
	pub id: String,
	/// when the alert started
	pub updated: String,
	/// one `name: value` line per alert value
	pub summary: String,
	/// the silence url of the alert
	pub link: String,
}

impl FeedEntry {
	/// Renders the entry with the [ENTRY_TEMPLATE] of `tera`.
	///
	/// # Arguments
	///
	/// * `tera` - the compiled templates, see [crate::templates::load]
	pub fn render(&self, tera: &Tera) -> Result<String, FeedError> {
		let render_error = |source| FeedError::Render { template: ENTRY_TEMPLATE, source };

		let context = tera::Context::from_serialize(self).map_err(render_error)?;
		let mut fragment = tera.render(ENTRY_TEMPLATE, &context).map_err(render_error)?;

		// template files end with a newline, fragments are joined by the feed
		fragment.truncate(fragment.trim_end().len());

		Ok(fragment)
	}
}

impl From<&Alert> for FeedEntry {
	fn from(alert: &Alert) -> Self {
		let title = format!(
			"{}: {} - {}",
			alert.status.to_uppercase(),
			alert.labels.alertname,
			alert.labels.filter_group
		);

		let id = format!(
			"{}.{}.{}",
			alert.fingerprint,
			alert.starts_at.epoch_seconds(),
			alert.status
		);

		let summary = alert
			.values
			.iter()
			.map(|(name, value)| format!("{name}: {value}"))
			.collect::<Vec<_>>()
			.join("\n");

		Self {
			title,
			id,
			updated: alert.starts_at.as_str().to_owned(),
			summary,
			link: alert.silence_url.clone(),
		}
	}
}
