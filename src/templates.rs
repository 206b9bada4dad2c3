//! Tera templates the feed is rendered with.
//!
//! The built-in templates are compiled into the binary. Both can be replaced
//! with template files via the `templates` section of the config. Every
//! template is autoescaped for xml, so values from the payload can't break
//! the document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tera::Tera;

use crate::settings::Settings;

/// name of the template rendering a single `<entry>`
pub const ENTRY_TEMPLATE: &str = "entry.xml";
/// name of the template rendering the feed envelope
pub const FEED_TEMPLATE: &str = "feed.xml";

const DEFAULT_ENTRY: &str = include_str!("../templates/entry.xml");
const DEFAULT_FEED: &str = include_str!("../templates/feed.xml");

#[derive(Debug, Clone, Default, Deserialize)]
/// template files overriding the built-in templates
pub struct TemplateSettings {
	/// receives `title`, `id`, `updated`, `summary` and `link`
	pub entry: Option<PathBuf>,
	/// receives the `feed` settings, `updated` and the rendered `entries`
	pub feed: Option<PathBuf>,
}

impl TemplateSettings {
	pub fn global() -> &'static Self {
		&Settings::global().templates
	}
}

/// Compiles the entry and feed templates.
///
/// # Arguments
///
/// * `settings` - template files to use instead of the built-in templates
pub fn load(settings: &TemplateSettings) -> Result<Tera> {
	let mut tera = Tera::default();

	tera.autoescape_on(vec![".xml"]);
	tera.set_escape_fn(escape_xml);

	let templates = [
		(ENTRY_TEMPLATE, settings.entry.as_ref(), DEFAULT_ENTRY),
		(FEED_TEMPLATE, settings.feed.as_ref(), DEFAULT_FEED),
	];

	for (name, file, default) in templates {
		match file {
			Some(path) => {
				tracing::info!("load {} template from {}", name, path.display());

				tera.add_template_file(path, Some(name))
					.context(format!("could not load {name} template from {path:?}"))?;
			}
			None => tera
				.add_raw_template(name, default)
				.context(format!("could not compile default {name} template"))?,
		}
	}

	Ok(tera)
}

/// Escapes text for xml element content and attribute values. Control
/// characters xml 1.0 doesn't allow are replaced with U+FFFD.
pub fn escape_xml(input: &str) -> String {
	let mut output = String::with_capacity(input.len());

	for c in input.chars() {
		match c {
			'&' => output.push_str("&amp;"),
			'<' => output.push_str("&lt;"),
			'>' => output.push_str("&gt;"),
			'"' => output.push_str("&quot;"),
			'\'' => output.push_str("&apos;"),
			'\t' | '\n' | '\r' => output.push(c),
			'\u{0}'..='\u{1f}' | '\u{FFFE}' | '\u{FFFF}' => output.push('\u{FFFD}'),
			c => output.push(c),
		}
	}

	output
}
