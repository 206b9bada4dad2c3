//! grafana alert webhook receiver answering notifications with atom feeds
//!
//! Features:
//! - one `<entry>` per alert, ids stay stable when grafana redelivers an alert
//! - configurable feed envelope and overridable tera templates
//! - `--stdin` converts a single payload, for use as a pipe
use std::sync::Arc;

use alertfeed::{
	feed::{FeedRenderer, FeedSettings},
	log, pipe,
	settings::Settings,
	telemetry_endpoint::{self, TelemetryEndpointSettings},
	templates::TemplateSettings,
	webhook_receiver,
};
use anyhow::{Context, Result};

/// exit the complete program if one thread panics
fn setup_panic_handler() {
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		std::process::exit(1);
	}));
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	setup_panic_handler();

	log::setup_logging().context("could not setup logging")?;

	let renderer = FeedRenderer::new(FeedSettings::global().clone(), TemplateSettings::global())
		.context("failed to construct feed renderer")?;

	if Settings::global().stdin {
		pipe::convert(&renderer, tokio::io::stdin(), tokio::io::stdout()).await?;
		return Ok(());
	}

	if TelemetryEndpointSettings::global().enabled {
		tokio::spawn(async {
			#[allow(clippy::expect_used)]
			telemetry_endpoint::run_telemetry_endpoint()
				.await
				.expect("telemetry endpoint failed to start or crashed");
		});
	}

	webhook_receiver::run_webhook_receiver(Arc::new(renderer)).await
}
