//! One-shot conversion of a single payload, used by `--stdin`.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{feed::FeedRenderer, RenderedFeed};

/// Reads one webhook payload from `input` and writes the feed to `output`.
/// Nothing is written if the payload can't be converted.
///
/// # Arguments
///
/// * `renderer` - renders the payload
///
/// * `input` - the payload, read until EOF
///
/// * `output` - receives the feed document
pub async fn convert<R, W>(
	renderer: &FeedRenderer,
	mut input: R,
	mut output: W,
) -> Result<RenderedFeed>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	let mut payload = String::new();
	input
		.read_to_string(&mut payload)
		.await
		.context("could not read payload")?;

	let feed = renderer.render(&payload).context("could not convert payload")?;

	output.write_all(feed.document.as_bytes()).await.context("could not write feed")?;
	output.flush().await.context("could not write feed")?;

	tracing::debug!("converted payload with {} alerts", feed.entries);

	Ok(feed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{error::FeedError, templates::TemplateSettings, FeedSettings};

	fn renderer() -> FeedRenderer {
		FeedRenderer::new(FeedSettings::default(), &TemplateSettings::default()).unwrap()
	}

	#[tokio::test]
	async fn writes_feed_of_payload() {
		let payload = r#"{"alerts":[{"status":"resolved","labels":{"alertname":"HighCPU","filter_group":"prod"},"fingerprint":"abc123","startsAt":"2024-06-01T12:00:00Z","values":{},"silenceURL":"https://example.com/silence/abc123"}]}"#;
		let mut output = Vec::new();

		let feed = convert(&renderer(), payload.as_bytes(), &mut output).await.unwrap();

		assert_eq!(feed.entries, 1);
		assert_eq!(String::from_utf8(output).unwrap(), feed.document);
		assert!(feed.document.contains("<title>RESOLVED: HighCPU - prod</title>"));
	}

	#[tokio::test]
	async fn invalid_payload_writes_nothing() {
		let mut output = Vec::new();

		let err = convert(&renderer(), &b"{\"alerts\": [{}]}"[..], &mut output).await.unwrap_err();

		assert!(output.is_empty());
		assert!(
			matches!(err.downcast_ref::<FeedError>(), Some(FeedError::InvalidPayload(_))),
			"{err:?}"
		);
	}

	#[tokio::test]
	async fn non_utf8_input_fails() {
		let mut output = Vec::new();

		assert!(convert(&renderer(), &[0xffu8, 0xfe][..], &mut output).await.is_err());
		assert!(output.is_empty());
	}
}
