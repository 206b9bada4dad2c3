//! errors of the feed builder
use axum::http::StatusCode;
use serde_json::error::Category;
use thiserror::Error;

/// Error occuring while turning a webhook payload into a feed
#[derive(Error, Debug)]
pub enum FeedError {
	/// the payload isn't json at all
	#[error("payload is not valid json: {0}")]
	MalformedPayload(#[source] serde_json::Error),
	/// the payload is json but not an alert notification: `alerts` or an
	/// alert field is missing, or `startsAt` isn't a timestamp
	#[error("payload is not an alert notification: {0}")]
	InvalidPayload(#[source] serde_json::Error),
	/// a template failed to render
	#[error("failed to render {template} template: {source}")]
	Render {
		/// name of the template
		template: &'static str,
		#[source]
		source: tera::Error,
	},
}

impl FeedError {
	/// the response status the webhook receiver answers with
	pub fn status_code(&self) -> StatusCode {
		match self {
			FeedError::MalformedPayload(_) | FeedError::InvalidPayload(_) => {
				StatusCode::BAD_REQUEST
			}
			FeedError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// short label used for metrics
	pub fn kind(&self) -> &'static str {
		match self {
			FeedError::MalformedPayload(_) => "malformed",
			FeedError::InvalidPayload(_) => "invalid",
			FeedError::Render { .. } => "render",
		}
	}
}

impl From<serde_json::Error> for FeedError {
	fn from(err: serde_json::Error) -> Self {
		match err.classify() {
			Category::Syntax | Category::Eof | Category::Io => FeedError::MalformedPayload(err),
			Category::Data => FeedError::InvalidPayload(err),
		}
	}
}
