//! Turns grafana alert webhook notifications into atom feeds.
//!
//! [FeedRenderer] parses the raw webhook body into [alert::Data], renders
//! every alert into an `<entry>` ([entry::FeedEntry]) and wraps the entries
//! into the feed envelope. [webhook_receiver] serves this over http.

pub mod alert;
pub mod entry;
pub mod error;
pub mod feed;
pub mod log;
mod metrics;
pub mod pipe;
pub mod settings;
pub mod telemetry_endpoint;
pub mod templates;
pub mod timestamp;
pub mod webhook_receiver;

pub use error::FeedError;
pub use feed::{FeedRenderer, FeedSettings, RenderedFeed};
