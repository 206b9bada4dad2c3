use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, Environment, File, FileFormat, FileSourceFile, Source};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::{
    feed::FeedSettings, log::LogSettings, telemetry_endpoint::TelemetryEndpointSettings,
    templates::TemplateSettings, webhook_receiver::ReceiverSettings,
};

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// config file looked up when `--config` isn't given, may be absent
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// prefix of environment variables overriding the config file, e.g.
/// `ALERTFEED_FEED__TITLE`
const ENV_PREFIX: &str = "ALERTFEED";

#[derive(Debug, Parser)]
#[command(version, about)]
struct Opts {
    /// path of config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// log level
    #[arg(
        long = "log",
        ignore_case = true,
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    level: Option<String>,
    /// convert a single payload read from stdin, print the feed and exit
    #[arg(long)]
    stdin: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub feed: FeedSettings,
    pub templates: TemplateSettings,
    pub webhook_receiver: ReceiverSettings,
    pub telemetry_endpoint: TelemetryEndpointSettings,
    pub log: LogSettings,
    /// one-shot conversion of stdin, only settable on the command line
    #[serde(skip)]
    pub stdin: bool,
}

impl Settings {
    pub fn global() -> &'static Self {
        SETTINGS.get_or_init(|| {
            match Self::load().context("failed to load config and command line arguments") {
                Ok(settings) => settings,
                Err(err) => {
                    // tracing wasn't setup yet
                    panic!("{:#?}", err);
                }
            }
        })
    }

    fn load() -> Result<Self> {
        let opts = Opts::parse();

        let mut settings = Self::from_source(config_file(opts.config.as_deref()))?;

        if let Some(level) = opts.level {
            settings.log.level = level;
        }

        settings.stdin = opts.stdin;

        Ok(settings)
    }

    /// Loads settings from a config source, overridden by `ALERTFEED_`
    /// environment variables. Missing options fall back to their defaults.
    pub fn from_source<T>(source: T) -> Result<Self>
    where
        T: Source + Send + Sync + 'static,
    {
        Self::from_sources(source, environment())
    }

    fn from_sources<T>(source: T, env: Environment) -> Result<Self>
    where
        T: Source + Send + Sync + 'static,
    {
        let conf = Config::builder()
            .add_source(source)
            .add_source(env)
            .build()
            .context("can't load config")?;

        conf.try_deserialize().context("can't load config")
    }
}

/// the config file given with `--config`, which has to exist, or the
/// optional default one
fn config_file(path: Option<&Path>) -> File<FileSourceFile, FileFormat> {
    match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
