//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    fmt,
    net::SocketAddr,
    num::NonZeroU64,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, FromArgMatches, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pagedrop";
const ENV_PREFIX: &str = "PAGEDROP";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8989;
const DEFAULT_MAX_REQUEST_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_UPSTREAM_BASE_URL: &str = "https://html.luler.top";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the pagedrop binary.
#[derive(Debug, Parser)]
#[command(
    name = "pagedrop",
    version,
    about = "Package HTML pages and publish them to a preview platform"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PAGEDROP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// Resolve a missing subcommand to `serve`, reading its overrides from the environment.
    pub fn with_default_command(mut self) -> Result<Self, LoadError> {
        if self.command.is_none() {
            let serve = ServeArgs::from_env()?;
            self.command = Some(Command::Serve(Box::new(serve)));
        }
        Ok(self)
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP relay.
    Serve(Box<ServeArgs>),
    /// Deploy a single HTML document and print the result as JSON.
    Deploy(DeployArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

impl ServeArgs {
    fn from_env() -> Result<Self, LoadError> {
        let command = Self::augment_args(clap::Command::new("serve"));
        let matches = command
            .try_get_matches_from(["serve"])
            .map_err(|err| LoadError::invalid("cli", err.to_string()))?;
        Self::from_arg_matches(&matches).map_err(|err| LoadError::invalid("cli", err.to_string()))
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct UpstreamOverrides {
    /// Override the preview platform base URL.
    #[arg(
        long = "upstream-base-url",
        env = "UPLOAD_PLATFORM_BASE_URL",
        value_name = "URL"
    )]
    pub base_url: Option<String>,

    /// Override the authentication code forwarded to the preview platform.
    #[arg(
        long = "upstream-code",
        env = "UPLOAD_CODE",
        value_name = "CODE",
        hide_env_values = true
    )]
    pub code: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Enable debug logging when no explicit level is configured.
    #[arg(
        long = "debug",
        env = "DEBUG",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", env = "PORT", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the maximum accepted request body in bytes.
    #[arg(long = "server-max-request-bytes", value_name = "BYTES")]
    pub server_max_request_bytes: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// HTML file to deploy; reads standard input when omitted or `-`.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Where and how archives are uploaded.
#[derive(Clone)]
pub struct UpstreamSettings {
    pub base_url: Url,
    pub code: String,
    pub timeout: Duration,
}

impl fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url.as_str())
            .field("code", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Deploy(args)) => {
            raw.apply_upstream_overrides(&args.upstream);
            raw.apply_logging_overrides(&args.logging);
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse().with_default_command()?;
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    upstream: RawUpstreamSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(limit) = overrides.server_max_request_bytes {
            self.server.max_request_bytes = Some(limit);
        }

        self.apply_upstream_overrides(&overrides.upstream);
        self.apply_logging_overrides(&overrides.logging);
    }

    fn apply_upstream_overrides(&mut self, overrides: &UpstreamOverrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.upstream.base_url = Some(url.clone());
        }
        if let Some(code) = overrides.code.as_ref() {
            self.upstream.code = Some(code.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.upstream.timeout_seconds = Some(seconds);
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(debug) = overrides.debug {
            self.logging.debug = Some(debug);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            upstream,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let upstream = build_upstream_settings(upstream)?;

        Ok(Self {
            server,
            logging,
            upstream,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let max_request_bytes_value = server
        .max_request_bytes
        .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("server.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "server.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(ServerSettings {
        addr,
        max_request_bytes,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None if logging.debug.unwrap_or(false) => LevelFilter::DEBUG,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let raw_url = upstream
        .base_url
        .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("upstream.base_url", format!("invalid URL: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "upstream.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }
    if base_url.query().is_some() || base_url.fragment().is_some() {
        return Err(LoadError::invalid(
            "upstream.base_url",
            "must not carry a query string or fragment",
        ));
    }

    let code = upstream
        .code
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("upstream.code", "an authentication code is required"))?;

    let timeout_seconds = upstream
        .timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        base_url,
        code,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
    debug: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    base_url: Option<String>,
    code: Option<String>,
    timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
