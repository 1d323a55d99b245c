use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::deploy::DEPLOY_TOTAL_METRIC;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;
use super::platform::UPSTREAM_LATENCY_METRIC;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Dependencies whose per-request chatter drowns out deploy and upstream events.
const QUIET_DEPENDENCIES: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "h2=warn",
    "reqwest=warn",
    "rustls=warn",
];

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(logging.level, env_directives.as_deref());

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Resolve the event filter. Explicit `RUST_LOG` directives are honoured
/// verbatim; otherwise the configured level applies with the HTTP stack held
/// at `warn`.
pub fn build_filter(level: LevelFilter, env_directives: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    match env_directives.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => QUIET_DEPENDENCIES
            .iter()
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(builder.parse_lossy(""), EnvFilter::add_directive),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            DEPLOY_TOTAL_METRIC,
            Unit::Count,
            "Total number of deployments, labelled by outcome."
        );
        describe_histogram!(
            UPSTREAM_LATENCY_METRIC,
            Unit::Milliseconds,
            "Round-trip latency of uploads to the preview platform in milliseconds."
        );
    });
}
