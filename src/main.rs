use std::{process, sync::Arc};

use pagedrop::{
    application::{
        archive::decode_html,
        deploy::DeployService,
        error::{AppError, DeployError},
    },
    config,
    domain::submission::Submission,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        input::read_document,
        platform::PlatformClient,
        telemetry,
    },
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let dotenv = dotenvy::dotenv();
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;
    if let Ok(path) = &dotenv {
        debug!(target = "pagedrop::config", path = %path.display(), "loaded .env file");
    }

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Deploy(args) => run_deploy(settings, args).await,
    }
}

fn build_deploy_service(settings: &config::Settings) -> Result<DeployService, AppError> {
    let client = PlatformClient::new(&settings.upstream)?;
    Ok(DeployService::new(Arc::new(client)))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let deploy = build_deploy_service(&settings)?;
    let body_limit = usize::try_from(settings.server.max_request_bytes.get()).unwrap_or(usize::MAX);
    let router = http::build_router(HttpState::new(deploy), body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "pagedrop::server",
        addr = %settings.server.addr,
        upstream = %settings.upstream.base_url,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "pagedrop::server", "server stopped");
    Ok(())
}

async fn run_deploy(settings: config::Settings, args: config::DeployArgs) -> Result<(), AppError> {
    let deploy = build_deploy_service(&settings)?;

    let bytes = read_document(args.file.as_deref()).await?;
    let html = decode_html(bytes).map_err(DeployError::from)?;
    let result = deploy.deploy(Submission::new(html)).await?;

    let rendered = serde_json::to_string_pretty(&result)
        .map_err(|err| AppError::unexpected(format!("failed to encode result: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "pagedrop::server", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "pagedrop::server", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(target = "pagedrop::server", "shutdown signal received");
}
