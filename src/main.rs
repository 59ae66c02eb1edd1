use std::{future::IntoFuture, process, sync::Arc};

use techtrend::{
    application::error::AppError,
    cache::{QueryParams, resolve},
    config,
    infra::{
        backend,
        error::InfraError,
        http::{self, AdminState},
        telemetry,
    },
};
use tokio::{sync::Notify, task::JoinError};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Inspect(args) => run_inspect(&args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache = backend::build_cache(&settings.cache).await?;
    let router = http::build_admin_router(AdminState {
        cache: Arc::clone(&cache),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        addr = %settings.server.admin_addr,
        cache_enabled = cache.config().enabled,
        "admin server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let notified = Arc::clone(&shutdown);
    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { notified.notified().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => return server_result(result),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| AppError::from(InfraError::from(err)))?;
            info!("shutdown signal received");
        }
    }

    shutdown.notify_one();
    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => server_result(result),
        Err(_) => {
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

fn server_result(result: Result<std::io::Result<()>, JoinError>) -> Result<(), AppError> {
    result
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::from(InfraError::from(err)))
}

fn run_inspect(args: &config::InspectArgs) -> Result<(), AppError> {
    let resolution = resolve(&QueryParams::from_query_str(&args.query));
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&resolution)
    } else {
        serde_json::to_string(&resolution)
    }
    .map_err(|err| AppError::unexpected(format!("failed to render resolution: {err}")))?;

    println!("{rendered}");
    Ok(())
}
