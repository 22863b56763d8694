use axum::serve;
use clap::Parser;
use color_eyre::{
    eyre::WrapErr,
    Result,
};
use exporter_merger::Merger;
use exporter_merger_config::{
    Args,
    Config,
};
use exporter_merger_http::{
    logging::init_logging,
    router::create_router,
};
use tokio::net::TcpListener;

async fn start_server(config: Config) -> Result<()> {
    let merger = Merger::from_config(&config).wrap_err("building the HTTP client failed")?;
    if merger.sources().is_empty() {
        tracing::warn!("no exporters configured, serving an empty document");
    }
    let app = create_router(merger);

    let listen_address = config.listen_address();
    let listener = TcpListener::bind(listen_address)
        .await
        .wrap_err_with(|| format!("cannot listen on {listen_address}"))?;
    tracing::info!(
        exporters = config.exporter_urls().len(),
        timeout = ?config.exporters_timeout(),
        deduplicate = config.deduplicate,
        "listening on {listen_address}"
    );

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("cannot listen for the shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = Config::new(args).wrap_err("loading the configuration failed")?;
    config.validate().wrap_err("invalid configuration")?;
    start_server(config).await
}
