use anyhow::{Context, Result};
use wxagent_api::shutdown::shutdown_signal;
use wxagent_api::{routes, AppState};
use wxagent_core::Config;
use wxagent_services::{GsodClient, HuggingFaceClient, NarrativeGenerator};

#[tokio::main]
async fn main() -> Result<()> {
    wxagent_core::init()?;

    let (config, _) = Config::load_validated()?;
    let addr = config.server.socket_addr()?;

    let source = GsodClient::new(&config.source).context("Failed to create BigQuery client")?;
    let narrator =
        HuggingFaceClient::new(&config.narrative).context("Failed to create LLM client")?;

    tracing::info!(
        project = %config.source.project_id,
        station = %config.source.station_id,
        dataset = source.table(),
        model = narrator.model(),
        "Weather Agent API starting"
    );

    let state = AppState::new(config, source, narrator);

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown_signal(tokio::signal::ctrl_c()))
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", bound);
    server.await;

    tracing::info!("Weather Agent API stopped");
    Ok(())
}
