use anyhow::Context;
use tempt_api::setup;
use tempt_core::Config;

// mimalloc keeps fragmentation low on musl-based container images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    tempt_api::telemetry::init_tracing()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let (state, router) = setup::initialize_app(&config).await?;
    let jobs = setup::services::spawn_background_jobs(&state);

    setup::server::start_server(&config, router, state.shutdown.clone())
        .await
        .context("Server error")?;

    for job in jobs {
        if let Err(e) = job.await {
            tracing::warn!(error = %e, "Background job ended abnormally");
        }
    }

    Ok(())
}
