use clap::Parser;
use inference_gateway::config::GatewayConfig;
use inference_gateway::dispatch::dispatcher::Dispatcher;
use inference_gateway::dispatch::transport::HttpWorkerTransport;
use inference_gateway::gateway::handlers::router;
use inference_gateway::gateway::service::GatewayService;
use inference_gateway::membership::scheduler::RefreshScheduler;
use inference_gateway::membership::source;
use inference_gateway::membership::store::MembershipStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting gateway on {}", config.bind);
    let auth_key = config.required_auth_key()?;

    // 1. Roster (blocking until the first snapshot is loaded):
    let registry = source::from_location(&config.registry, config.netuid)?;
    let store = MembershipStore::bootstrap(registry).await?;

    // 2. Periodic refresh:
    let cancel = CancellationToken::new();
    let scheduler =
        RefreshScheduler::spawn(store.clone(), config.refresh_period(), cancel.clone());

    // 3. Selection + dispatch:
    let policy = config.selection_policy();
    tracing::info!(
        "Selection policy: require_serving={} ceiling={:?} tie_break={:?}",
        policy.require_serving,
        policy.ceiling,
        policy.tie_break
    );
    let dispatcher = Dispatcher::new(Arc::new(HttpWorkerTransport::new()));
    let gateway = GatewayService::new(store, policy, dispatcher);

    // 4. HTTP Router:
    if auth_key.is_none() {
        tracing::warn!("Authentication disabled with --no-auth, endpoints are open");
    }
    let app = router(gateway, auth_key);

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    // Lets an in-flight refresh finish before exiting.
    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!("Refresh scheduler task failed: {}", e);
    }

    tracing::info!("Gateway stopped");
    Ok(())
}
