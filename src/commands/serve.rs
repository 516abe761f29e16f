use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use ecus::config::Config;
use ecus::store::{self, AppState, ArtifactStore, DeploymentRegistry};
use tower_http::trace::TraceLayer;

pub async fn run(shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
    let cfg = Config::load();
    tracing::info!(config = ?cfg, "configuration loaded");
    if cfg.api_keys.is_empty() {
        tracing::warn!("ECUS_API_KEYS is empty; every upload will be rejected");
    }

    let op = store::s3_operator(&cfg)?;
    tracing::info!(endpoint = %cfg.s3_endpoint, bucket = %cfg.s3_bucket, "object store operator created");

    let state = AppState {
        artifacts: ArtifactStore::new(op),
        deployments: DeploymentRegistry::new(),
        config: Arc::new(cfg.clone()),
    };

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(ecus::api::router(cfg.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = cfg.listen.parse()?;
    tracing::info!(%addr, "starting ecus server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("ecus server stopped");
    Ok(())
}
