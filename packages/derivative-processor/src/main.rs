mod handler;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use derivative_core::{
    DerivativeConfig, DerivativePipeline, ImageCrateTransform, OriginResponseHandler,
    StorageProxyClient, ViewerRewrite,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone)]
pub struct AppState {
    pub origin: Arc<OriginResponseHandler>,
    pub viewer: Arc<ViewerRewrite>,
}

impl AppState {
    pub fn from_config(config: &DerivativeConfig) -> Self {
        let store = Arc::new(StorageProxyClient::from_config(&config.storage));
        let pipeline = DerivativePipeline::new(
            store,
            Arc::new(ImageCrateTransform::default()),
            config.storage.storage_class.clone(),
        );

        let viewer = match &config.dimension_query_param {
            Some(param) => ViewerRewrite::default().with_query_param(param.clone()),
            None => ViewerRewrite::default(),
        };

        Self {
            origin: Arc::new(OriginResponseHandler::new(pipeline, config)),
            viewer: Arc::new(viewer),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/origin-response", post(handler::origin_response))
        .route("/viewer-request", post(handler::viewer_request))
        .route("/{*path}", get(handler::serve))
        .with_state(state)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,derivative_core=debug,derivative_processor=debug")
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = DerivativeConfig::from_env()?;
    let state = AppState::from_config(&config);

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        bucket = %config.storage.bucket,
        endpoint = %config.storage.endpoint,
        triggers = ?config.trigger_status_codes,
        "derivative processor listening"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
