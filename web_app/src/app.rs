use crate::{
    config::Config,
    routes::{dashboard_routes, web_form_routes},
    server::{HttpServer, SharedState},
    telemetry::Metrics,
};
use classifier::{load_model, Device, OrtModelService, Preview};
use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

/// Device and model are resolved before any listener is bound; a failure
/// here ends the process without serving a single request.
async fn load_state(
    config: &Config,
    service_name: &'static str,
    preview: Preview,
) -> Result<SharedState<OrtModelService>, Box<dyn Error>> {
    let device = Device::select();
    tracing::info!("Selected device: {}", device);

    let model_service = match load_model(&config.model, device).await {
        Ok(model) => model,
        Err(e) => {
            tracing::error!("Failed to load model: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let metrics = Arc::new(Metrics::new(service_name)?);
    Ok(SharedState::new(model_service, metrics, preview))
}

pub async fn start_web_form(config: Config) -> Result<(), Box<dyn Error>> {
    let state = load_state(&config, "web_form", Preview::Original).await?;
    let router = web_form_routes(state, config.upload.max_bytes);
    let server = HttpServer::new(router, &config.server.get_address()).await?;

    serve_until_shutdown(server).await
}

pub async fn start_dashboard(config: Config) -> Result<(), Box<dyn Error>> {
    let state = load_state(&config, "dashboard", config.dashboard.preview()).await?;
    let router = dashboard_routes(state, &config.dashboard.title, config.upload.max_bytes);
    let server = HttpServer::new(router, &config.dashboard.get_address()).await?;

    serve_until_shutdown(server).await
}

async fn serve_until_shutdown(server: HttpServer) -> Result<(), Box<dyn Error>> {
    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
