use crate::telemetry::Metrics;
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use classifier::{ModelService, Pipeline, Preview};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

/// Per-process state handed to every handler. Built once before the listener is bound.
#[derive(Clone)]
pub struct SharedState<M: ModelService> {
    pub pipeline: Pipeline<M>,
    pub metrics: Arc<Metrics>,
    /// Preview rendering for this front-end.
    pub preview: Preview,
}

impl<M: ModelService> SharedState<M> {
    pub fn new(model_service: M, metrics: Arc<Metrics>, preview: Preview) -> Self {
        Self {
            pipeline: Pipeline::new(model_service),
            metrics,
            preview,
        }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(router: Router, addr: &str) -> anyhow::Result<Self> {
        let metrics_layer = HttpMetricsLayerBuilder::new().build();
        let router = router.layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
