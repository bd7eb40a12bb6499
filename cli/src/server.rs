// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP server: the core API router over an in-process service, with an
//! optional Prometheus exporter.

use anyhow::{Context, Result};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use memalign_core::application::MemAlignService;
use memalign_core::presentation::api;

use crate::embedded;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (default: api.bind_address from config)
    #[arg(long, env = "MEMALIGN_HOST")]
    pub host: Option<String>,

    /// Port (default: api.port from config)
    #[arg(long, env = "MEMALIGN_PORT")]
    pub port: Option<u16>,

    /// Expose Prometheus metrics on this port
    #[arg(long, env = "MEMALIGN_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

pub async fn serve(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = embedded::load_config(config_path)?;
    let service = embedded::build_service(&config)?;

    let host = args.host.unwrap_or_else(|| config.api.bind_address.clone());
    let port = args.port.unwrap_or(config.api.port);

    if let Some(metrics_port) = args.metrics_port {
        let metrics_addr: SocketAddr = format!("{}:{}", host, metrics_port)
            .parse()
            .with_context(|| format!("Invalid metrics address {}:{}", host, metrics_port))?;
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics on http://{}/metrics", metrics_addr);
    }

    let events = service.events().clone();
    let app = api::app(service.clone() as std::sync::Arc<dyn MemAlignService>, events);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("MemAlign API listening on {}", addr);
    println!("MemAlign API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("MemAlign API shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
