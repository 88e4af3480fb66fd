// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use svcdns::{
    config::{build_kube_client, install_crypto_provider, Args},
    constants::TOKIO_WORKER_THREADS,
    kube_source::KubeServiceSource,
    metrics::serve_metrics,
    reconciler::Reconciler,
    shutdown::spawn_signal_listener,
    watch::WatchLoop,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    install_crypto_provider();
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("svcdns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn initialize_logging() {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    initialize_logging();

    info!("Starting service DNS controller");
    debug!(?args, "Parsed configuration");

    // Configuration errors are fatal: nothing below can recover from them
    args.validate()?;
    let provider = args.build_provider()?;
    let metrics_addr = args.metrics_addr()?;

    debug!("Initializing Kubernetes client");
    let client = build_kube_client(args.kubeconfig.as_deref()).await?;
    debug!("Kubernetes client initialized successfully");

    let source = KubeServiceSource::new(client, args.namespace.as_deref(), &args.annotation_key);
    let reconciler = Reconciler::new(Arc::new(provider))
        .with_record_ttl(args.record_ttl)
        .with_retry_policy(args.retry_policy());
    let watch_loop = WatchLoop::new(source, reconciler).with_initial_sync(args.initial_sync);

    let shutdown = CancellationToken::new();
    let signal_listener = spawn_signal_listener(shutdown.clone());

    let metrics_server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = serve_metrics(metrics_addr, shutdown).await {
                error!(address = %metrics_addr, error = %e, "Metrics server failed");
            }
        }
    });

    info!(
        namespace = args.namespace.as_deref().unwrap_or("<all>"),
        annotation_key = %args.annotation_key,
        "Starting watch loop"
    );
    let result = watch_loop.run(shutdown.clone()).await;

    // Stop the metrics server and the signal listener whichever way the loop ended
    shutdown.cancel();
    let _ = metrics_server.await;
    let _ = signal_listener.await;

    match result {
        Ok(()) => {
            info!("Graceful shutdown completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(reason = e.reason(), error = %e, "CRITICAL: watch loop terminated");
            Err(e.into())
        }
    }
}
