use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chunkline_core::{
    create_audit_system, load_config, validate_config, ArchiveHook, AuditStore, CollectionHook,
    HttpResumableSink, MemoryAuditStore, PostUploadHook, RemoteSink, TransferEngine,
    UploadOrchestrator,
};
use chunkline_server::api::create_router;
use chunkline_server::state::AppState;

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

/// Audit records kept in memory
const AUDIT_HISTORY: usize = 10_000;

/// How long shutdown waits for queued audit events to be stored
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CHUNKLINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Upload endpoint: {}", config.sink.endpoint);
    info!(
        "Throttling: {} (ceiling {} Mbps)",
        config.upload.throttling_enabled, config.upload.max_upload_rate_mbps
    );

    // Create remote sink
    let sink: Arc<dyn RemoteSink> = Arc::new(
        HttpResumableSink::new(config.sink.clone()).context("Failed to create upload client")?,
    );
    info!("Using remote sink: {}", sink.name());

    // Create audit system
    let audit_store: Arc<dyn AuditStore> = Arc::new(MemoryAuditStore::new(AUDIT_HISTORY));
    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    // Post-upload hooks
    info!(
        "Collections: auto-create {} (privacy {})",
        config.collections.auto_create, config.collections.privacy
    );
    let mut hooks: Vec<Arc<dyn PostUploadHook>> = vec![Arc::new(
        CollectionHook::new(Arc::clone(&sink), &config.collections)
            .with_audit(audit_handle.clone()),
    )];
    if config.archive.enabled {
        info!("Archiving uploads to {:?}", config.archive.archive_dir);
        hooks.push(Arc::new(
            ArchiveHook::new(&config.archive).with_audit(audit_handle.clone()),
        ));
    } else {
        info!("Archiving disabled in config");
    }

    // Create orchestrator
    let engine = Arc::new(TransferEngine::new(sink, config.upload.clone()));
    let orchestrator = Arc::new(
        UploadOrchestrator::new(config.orchestrator.clone(), engine, hooks)
            .with_audit(audit_handle),
    );

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&orchestrator),
        audit_store,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let the in-flight upload finish; queued ones are cancelled
    info!("Server shutting down...");
    orchestrator.shutdown().await;

    // The orchestrator and its hooks hold the last audit handles. AppState
    // went down with the router, so this closes the writer's channel.
    drop(orchestrator);
    match tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, writer_handle).await {
        Ok(_) => info!("Audit writer stopped"),
        Err(_) => error!("Audit writer did not stop within {:?}", AUDIT_DRAIN_TIMEOUT),
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
