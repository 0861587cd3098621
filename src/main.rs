use anyhow::Context;
use clap::Parser;
use dynamcp::{
    config::{config_source_from_location, ServerSettings, SettingsOverrides, TransportKind},
    mcp::{CapabilityRegistry, DynamicMcpService, RefreshLoop},
    services::{HandlerInvoker, HttpExecutor},
};
use rmcp::{
    transport::{
        sse_server::{SseServer, SseServerConfig},
        stdio,
    },
    ServiceExt,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dynamcp")]
#[command(
    about = "MCP server whose tools, resources and prompts come from a refreshable config",
    long_about = None,
    version
)]
struct Cli {
    /// Capability config location: http(s) URL or file path [env: DYNAMCP_CONFIG]
    #[arg(short, long)]
    config: Option<String>,

    /// Seconds between config refreshes [env: DYNAMCP_REFRESH_SECS, default: 60]
    #[arg(long)]
    refresh_secs: Option<u64>,

    /// Default timeout for remote handler calls [env: DYNAMCP_HANDLER_TIMEOUT_MS]
    #[arg(long)]
    handler_timeout_ms: Option<u64>,

    /// Protocol transport: stdio or sse [env: DYNAMCP_TRANSPORT]
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Listen address for the SSE transport [env: DYNAMCP_SSE_BIND]
    #[arg(long)]
    sse_bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // stdout carries the stdio transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynamcp=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    let cli = Cli::parse();
    let settings = ServerSettings::resolve(SettingsOverrides {
        config_location: cli.config,
        refresh_secs: cli.refresh_secs,
        handler_timeout_ms: cli.handler_timeout_ms,
        transport: cli.transport,
        sse_bind: cli.sse_bind,
    })?;

    // Initial load is fatal on failure
    let source = config_source_from_location(&settings.config_location);
    tracing::info!(source = %source.describe(), "Loading capability configuration");
    let initial = source
        .fetch()
        .await
        .with_context(|| format!("failed to load capabilities from {}", source.describe()))?;
    tracing::info!(
        tools = initial.tools.len(),
        resources = initial.resources.len(),
        prompts = initial.prompts.len(),
        "Capability configuration loaded"
    );

    let registry = Arc::new(CapabilityRegistry::new());
    registry.load(initial).await;

    let invoker = HandlerInvoker::new(Arc::new(HttpExecutor::with_timeout(
        settings.handler_timeout,
    )));
    let service = DynamicMcpService::new(registry.clone(), invoker)
        .with_server_name(settings.server_name.clone());

    let refresh = RefreshLoop::new(registry, source, settings.refresh_interval).spawn();
    let ct = CancellationToken::new();
    let notifier = service.spawn_change_notifier(ct.clone());

    let result = match settings.transport {
        TransportKind::Stdio => serve_stdio(service).await,
        TransportKind::Sse => serve_sse(service, settings.sse_bind, ct.clone()).await,
    };

    ct.cancel();
    refresh.stop().await;
    if let Err(e) = notifier.await {
        tracing::error!("Change notifier task failed: {}", e);
    }

    tracing::info!("Server stopped");
    result
}

async fn serve_stdio(service: DynamicMcpService) -> anyhow::Result<()> {
    tracing::info!("Serving MCP over stdio");
    let running = service.serve(stdio()).await?;

    tokio::select! {
        quit = running.waiting() => {
            let reason = quit?;
            tracing::info!(?reason, "Client session ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn serve_sse(
    service: DynamicMcpService,
    bind: SocketAddr,
    ct: CancellationToken,
) -> anyhow::Result<()> {
    let config = SseServerConfig {
        bind,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: ct.clone(),
        sse_keep_alive: Some(Duration::from_secs(30)),
    };

    let sse_server = SseServer::serve_with_config(config)
        .await
        .with_context(|| format!("failed to bind SSE transport on {}", bind))?;
    tracing::info!(%bind, "Serving MCP over SSE at /sse");

    let server_ct = sse_server.with_service(move || service.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    server_ct.cancel();

    Ok(())
}
