use replicated_store::config::{CoordinatorConfig, ReplicationConfig, TransportMode};
use replicated_store::coordinator::handlers::router;
use replicated_store::coordinator::service::Coordinator;
use replicated_store::transport::discovery::{InProcessDiscovery, ServiceDiscovery};
use replicated_store::transport::host::NodeHost;
use replicated_store::transport::http_discovery::HttpDiscovery;

use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = parse_args()?;

    tracing::info!("Starting coordinator on {}", config.bind);
    tracing::info!(
        "Data dir {}, heartbeat every {}ms, transport {:?}",
        config.data_dir.display(),
        config.heartbeat_interval_ms,
        config.transport
    );

    // 1. Storage node transport:
    let discovery: Arc<dyn ServiceDiscovery> = match config.transport {
        TransportMode::InProcess => InProcessDiscovery::new(),
        TransportMode::Http => {
            let host = NodeHost::new();
            let listener = tokio::net::TcpListener::bind(config.node_bind)
                .await
                .with_context(|| format!("Failed to bind node host on {}", config.node_bind))?;
            let node_addr = listener.local_addr()?;
            let app = host.clone().router();

            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!("Node host stopped: {}", e);
                }
            });
            tracing::info!("Storage node host listening on {}", node_addr);

            HttpDiscovery::new(
                host,
                node_addr,
                config.remote_timeout(),
                config.remote_attempts,
            )
        }
    };

    // 2. Coordinator:
    let coordinator = Coordinator::new(discovery, ReplicationConfig::from(&config));

    // 3. HTTP server:
    let app = router(coordinator);

    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `--config` is applied first; the other flags override it.
fn parse_args() -> anyhow::Result<CoordinatorConfig> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!(
            "Usage: {} [--config <file.toml>] [--bind <addr:port>] [--data-dir <dir>] [--transport <in_process|http>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:8080 --data-dir data", args[0]);
        std::process::exit(0);
    }

    let mut config = match flag_value(&args, "--config")? {
        Some(path) => CoordinatorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => CoordinatorConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 2;
            }
            "--bind" => {
                config.bind = required(&args, i)?.parse()?;
                i += 2;
            }
            "--data-dir" => {
                config.data_dir = required(&args, i)?.into();
                i += 2;
            }
            "--transport" => {
                config.transport = required(&args, i)?.parse()?;
                i += 2;
            }
            other => {
                tracing::warn!("Ignoring unknown argument {}", other);
                i += 1;
            }
        }
    }

    Ok(config)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> anyhow::Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => required(args, i).map(Some),
        None => Ok(None),
    }
}

fn required(args: &[String], i: usize) -> anyhow::Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} needs a value", args[i]))
}
