//! Mockrest Server binary - starts a test server from fixture files.

use clap::{CommandFactory, Parser};
use mockrest_server::{app, register_fixture, Config, Mocks};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Starts a test server using the specified mock fixtures.
#[derive(Debug, Parser)]
#[command(name = "mockrest-server", version, about)]
struct Cli {
    /// JSON fixture files declaring the mocked resources
    fixtures: Vec<PathBuf>,

    /// Port to listen on (overrides PORT, default 8080)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind (overrides HOST, default 127.0.0.1)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if cli.fixtures.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mockrest_server=debug,mockrest_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }

    // Register fixtures
    let mut mocks = Mocks::new();
    for fixture in &cli.fixtures {
        let count = register_fixture(&mut mocks, fixture)?;
        tracing::info!(fixture = %fixture.display(), resources = count, "Loaded fixture");
    }

    // Start server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server at http://{}/ ...", addr);

    axum::serve(listener, app(mocks, &config)).await?;

    Ok(())
}
