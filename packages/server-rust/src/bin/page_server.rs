//! Page server binary: serves the top page for every configured tenant.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pageprops_server::pages::top_page;
use pageprops_server::service::{build_page_pipeline, AppConfig, GlobalLayer};
use pageprops_server::{NetworkConfig, PageServer};
use tower::service_fn;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "page-server")]
#[command(about = "Multi-tenant page data server", long_about = None)]
struct Args {
    /// Tenant table (JSON): hosts and GraphQL endpoint per tenant.
    #[arg(short, long, env = "PAGEPROPS_CONFIG")]
    config: PathBuf,

    #[arg(long, env = "PAGEPROPS_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, env = "PAGEPROPS_PORT", default_value_t = 3000)]
    port: u16,

    /// Emit logs as JSON lines.
    #[arg(long, env = "PAGEPROPS_LOG_JSON")]
    log_json: bool,

    #[arg(long, env = "PAGEPROPS_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Resolves once `signal` fires. If the handler could not be installed the
/// error is logged and this never resolves, so the server keeps running.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "failed to listen for shutdown signal; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let app = AppConfig::from_file(&args.config)?;
    info!(tenants = app.tenants.len(), "loaded tenant table");

    let global = GlobalLayer::new(app.resolver(), app.client_factory(reqwest::Client::new()));

    let mut server = PageServer::new(NetworkConfig {
        host: args.host,
        port: args.port,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ..NetworkConfig::default()
    })
    .page("/", build_page_pipeline("top", &global, service_fn(top_page)));

    let port = server.start().await?;
    info!(port, "page server listening");

    server
        .serve(shutdown_on(tokio::signal::ctrl_c()))
        .await
}
