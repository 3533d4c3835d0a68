mod autoscaler;
mod backup;
mod binding;
mod db;
mod leader;
#[cfg(feature = "metrics")]
mod metrics_server;
mod nodeset;
mod util;

use clap::Parser;
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Namespace used for both leader-election Leases and the controllers'
    /// own watches. Matches the teacher's `NAMESPACE` env convention.
    #[arg(long, env = "NAMESPACE", default_value = "default")]
    namespace: String,

    /// Bind address for the Prometheus `/metrics` endpoint.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    platform_common::init();

    let cli = Cli::parse();

    println!("{}", "Starting platform-operator...".green());

    let client = kube::Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to build Kubernetes client: {e}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            platform_common::shutdown::shutdown_signal().await;
            shutdown.cancel();
        }
    });

    #[cfg(feature = "metrics")]
    let metrics_task = tokio::spawn(metrics_server::run(cli.metrics_addr, shutdown.clone()));

    platform_common::signal_ready();

    // Run all four reconcilers concurrently in this task: each is driven
    // by its own leader-election loop (`leader::run_leader_elected`) and
    // only one replica acts on any given Lease at a time, so there is
    // nothing to gain from separate OS tasks here.
    tokio::join!(
        binding::run(client.clone(), &cli.namespace, shutdown.clone()),
        nodeset::run(client.clone(), &cli.namespace, shutdown.clone()),
        autoscaler::run(client.clone(), &cli.namespace, shutdown.clone()),
        backup::run(client, &cli.namespace, shutdown.clone()),
    );
    #[cfg(feature = "metrics")]
    metrics_task.abort();

    println!("{}", "platform-operator exited".red());
    Ok(())
}
