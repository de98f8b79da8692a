//! LeaseWarden Election Agent
//!
//! Joins the leader election for a named lease and holds leadership for
//! the life of the process. Deploy one agent per candidate pod; exactly
//! one of them leads at a time, and a leader that loses its lease exits
//! so the pod restarts as a follower.
//!
//! ## Production Features
//!
//! - **In-cluster discovery**: API server address and service account
//!   credentials are picked up from the pod environment.
//! - **Prometheus metrics**: Enable with `metrics.enabled` to export the
//!   `election.leader_running_total` heartbeat counter.
//!
//! ## Development Mode
//!
//! Set `LEASEWARDEN_DEV_MODE=true` to run outside a cluster with:
//! - An in-memory lease store instead of the Kubernetes API
//! - A generated identity when `POD_NAME`/`POD_UID` are unset

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};
use uuid::Uuid;

use lw_common::LeaderIdentity;
use lw_config::{AppConfig, ConfigLoader, KubeSettings};
use lw_election::{ElectionConfig, LeaderElection};
use lw_kube::{InMemoryLeaseRepository, KubeClientConfig, KubeLeaseClient, LeaseRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for local development)
    let _ = dotenvy::dotenv();

    lw_common::logging::init_logging("lw-agent");

    info!("Starting LeaseWarden Election Agent");

    // 1. Load and validate configuration
    let config = ConfigLoader::new().load()?;
    config.validate()?;

    // 2. Start the metrics exporter when enabled
    if config.metrics.enabled {
        let addr: std::net::SocketAddr = config.metrics.listen_addr.parse().map_err(|e| {
            anyhow::anyhow!(
                "invalid metrics listen address {}: {}",
                config.metrics.listen_addr,
                e
            )
        })?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("failed to start metrics exporter: {}", e))?;
        info!(addr = %addr, "Prometheus metrics exporter listening");
    }

    // 3. Resolve this candidate's identity from the downward API
    let identity = match LeaderIdentity::from_env() {
        Some(identity) => identity,
        None if config.dev_mode => {
            let name = format!("dev-{}", Uuid::new_v4());
            warn!(identity = %name, "POD_NAME/POD_UID not set; using a generated dev identity");
            LeaderIdentity::new(name, Uuid::new_v4().to_string())
        }
        None => {
            return Err(anyhow::anyhow!(
                "POD_NAME and POD_UID are required (or set LEASEWARDEN_DEV_MODE=true)"
            ));
        }
    };

    // 4. Resolve the namespace the lease lives in
    let namespace = resolve_namespace(&config)?;

    // 5. Build the lease repository
    let repository: Arc<dyn LeaseRepository> = if config.dev_mode {
        info!("Development mode enabled - using in-memory lease store");
        Arc::new(InMemoryLeaseRepository::new())
    } else {
        let kube_config = build_kube_config(&config.kube)?;
        Arc::new(KubeLeaseClient::new(kube_config)?)
    };

    // 6. Join the election
    let election_config = ElectionConfig::new(
        config.election.lease_name.clone(),
        namespace.clone(),
        identity.clone(),
    )
    .with_interval(Duration::from_secs(config.election.interval_seconds))
    .with_retry_backoffs(
        config
            .election
            .retry_backoff_ms
            .iter()
            .map(|&ms| Duration::from_millis(ms))
            .collect(),
    )
    .with_renew_retry_budget(config.election.renew_retry_budget);

    let election = LeaderElection::new(election_config, repository);

    log_startup_summary(&config, &identity, &namespace);

    let (promoted_tx, promoted_rx) = tokio::sync::oneshot::channel::<()>();
    let promoted_identity = identity.clone();
    tokio::spawn(async move {
        if promoted_rx.await.is_ok() {
            info!(identity = %promoted_identity, "Promoted to leader; holding the lease");
        }
    });

    let mut election_task = tokio::spawn(election.become_leader_for_life(move || {
        let _ = promoted_tx.send(());
    }));

    info!("LeaseWarden Agent started. Press Ctrl+C to shutdown.");

    // 7. Hold until the session ends or a shutdown signal arrives
    tokio::select! {
        result = &mut election_task => {
            return finish_election(result);
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutdown signal received...");

    // The lease is left in place on purpose. The pod's deletion garbage
    // collects it through the owner reference, and a replacement takes
    // over after the staleness threshold at the latest.
    election_task.abort();

    info!("LeaseWarden Agent shutdown complete");
    Ok(())
}

/// Turn the finished election task into the process exit status. The
/// election only returns on fatal errors, so even a clean return means
/// something went wrong enough to exit.
fn finish_election(
    result: std::result::Result<lw_election::Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match result {
        Ok(Ok(())) => {
            error!("Election ended unexpectedly without an error");
            Err(anyhow::anyhow!("election ended unexpectedly"))
        }
        Ok(Err(e)) => {
            error!(error = %e, "Election session failed; exiting so a replacement can take over");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "Election task panicked");
            Err(anyhow::anyhow!("election task panicked: {}", e))
        }
    }
}

/// Namespace resolution order: explicit configuration, then the
/// downward-API `POD_NAMESPACE`, then `default` in dev mode.
fn resolve_namespace(config: &AppConfig) -> Result<String> {
    if !config.election.namespace.is_empty() {
        return Ok(config.election.namespace.clone());
    }
    if let Ok(namespace) = std::env::var("POD_NAMESPACE") {
        if !namespace.is_empty() {
            return Ok(namespace);
        }
    }
    if config.dev_mode {
        return Ok("default".to_string());
    }
    Err(anyhow::anyhow!(
        "POD_NAMESPACE is required (or set LEASEWARDEN_NAMESPACE)"
    ))
}

/// Build the API client config, preferring explicit settings over
/// in-cluster discovery.
fn build_kube_config(settings: &KubeSettings) -> Result<KubeClientConfig> {
    let config = if settings.api_url.is_empty() {
        KubeClientConfig::in_cluster()?
    } else {
        KubeClientConfig::from_files(
            settings.api_url.clone(),
            &settings.token_path,
            &settings.ca_cert_path,
        )?
    };

    Ok(config
        .with_connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
        .with_request_timeout(Duration::from_millis(settings.request_timeout_ms)))
}

/// Log startup summary
fn log_startup_summary(config: &AppConfig, identity: &LeaderIdentity, namespace: &str) {
    info!("=== LeaseWarden Agent Startup Summary ===");
    info!("  Lease: {}/{}", namespace, config.election.lease_name);
    info!("  Identity: {}", identity);
    info!("  Interval: {}s", config.election.interval_seconds);

    if config.dev_mode {
        info!("  Store: in-memory (dev mode)");
    } else if config.kube.api_url.is_empty() {
        info!("  Store: Kubernetes API (in-cluster)");
    } else {
        info!("  Store: Kubernetes API at {}", config.kube.api_url);
    }

    if config.metrics.enabled {
        info!("  Metrics: {}", config.metrics.listen_addr);
    } else {
        info!("  Metrics: disabled");
    }

    info!("=========================================");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
