//! Control plane
//!
//! Long-running mode: one concurrent task per cadence target, one socket
//! driver holding all event targets, and a signal listener that broadcasts
//! shutdown over a watch channel. The process waits for every driver to
//! acknowledge before exiting. All drivers share the execution context,
//! the outbound queue and the single-flight guard.

pub mod cadence;
pub mod config;
pub mod guard;
pub mod protocol;
pub mod queue;
pub mod socket;

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use manifest::Manifest;
use tokio::sync::watch;

use crate::context::Context;
use crate::engine;
use cadence::CadenceDriver;
use config::ServerConfig;
use guard::ExecutionGuard;
use queue::OutboundQueue;
use socket::{SocketDriver, TcpConnector};

/// Run the control plane until a shutdown signal arrives.
pub fn run(config_path: &str, ctx: Arc<Context>) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    if config.executions.is_empty() {
        bail!("no execution targets configured");
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("could not start async runtime")?;
    runtime.block_on(serve(Arc::new(config), ctx))
}

async fn serve(config: Arc<ServerConfig>, ctx: Arc<Context>) -> Result<()> {
    log::info!("starting gaffer in server mode");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let guard = ExecutionGuard::new();
    let queue = Arc::new(OutboundQueue::new());
    let mut drivers = Vec::new();
    let mut has_events = false;

    for target in &config.executions {
        if target.is_cadence() {
            let driver = CadenceDriver {
                name: target.name.clone(),
                target: target.target.clone(),
                cadence: target.cadence,
                ctx: Arc::clone(&ctx),
                guard: guard.clone(),
            };
            drivers.push(tokio::spawn(driver.run(shutdown_rx.clone())));
        } else if target.is_event() {
            if !target.authorization.is_empty() {
                log::debug!(
                    "event target {} carries a per-target authorization",
                    target.name
                );
            }
            has_events = true;
        } else {
            log::info!(
                "skipping invalid execution target {}: type must be 'event' or 'cadence', got {:?}",
                target.name,
                target.kind
            );
        }
    }

    if has_events {
        let driver = SocketDriver {
            connector: TcpConnector {
                endpoint: config.endpoint.clone(),
            },
            config: Arc::clone(&config),
            queue,
            guard,
            ctx,
        };
        drivers.push(tokio::spawn(driver.run(shutdown_rx)));
    }

    if drivers.is_empty() {
        bail!("no usable execution targets configured");
    }

    tokio::spawn(async move {
        wait_for_signal().await;
        log::info!("shutting down server");
        let _ = shutdown_tx.send(true);
    });

    for driver in drivers {
        let _ = driver.await;
    }
    log::info!("all runners finished, server shut down");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            log::error!("cannot install SIGTERM handler: {err}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Fetch and parse a manifest off the async executor's worker threads.
pub(crate) async fn load_manifest(target: &str) -> Result<Manifest> {
    let location = target.to_string();
    tokio::task::spawn_blocking(move || -> Result<Manifest> {
        let data = loader::read(&location)
            .with_context(|| format!("cannot read manifest: {location}"))?;
        Ok(Manifest::parse(&data)?)
    })
    .await
    .context("manifest load task panicked")?
}

/// Run the engine on a blocking worker; step effects are synchronous.
pub(crate) async fn run_engine(manifest: Arc<Manifest>, ctx: Arc<Context>) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        engine::execute_steps(&manifest, &ctx).map_err(anyhow::Error::from)
    })
    .await
    .context("engine task panicked")?
}
