//! Fixed-cadence execution driver
//!
//! Loads its manifest once, then re-runs it on a fixed minutes-granularity
//! interval until shutdown. An engine failure logs and ends this driver's
//! task without retrying; restarting the process is an operator concern.
//! A tick arriving while another trigger holds the execution guard is
//! skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::context::Context;
use crate::server::guard::ExecutionGuard;
use crate::server::{load_manifest, run_engine};

pub struct CadenceDriver {
    pub name: String,
    pub target: String,
    /// Interval in minutes.
    pub cadence: u64,
    pub ctx: Arc<Context>,
    pub guard: ExecutionGuard,
}

impl CadenceDriver {
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::debug!(
            "starting CadenceRunner[{}] with {} every {} minutes",
            self.name,
            self.target,
            self.cadence
        );
        let manifest = match load_manifest(&self.target).await {
            Ok(manifest) => Arc::new(manifest),
            Err(err) => {
                log::error!(
                    "cannot continue without manifest data, runner {} failed: {err:#}",
                    self.name
                );
                return;
            }
        };

        let period = Duration::from_secs(self.cadence.max(1) * 60);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // tokio's interval yields its first tick immediately, not after
        // one period; consume it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    log::info!("CadenceRunner[{}] received cancellation signal, exiting", self.name);
                    return;
                }
                _ = ticker.tick() => {
                    let Some(permit) = self.guard.try_acquire() else {
                        log::info!(
                            "CadenceRunner[{}] tick skipped, another execution is in flight",
                            self.name
                        );
                        continue;
                    };
                    log::debug!("CadenceRunner[{}] running execution steps", self.name);
                    let result = run_engine(Arc::clone(&manifest), Arc::clone(&self.ctx)).await;
                    drop(permit);
                    match result {
                        Ok(()) => log::info!("CadenceRunner[{}] execution succeeded", self.name),
                        Err(err) => {
                            log::error!("CadenceRunner[{}] failed: {err:#}", self.name);
                            return;
                        }
                    }
                }
            }
        }
    }
}
