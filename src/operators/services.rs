//! systemd service state management
//!
//! The one consumer of the shared modified-file set: a service is
//! restarted when `restartAlways` is set or when one of its
//! `restartTrigger` paths was rewritten by an earlier template step.

use anyhow::{Result, bail};
use manifest::Services;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;

impl Operator for Services {
    fn gates(&self) -> Gates<'_> {
        Gates {
            os_limits: Some(&self.os_limits),
            ..Gates::default()
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        if ctx.facts.os_type != "linux" {
            log::info!("service management only supported on linux, skipping");
            return Ok(());
        }
        if ctx.facts.service_controller.is_none() {
            bail!("systemctl not found on this system");
        }

        // Unit file changes need a reload before systemd sees them.
        if ctx.any_modified_containing("systemd") {
            log::debug!("daemon reload required due to unit file change");
            exec::probe("systemctl daemon-reload");
        }

        let status = systemctl(&format!("is-active {}", self.service));
        if status.to_lowercase().contains("could not be found") {
            bail!("{} service not found", self.service);
        }

        if self.enabled {
            let current = systemctl(&format!("is-enabled {}", self.service));
            if current != "enabled" {
                let out = systemctl(&format!("enable {} --now", self.service));
                log::info!("set enabled for {}: {out}", self.service);
            }
        }

        if self.state == "started" && status != "active" {
            let out = systemctl(&format!("restart {}", self.service));
            log::info!("issued restart to inactive service {}: {out}", self.service);
        }
        if self.state == "stopped" && status != "inactive" {
            let out = systemctl(&format!("stop {}", self.service));
            log::info!("issued stop to active service {}: {out}", self.service);
        }

        if self.restart_always {
            let out = systemctl(&format!("restart {}", self.service));
            log::info!("issued restart (always) to service {}: {out}", self.service);
        } else {
            for trigger in &self.restart_on_update {
                if ctx.was_modified(trigger) {
                    let out = systemctl(&format!("restart {}", self.service));
                    log::info!(
                        "issued restart (modified {trigger}) to service {}: {out}",
                        self.service
                    );
                }
            }
        }

        // the desired state must actually hold once the dust settles
        if self.state == "started" {
            let status = systemctl(&format!("is-active {}", self.service));
            if status != "active" {
                bail!("service [{}] is in an invalid state", self.service);
            }
        }
        Ok(())
    }
}

fn systemctl(args: &str) -> String {
    exec::probe(&format!("systemctl {args}")).output().to_string()
}
