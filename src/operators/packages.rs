//! OS package installation and removal

use anyhow::{Result, bail};
use manifest::Packages;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::facts::Facts;
use crate::render::{manager_value, render_env};

impl Operator for Packages {
    fn gates(&self) -> Gates<'_> {
        Gates {
            os_limits: Some(&self.os_limits),
            only_if: &self.only_if,
            not_if: &self.not_if,
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let names: Vec<String> = self
            .package_list
            .iter()
            .map(|pkg| manager_value(&render_env(pkg, &ctx.facts), &ctx.facts))
            .filter(|pkg| !pkg.is_empty())
            .collect();
        if names.is_empty() {
            bail!("no packages to act on");
        }
        let install = self.action != "remove";
        let verb = if install { "install" } else { "remove" };
        log::info!(
            "starting package {verb} for {}",
            ctx.facts.package_manager
        );
        if !install_packages(&names, install, &ctx.facts) {
            bail!("cannot {verb} packages: {names:?}");
        }
        Ok(())
    }
}

/// Drive the detected package manager. Returns whether it succeeded.
pub(crate) fn install_packages(names: &[String], install: bool, facts: &Facts) -> bool {
    let action = if install { "install" } else { "remove" };
    let list = names.join(" ");
    let command = match facts.package_manager.as_str() {
        "apt" => format!("apt-get {action} -y {list}"),
        "dnf" => format!("dnf {action} -y {list}"),
        "yum" => format!("yum {action} -y {list}"),
        other => {
            log::error!("no supported package manager found (got: {other:?})");
            return false;
        }
    };
    log::debug!("package command: {command}");
    let pc = exec::probe(&command);
    if pc.failed() {
        for line in pc.output().lines() {
            log::info!("{line}");
        }
        return false;
    }
    true
}
