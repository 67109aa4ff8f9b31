//! Remote command execution over ssh
//!
//! Probes run on the remote host, not locally, so this operator handles
//! its own `onlyIf`/`notIf` checks instead of using the default pipeline.

use anyhow::{Result, bail};
use manifest::RemoteExec;

use super::Operator;
use crate::context::Context;
use crate::exec;
use crate::facts::Facts;
use crate::render::render_env;

impl Operator for RemoteExec {
    fn apply(&self, ctx: &Context) -> Result<()> {
        let cmd = render_env(&self.cmd, &ctx.facts);
        let host = render_env(&self.host, &ctx.facts);
        let only_if = render_env(&self.only_if, &ctx.facts);
        let not_if = render_env(&self.not_if, &ctx.facts);

        let session = Session::new(&host, &self.key, &ctx.facts);

        if !only_if.is_empty() {
            let pc = session.run(&only_if);
            if pc.failed() || pc.output().is_empty() {
                log::info!("remoteCmd skipping on (onlyIf): {only_if}");
                return Ok(());
            }
        }
        if !not_if.is_empty() {
            let pc = session.run(&not_if);
            if !pc.failed() && !pc.output().is_empty() {
                log::info!("remoteCmd skipping on (notIf): {not_if}");
                return Ok(());
            }
        }

        log::info!("remoteCmd: {cmd}");
        let pc = session.run(&cmd);
        if pc.failed() {
            log::error!("failed to execute on [{host}]: {}", pc.output());
            bail!("remote command failed on {host}: {}", pc.output());
        }
        log::debug!("output: {}", pc.output());
        if !self.set_env.is_empty() {
            exec::set_process_env(&self.set_env, pc.output());
        }
        Ok(())
    }
}

/// One resolved ssh destination.
struct Session {
    user: String,
    host: String,
    port: String,
    key: String,
}

impl Session {
    fn new(host_spec: &str, key: &str, facts: &Facts) -> Self {
        let (user, rest) = match host_spec.split_once('@') {
            Some((user, rest)) => (user.to_string(), rest),
            None => (facts.user.clone(), host_spec),
        };
        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => (host.to_string(), port.to_string()),
            None => (rest.to_string(), "22".to_string()),
        };
        Self {
            user,
            host,
            port,
            key: key.to_string(),
        }
    }

    /// Run a command on the remote host, batch mode, no prompts.
    fn run(&self, cmd: &str) -> exec::Exec {
        let mut line = format!("ssh -o BatchMode=yes -p {}", self.port);
        if !self.key.is_empty() {
            line.push_str(&format!(" -i {}", self.key));
        }
        line.push_str(&format!(" {}@{} {cmd}", self.user, self.host));
        exec::probe(&line)
    }
}
