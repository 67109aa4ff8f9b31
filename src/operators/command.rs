//! Shell command execution on the local host

use anyhow::{Result, bail};
use manifest::Command;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::render::render_env;

impl Operator for Command {
    fn gates(&self) -> Gates<'_> {
        Gates {
            os_limits: Some(&self.os_limits),
            only_if: &self.only_if,
            not_if: &self.not_if,
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let cmd = render_env(&self.cmd, &ctx.facts);
        let working_dir = render_env(&self.working_dir, &ctx.facts);
        if cmd.is_empty() {
            bail!("no command to execute");
        }
        log::info!("cmd: {cmd}");
        let pc = exec::run_script(&cmd, &working_dir);
        if pc.failed() {
            log::error!("{}", pc.output());
            return Err(pc.into_error());
        }
        log::debug!("output: {}", pc.output());
        if !self.set_env.is_empty() {
            exec::set_process_env(&self.set_env, pc.output());
        }
        Ok(())
    }
}
