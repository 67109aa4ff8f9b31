//! Bounded iteration over a sub-manifest
//!
//! Re-runs this executable against another manifest a fixed number of
//! times, exporting the iteration index through an environment variable
//! the sub-manifest's steps can render.

use std::process::Command;

use anyhow::{Context as _, Result, bail};
use manifest::Loop;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::render::render_env;

impl Operator for Loop {
    fn gates(&self) -> Gates<'_> {
        Gates {
            os_limits: Some(&self.os_limits),
            only_if: &self.only_if,
            not_if: &self.not_if,
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let script = render_env(&self.loop_script, &ctx.facts);
        let exe = std::env::current_exe().context("cannot locate current executable")?;

        for i in 0..self.count {
            log::info!(
                "loop iteration {i}/{} of {script} with {}={i}",
                self.count,
                self.variable
            );
            if !self.variable.is_empty() {
                exec::set_process_env(&self.variable, &i.to_string());
            }
            let output = Command::new(&exe)
                .arg(&script)
                .output()
                .with_context(|| format!("could not run loop iteration against: {script}"))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                log::error!("{}", stderr.trim());
                bail!("loop iteration {i} failed for: {script}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count_is_a_noop() {
        let op = Loop {
            loop_script: "/tmp/never-read.yml".to_string(),
            count: 0,
            ..Loop::default()
        };
        op.apply(&Context::default()).unwrap();
    }
}
