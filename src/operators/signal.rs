//! Process signal delivery via pidfile

use std::io;
use std::path::Path;

use anyhow::{Context as _, Result, bail};
use manifest::Signal;

use super::{Gates, Operator};
use crate::context::Context;
use crate::render::render_env;

impl Operator for Signal {
    fn gates(&self) -> Gates<'_> {
        Gates {
            only_if: &self.only_if,
            not_if: &self.not_if,
            ..Gates::default()
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let pid_file = render_env(&self.pid_file, &ctx.facts);
        if !Path::new(&pid_file).exists() {
            bail!("pidfile does not exist at: {pid_file}");
        }
        let contents = std::fs::read_to_string(&pid_file)
            .with_context(|| format!("pid file read error: {pid_file}"))?;
        let pid: i32 = contents
            .trim()
            .parse()
            .with_context(|| format!("could not parse pid file: {pid_file}"))?;

        let signal = match self.signal.to_uppercase().as_str() {
            "SIGINT" => libc::SIGINT,
            // SIGHUP is the reload convention; it is also the fallback
            _ => libc::SIGHUP,
        };
        log::info!("sending signal {} to pid {pid}", self.signal);
        deliver(pid, signal)
    }
}

#[cfg(unix)]
fn deliver(pid: i32, signal: i32) -> Result<()> {
    // SAFETY: kill with a valid signal number; failure is reported via errno
    let rc = unsafe { libc::kill(pid, signal) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        bail!("could not signal pid {pid}: {err}");
    }
    Ok(())
}

#[cfg(not(unix))]
fn deliver(_pid: i32, _signal: i32) -> Result<()> {
    bail!("signal delivery is not supported on this platform");
}
