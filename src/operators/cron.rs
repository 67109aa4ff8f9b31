//! Scheduled-job registration under /etc/cron.d

use std::sync::LazyLock;

use anyhow::{Context as _, Result, bail};
use manifest::Cron;
use regex::Regex;

use super::{Gates, Operator};
use crate::context::Context;
use crate::render::render_env;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

impl Operator for Cron {
    fn gates(&self) -> Gates<'_> {
        Gates {
            only_if: &self.only_if,
            not_if: &self.not_if,
            ..Gates::default()
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        if ctx.facts.os_type != "linux" {
            bail!("cron jobs are only supported on linux");
        }
        let job_name = strip_non_alnum(&self.name);
        if job_name.is_empty() {
            bail!("cron job name sanitized to nothing: {:?}", self.name);
        }
        let schedule = collapse_whitespace(&self.schedule);
        let mut user = strip_non_alnum(&render_env(&self.user, &ctx.facts));
        if user.is_empty() {
            user = ctx.facts.user.clone();
        }
        let cmd = render_env(&self.cmd, &ctx.facts);

        let path = format!("/etc/cron.d/{job_name}");
        log::info!("cron: {path}");
        std::fs::write(&path, format!("{schedule} {user} {cmd}\n"))
            .with_context(|| format!("could not write cron entry: {path}"))?;
        Ok(())
    }
}

/// Keep only alphanumerics, for safe cron.d file and user names.
fn strip_non_alnum(input: &str) -> String {
    input.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Collapse runs of whitespace and trim the ends.
fn collapse_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_non_alnum() {
        assert_eq!(strip_non_alnum("nightly backup!"), "nightlybackup");
        assert_eq!(strip_non_alnum("job-42"), "job42");
        assert_eq!(strip_non_alnum("../evil"), "evil");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  0  2 *   * *  "), "0 2 * * *");
    }

    #[test]
    fn test_non_linux_host_is_an_error() {
        let op = Cron {
            name: "nightly".to_string(),
            schedule: "0 2 * * *".to_string(),
            cmd: "/usr/local/bin/backup".to_string(),
            ..Cron::default()
        };
        assert!(op.apply(&Context::default()).is_err());
    }
}
