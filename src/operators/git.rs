//! Source repository cloning

use std::path::Path;

use anyhow::{Result, bail};
use manifest::Git;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::render::render_env;

impl Operator for Git {
    fn gates(&self) -> Gates<'_> {
        Gates {
            os_limits: Some(&self.os_limits),
            only_if: &self.only_if,
            not_if: &self.not_if,
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let repo = render_env(&self.repo, &ctx.facts);
        let location = render_env(&self.location, &ctx.facts);

        let dest = Path::new(&location);
        if dest.join(".git").exists() {
            log::info!("git repo already exists: {location}");
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pc = exec::probe(&format!("git clone {repo} {location}"));
        if pc.failed() {
            log::error!("failed to clone repo: {}", pc.output());
            bail!("failed to clone {repo}: {}", pc.output());
        }
        log::info!("git cloned: {repo} to {location}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_checkout_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("checkout/.git")).unwrap();

        let op = Git {
            repo: "https://invalid.example/repo.git".to_string(),
            location: dir.path().join("checkout").to_string_lossy().into_owned(),
            ..Git::default()
        };
        // never touches the network when .git is already present
        op.apply(&Context::default()).unwrap();
    }

    #[test]
    fn test_unreachable_repo_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let op = Git {
            repo: "/no/such/repo.git".to_string(),
            location: dir.path().join("fresh").to_string_lossy().into_owned(),
            ..Git::default()
        };
        assert!(op.apply(&Context::default()).is_err());
    }
}
