//! GitHub release asset download
//!
//! Resolves a release (by tag or latest), picks the asset whose
//! content-type family and name match the step, downloads it into the
//! local directory and optionally extracts it in place.

use std::path::Path;

use anyhow::{Context as _, Result, anyhow, bail};
use manifest::Github;
use serde::Deserialize;

use super::Operator;
use crate::context::Context;
use crate::operators::tarball::extract_tar;
use crate::render::render_env;

/// GitHub API rejects anonymous requests without a user agent.
const USER_AGENT: &str = "gaffer";

/// Release assets larger than this are refused.
const MAX_ASSET_SIZE: u64 = 512 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct GhRelease {
    tag_name: String,
    assets: Vec<GhAsset>,
}

#[derive(Debug, Deserialize)]
struct GhAsset {
    name: String,
    content_type: String,
    browser_download_url: String,
}

impl Operator for Github {
    fn apply(&self, ctx: &Context) -> Result<()> {
        let repo = render_env(&self.repo, &ctx.facts);
        let storage = render_env(&self.storage, &ctx.facts);
        let (owner, name) = parse_repo(&repo)?;

        let release = fetch_release(&owner, &name, &self.version)?;
        log::info!("github release for {owner}/{name}: {}", release.tag_name);

        let asset = release
            .assets
            .iter()
            .find(|a| {
                (self.asset.is_empty() || a.content_type.contains(&self.asset))
                    && (self.asset_match.is_empty() || a.name.contains(&self.asset_match))
            })
            .ok_or_else(|| {
                anyhow!(
                    "no asset matching type {:?} and name fragment {:?} in release {}",
                    self.asset,
                    self.asset_match,
                    release.tag_name
                )
            })?;

        let mut response = ureq::get(&asset.browser_download_url)
            .header("Accept", "application/octet-stream")
            .header("User-Agent", USER_AGENT)
            .call()
            .with_context(|| format!("failed to download asset: {}", asset.name))?;
        let data = response
            .body_mut()
            .with_config()
            .limit(MAX_ASSET_SIZE)
            .read_to_vec()
            .with_context(|| format!("failed to read asset body: {}", asset.name))?;

        let storage_dir = Path::new(&storage);
        std::fs::create_dir_all(storage_dir)
            .with_context(|| format!("could not create local dir: {storage}"))?;
        let local = storage_dir.join(&asset.name);
        std::fs::write(&local, &data)
            .with_context(|| format!("could not write asset: {}", local.display()))?;
        log::info!("downloaded {} ({} bytes)", local.display(), data.len());

        if self.do_extract {
            let file = std::fs::File::open(&local)?;
            extract_tar(Box::new(file), &asset.name, storage_dir, self.strip_root)?;
        }
        Ok(())
    }
}

fn fetch_release(owner: &str, name: &str, version: &str) -> Result<GhRelease> {
    let url = if version.is_empty() || version == "latest" {
        format!("https://api.github.com/repos/{owner}/{name}/releases/latest")
    } else {
        format!("https://api.github.com/repos/{owner}/{name}/releases/tags/{version}")
    };
    ureq::get(&url)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", USER_AGENT)
        .call()
        .with_context(|| format!("GitHub API request failed: {url}"))?
        .body_mut()
        .read_json()
        .context("invalid GitHub release response")
}

/// Pull `owner/name` out of a repository URL or shorthand.
fn parse_repo(repo: &str) -> Result<(String, String)> {
    let trimmed = repo
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .trim_end_matches(".git")
        .trim_matches('/');
    let mut parts = trimmed.split('/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => bail!("cannot determine owner/repo from: {repo}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_full_url() {
        let (owner, name) = parse_repo("https://github.com/acme/widgets.git").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(name, "widgets");
    }

    #[test]
    fn test_parse_repo_shorthand() {
        let (owner, name) = parse_repo("acme/widgets").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(name, "widgets");
    }

    #[test]
    fn test_parse_repo_rejects_garbage() {
        assert!(parse_repo("just-a-name").is_err());
        assert!(parse_repo("").is_err());
    }
}
