//! Archive fetch and extraction

use std::io::Read;
use std::path::{Component, Path};

use anyhow::{Context as _, Result};
use flate2::read::GzDecoder;
use manifest::Tarball;

use super::{Gates, Operator};
use crate::context::Context;
use crate::render::render_env;

impl Operator for Tarball {
    fn gates(&self) -> Gates<'_> {
        Gates {
            only_if: &self.only_if,
            not_if: &self.not_if,
            ..Gates::default()
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let src = render_env(&self.src, &ctx.facts);
        let dest = render_env(&self.dest, &ctx.facts);

        if Path::new(&dest).exists() && !self.force {
            log::info!("{dest} already exists, not extracting tarball");
            return Ok(());
        }
        log::info!("tarball: {src} => {dest}");
        let reader =
            loader::reader(&src).with_context(|| format!("cannot read tarball at: {src}"))?;
        extract_tar(reader, &src, Path::new(&dest), self.strip)
    }
}

/// Unpack a tar stream, gunzipping first when the name says so.
///
/// With `strip_root` the archive's leading path component is dropped, the
/// way a `--strip-components=1` extraction behaves.
pub(crate) fn extract_tar(
    reader: Box<dyn Read + Send>,
    name: &str,
    dest: &Path,
    strip_root: bool,
) -> Result<()> {
    let reader: Box<dyn Read> = if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries().context("could not read tar entries")? {
        let mut entry = entry.context("corrupt tar entry")?;
        let path = entry.path().context("tar entry has an unusable path")?;

        let relative = if strip_root {
            let mut components = path.components();
            components.next();
            components.as_path().to_path_buf()
        } else {
            path.to_path_buf()
        };
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            continue;
        }

        let target = dest.join(&relative);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&target)
            .with_context(|| format!("could not unpack: {}", target.display()))?;
    }
    Ok(())
}
