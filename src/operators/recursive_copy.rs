//! Directory tree copy with ignore patterns and depth limits

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use manifest::RecursiveCopy;
use walkdir::WalkDir;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::render::render_env;

impl Operator for RecursiveCopy {
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

        let src_path = Path::new(&src);
        if !src_path.is_dir() {
            bail!("recursive copy source is not a local directory: {src}");
        }
        let dest_path = Path::new(&dest);
        std::fs::create_dir_all(dest_path)
            .with_context(|| format!("could not create destination: {dest}"))?;

        log::info!("rcopy (maxDepth {}): {src} => {dest}", self.max_depth);

        let mut walker = WalkDir::new(src_path).min_depth(1);
        if self.max_depth > 0 {
            walker = walker.max_depth(self.max_depth);
        }

        let mut copied = 0usize;
        for entry in walker {
            let entry = entry.context("could not walk source directory")?;
            let rel = entry
                .path()
                .strip_prefix(src_path)
                .expect("walked entries live under the source root");
            let rel_str = rel.to_string_lossy();
            if self.ignores.iter().any(|ig| rel_str.contains(ig.as_str())) {
                log::debug!("ignoring: {rel_str}");
                continue;
            }
            if entry.file_type().is_dir() {
                if !self.flat_copy {
                    std::fs::create_dir_all(dest_path.join(rel))?;
                }
                continue;
            }
            let target = if self.flat_copy {
                dest_path.join(entry.file_name())
            } else {
                dest_path.join(rel)
            };
            exec::copy_file(entry.path(), &target, true)?;
            copied += 1;
        }
        log::info!("copied {copied} files");
        Ok(())
    }
}
