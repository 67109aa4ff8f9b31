//! Single-file copy from any loader-readable source

use std::fs::File;

use anyhow::{Context as _, Result};
use manifest::Copy;

use super::Operator;
use crate::context::Context;
use crate::exec;
use crate::render::render_env;

impl Operator for Copy {
    fn apply(&self, ctx: &Context) -> Result<()> {
        let src = render_env(&self.src, &ctx.facts);
        let dest = render_env(&self.dest, &ctx.facts);

        let mut source = loader::reader(&src)
            .with_context(|| format!("cannot open copy source: {src}"))?;

        let dest_path = std::path::Path::new(&dest);
        if exec::file_exists(dest_path) {
            std::fs::remove_file(dest_path)
                .with_context(|| format!("could not replace existing file: {dest}"))?;
        } else {
            exec::make_parent_dirs(dest_path)?;
        }

        let mut destination =
            File::create(dest_path).with_context(|| format!("could not create: {dest}"))?;
        let copied = std::io::copy(&mut source, &mut destination)
            .with_context(|| format!("could not copy {src} to {dest}"))?;

        #[cfg(unix)]
        if let Some(mode) = self.perm {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dest_path, std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("could not set mode on: {dest}"))?;
        }

        log::info!("copied {copied} bytes to {dest}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, b"payload").unwrap();
        let dest = dir.path().join("a/b/dst.txt");

        let op = Copy {
            src: src.to_string_lossy().into_owned(),
            dest: dest.to_string_lossy().into_owned(),
            perm: None,
        };
        op.apply(&Context::default()).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_copy_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dst.txt");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dest, b"old").unwrap();

        let op = Copy {
            src: src.to_string_lossy().into_owned(),
            dest: dest.to_string_lossy().into_owned(),
            perm: None,
        };
        op.apply(&Context::default()).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_sets_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.sh");
        std::fs::write(&src, b"#!/bin/sh\n").unwrap();
        let dest = dir.path().join("dst.sh");

        let op = Copy {
            src: src.to_string_lossy().into_owned(),
            dest: dest.to_string_lossy().into_owned(),
            perm: Some(0o755),
        };
        op.apply(&Context::default()).unwrap();
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let op = Copy {
            src: "/no/such/source".to_string(),
            dest: "/tmp/never-written".to_string(),
            perm: None,
        };
        assert!(op.apply(&Context::default()).is_err());
    }
}
