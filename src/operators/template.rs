//! Templated file rendering
//!
//! Fetches a template source, substitutes `{{.name}}` placeholders from
//! the step's variables and writes the result. When the written content
//! differs from what was on disk before (or the file is new), the path is
//! recorded in the shared context so service steps can decide whether a
//! restart is warranted.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context as _, Result};
use manifest::{Template, TemplateVar};
use regex::Regex;

use super::Operator;
use crate::context::Context;
use crate::exec;
use crate::render::{manager_value, render_env};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

impl Operator for Template {
    fn apply(&self, ctx: &Context) -> Result<()> {
        let dest = render_env(&self.dest, &ctx.facts);
        let src = render_env(&self.src, &ctx.facts);
        let dest_path = Path::new(&dest);

        // Hash what is on disk now so we can tell whether this run
        // actually changed the file.
        let previous = if exec::file_exists(dest_path) {
            Some(exec::checksum(dest_path)?)
        } else {
            log::debug!("no existing file at: {dest}");
            None
        };

        let source = loader::read(&src)
            .with_context(|| format!("cannot read template source: {src}"))?;
        let source =
            String::from_utf8(source).context("template source is not valid UTF-8")?;

        let mut values = HashMap::new();
        for var in &self.vars {
            values.insert(var.variable.clone(), resolve_var(var, ctx));
        }
        let rendered = substitute(&source, &values);

        exec::make_parent_dirs(dest_path)?;
        std::fs::write(dest_path, rendered)
            .with_context(|| format!("could not write template: {dest}"))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = self.perms.unwrap_or(0o664);
            std::fs::set_permissions(dest_path, std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("could not set mode on: {dest}"))?;
        }
        if !self.owner.is_empty() {
            set_ownership(&dest, &self.owner, &self.group)?;
        }
        log::info!("template written: {dest}");

        let current = exec::checksum(dest_path)?;
        if previous.as_deref() != Some(current.as_str()) {
            ctx.note_modified(dest_path);
        }
        Ok(())
    }
}

/// Produce the substitution value for one template variable.
fn resolve_var(var: &TemplateVar, ctx: &Context) -> String {
    match var.kind.as_str() {
        "value" => manager_value(&render_env(&var.input, &ctx.facts), &ctx.facts),
        "command" => {
            let pc = exec::probe(&var.input);
            if pc.failed() {
                log::error!("template variable command failed: {}", var.input);
                "ERROR_IN_CMD".to_string()
            } else {
                pc.output().to_string()
            }
        }
        // an empty value is a legitimate substitution
        _ => String::new(),
    }
}

fn substitute(source: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(source, |caps: &regex::Captures<'_>| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn set_ownership(path: &str, owner: &str, group: &str) -> Result<()> {
    let spec = if group.is_empty() {
        owner.to_string()
    } else {
        format!("{owner}:{group}")
    };
    let pc = exec::probe(&format!("chown {spec} {path}"));
    if pc.failed() {
        log::error!("could not set ownership on {path}: {}", pc.output());
        return Err(pc.into_error());
    }
    Ok(())
}
