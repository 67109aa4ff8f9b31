//! Package repository registration

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use manifest::PackageRepo;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::facts::Facts;
use crate::operators::packages::install_packages;
use crate::render::render_env;

impl Operator for PackageRepo {
    fn gates(&self) -> Gates<'_> {
        Gates {
            os_limits: Some(&self.os_limits),
            ..Gates::default()
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let location = render_env(&self.location, &ctx.facts);
        let name = if self.name.is_empty() {
            loader::base_name(&location)
        } else {
            self.name.clone()
        };
        log::info!("starting package repo configuration for {}", self.kind);
        install_prerequisites(&self.kind, &ctx.facts)?;
        match self.kind.as_str() {
            "apt" => register_apt(&name, &location, &self.key, &ctx.facts)?,
            "dnf" | "yum" => register_rpm(&name, &location, &self.key)?,
            other => bail!("no supported package manager for repo type: {other}"),
        }
        refresh_manager(&self.kind);
        Ok(())
    }
}

/// dnf needs its plugin set before repos can be managed.
fn install_prerequisites(kind: &str, facts: &Facts) -> Result<()> {
    if kind == "dnf" && !install_packages(&["dnf-plugins-core".to_string()], true, facts) {
        bail!("cannot install pre-requisite package: dnf-plugins-core");
    }
    Ok(())
}

fn register_apt(name: &str, location: &str, key: &str, facts: &Facts) -> Result<()> {
    std::fs::create_dir_all("/etc/apt/keyrings")
        .context("could not create /etc/apt/keyrings")?;
    let mut signed_by = String::new();
    if !key.is_empty() {
        let key_data = loader::read(key)
            .with_context(|| format!("could not fetch repository key: {key}"))?;
        let key_path = format!("/etc/apt/keyrings/{name}.asc");
        std::fs::write(&key_path, key_data)
            .with_context(|| format!("could not write repository key: {key_path}"))?;
        signed_by = format!(" signed-by={key_path}");
    }
    let arch = dpkg_arch(&facts.arch);
    let entry = format!(
        "deb [arch={arch}{signed_by}] {location} {} stable\n",
        facts.codename
    );
    let list_path = format!("/etc/apt/sources.list.d/{name}.list");
    std::fs::write(&list_path, entry)
        .with_context(|| format!("could not write source list: {list_path}"))?;
    log::info!("registered apt repository: {list_path}");
    Ok(())
}

fn register_rpm(name: &str, location: &str, key: &str) -> Result<()> {
    let mut definition = format!("[{name}]\nname={name}\nbaseurl={location}\nenabled=1\n");
    if key.is_empty() {
        definition.push_str("gpgcheck=0\n");
    } else {
        definition.push_str(&format!("gpgcheck=1\ngpgkey={key}\n"));
    }
    let repo_path = format!("/etc/yum.repos.d/{name}.repo");
    if let Some(parent) = Path::new(&repo_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&repo_path, definition)
        .with_context(|| format!("could not write repo definition: {repo_path}"))?;
    log::info!("registered rpm repository: {repo_path}");
    Ok(())
}

fn refresh_manager(kind: &str) {
    let command = match kind {
        "apt" => "apt-get update -y",
        "dnf" => "dnf makecache",
        "yum" => "yum makecache",
        _ => return,
    };
    if exec::probe(command).failed() {
        log::info!("package metadata refresh failed for {kind}");
    }
}

/// Map a machine architecture to dpkg's naming.
fn dpkg_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}
