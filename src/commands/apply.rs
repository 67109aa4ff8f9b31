//! One-shot manifest application

use anyhow::{Context as _, Result};
use manifest::Manifest;

use crate::context::Context;
use crate::engine;

pub fn run(location: &str, ctx: &Context) -> Result<()> {
    log::debug!("starting install task");
    let data = loader::read(location)
        .with_context(|| format!("cannot proceed, manifest cannot be read: {location}"))?;
    let manifest = Manifest::parse(&data).context("could not parse manifest")?;
    engine::execute_steps(&manifest, ctx)?;
    log::info!("all steps completed");
    Ok(())
}
