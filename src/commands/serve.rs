//! Control-plane entry point

use std::sync::Arc;

use anyhow::Result;

use crate::context::Context;
use crate::server;

pub fn run(config_path: &str, ctx: Arc<Context>) -> Result<()> {
    server::run(config_path, ctx)
}
