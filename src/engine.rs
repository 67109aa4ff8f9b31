//! Sequential step execution
//!
//! Runs a manifest's steps in configured order with fail-fast semantics:
//! the first failing step halts the run and is reported with its 1-based
//! index. There is no rollback of already-applied steps. The function is
//! reentrant; everything shared lives in the [`Context`].

use thiserror::Error;

use manifest::Manifest;

use crate::context::Context;
use crate::operators;

/// A manifest run stopped at a failing step.
#[derive(Debug, Error)]
#[error("error executing step [{index}] {name}: {source}")]
pub struct StepError {
    /// 1-based index of the failing step.
    pub index: usize,
    pub name: String,
    #[source]
    pub source: anyhow::Error,
}

/// Execute every step in order; stop at the first failure.
pub fn execute_steps(manifest: &Manifest, ctx: &Context) -> Result<(), StepError> {
    for (idx, step) in manifest.steps.iter().enumerate() {
        let index = idx + 1;
        log::info!("step [{index}] {}: {}", step.name, step.action.kind());
        if let Err(source) = operators::execute(&step.action, ctx) {
            return Err(StepError {
                index,
                name: step.name.clone(),
                source,
            });
        }
    }
    Ok(())
}
