//! Operator execution
//!
//! Every operator variant runs through the same pre-execution pipeline
//! before its effect: the OS gate (mismatch skips the step, logged, not an
//! error), then the `onlyIf` probe (proceed only when it succeeds with
//! non-empty output), then the `notIf` probe (skip when it succeeds with
//! non-empty output). Only then does the variant's [`Operator::apply`]
//! run; its failure is the step's failure.
//!
//! Operators are immutable once resolved, so environment rendering of
//! eligible fields happens inside each variant's `apply` and produces
//! locals rather than mutating the step.

mod api;
mod command;
mod copy;
mod cron;
mod git;
mod github;
mod iterate;
mod package_repo;
mod packages;
mod recursive_copy;
mod remote_exec;
mod services;
mod signal;
mod tarball;
mod template;

use anyhow::{Result, anyhow};
use manifest::{Action, OsFilter};

use crate::context::Context;
use crate::exec;

/// Skip conditions shared by every operator variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gates<'a> {
    pub os_limits: Option<&'a OsFilter>,
    pub only_if: &'a str,
    pub not_if: &'a str,
}

/// The shared operator contract.
pub trait Operator {
    /// Skip conditions for this operator; default is unconditional.
    fn gates(&self) -> Gates<'_> {
        Gates::default()
    }

    /// The variant-specific effect.
    fn apply(&self, ctx: &Context) -> Result<()>;

    /// Run the common pipeline, then the effect.
    fn execute(&self, ctx: &Context) -> Result<()> {
        let gates = self.gates();
        if let Some(limits) = gates.os_limits {
            if !ctx.facts.can_exec_on_os(limits) {
                log::info!("skipped due to os limit: {}", limits.as_str());
                return Ok(());
            }
        }
        if !gates.only_if.is_empty() {
            let pc = exec::probe(gates.only_if);
            if pc.failed() || pc.output().is_empty() {
                log::info!("skipping on (onlyIf): {}", gates.only_if);
                return Ok(());
            }
        }
        if !gates.not_if.is_empty() {
            let pc = exec::probe(gates.not_if);
            if !pc.failed() && !pc.output().is_empty() {
                log::info!("skipping on (notIf): {}", gates.not_if);
                return Ok(());
            }
        }
        self.apply(ctx)
    }
}

/// Execute a resolved action against the shared context.
pub fn execute(action: &Action, ctx: &Context) -> Result<()> {
    match action {
        Action::Cron(op) => op.execute(ctx),
        Action::Command(op) => op.execute(ctx),
        Action::Tarball(op) => op.execute(ctx),
        Action::Copy(op) => op.execute(ctx),
        Action::RecursiveCopy(op) => op.execute(ctx),
        Action::Template(op) => op.execute(ctx),
        Action::PackageRepo(op) => op.execute(ctx),
        Action::Packages(op) => op.execute(ctx),
        Action::Services(op) => op.execute(ctx),
        Action::Api(op) => op.execute(ctx),
        Action::Git(op) => op.execute(ctx),
        Action::Github(op) => op.execute(ctx),
        Action::RemoteExec(op) => op.execute(ctx),
        Action::Loop(op) => op.execute(ctx),
        Action::Signal(op) => op.execute(ctx),
        Action::Null => Err(anyhow!("invalid operator")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recording<'a> {
        gates: Gates<'a>,
        applied: std::cell::Cell<bool>,
    }

    impl Operator for Recording<'_> {
        fn gates(&self) -> Gates<'_> {
            self.gates
        }

        fn apply(&self, _ctx: &Context) -> Result<()> {
            self.applied.set(true);
            Ok(())
        }
    }

    fn run(gates: Gates<'_>) -> bool {
        let op = Recording {
            gates,
            applied: std::cell::Cell::new(false),
        };
        op.execute(&Context::default()).unwrap();
        op.applied.get()
    }

    #[test]
    fn test_null_action_fails() {
        let err = execute(&Action::Null, &Context::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid operator");
    }

    #[test]
    fn test_unconditional_operator_applies() {
        assert!(run(Gates::default()));
    }

    #[test]
    fn test_only_if_requires_success_and_output() {
        assert!(run(Gates {
            only_if: "echo yes",
            ..Gates::default()
        }));
        // succeeds but prints nothing
        assert!(!run(Gates {
            only_if: "true",
            ..Gates::default()
        }));
        // fails
        assert!(!run(Gates {
            only_if: "false",
            ..Gates::default()
        }));
    }

    #[test]
    fn test_not_if_skips_on_success_with_output() {
        assert!(!run(Gates {
            not_if: "echo present",
            ..Gates::default()
        }));
        assert!(run(Gates {
            not_if: "true",
            ..Gates::default()
        }));
        assert!(run(Gates {
            not_if: "false",
            ..Gates::default()
        }));
    }

    #[test]
    fn test_os_gate_skips_without_error() {
        let filter = OsFilter::new("fedora:39");
        let gates = Gates {
            os_limits: Some(&filter),
            ..Gates::default()
        };
        // default context has an empty os id, which cannot match
        assert!(!run(gates));
    }
}
