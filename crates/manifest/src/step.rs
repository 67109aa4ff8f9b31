//! Steps and operator resolution
//!
//! A manifest step is a flat YAML mapping: a `name` plus the fields of
//! exactly one operator. The format carries no type discriminator, so the
//! operator is recognized structurally: each candidate variant is tried in
//! a fixed priority order with a lenient decode, and the first candidate
//! whose signature field comes back populated wins. A node matching no
//! candidate resolves to [`Action::Null`], which fails only if and when
//! that step is executed.
//!
//! The priority order is part of the manifest contract: earlier entries
//! win ties, so reordering the chain changes how ambiguous nodes resolve.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::ops::{
    Api, Command, Copy, Cron, Git, Github, Loop, PackageRepo, Packages, RecursiveCopy, RemoteExec,
    Services, Signal, Tarball, Template,
};

/// One resolved operator. Exactly one variant per step, fixed at load time.
#[derive(Debug, Clone)]
pub enum Action {
    Cron(Cron),
    Command(Command),
    Tarball(Tarball),
    Copy(Copy),
    RecursiveCopy(RecursiveCopy),
    Template(Template),
    PackageRepo(PackageRepo),
    Packages(Packages),
    Services(Services),
    Api(Api),
    Git(Git),
    Github(Github),
    RemoteExec(RemoteExec),
    Loop(Loop),
    Signal(Signal),
    /// No candidate matched; executing this step is a deterministic error.
    Null,
}

impl Action {
    /// Resolve an untyped step node into exactly one operator variant.
    pub fn resolve(node: &Value) -> Self {
        if let Some(op) = decode::<Cron>(node).filter(|op| !op.schedule.is_empty()) {
            log::debug!("matched cron operator");
            return Self::Cron(op);
        }
        if let Some(op) = decode::<Command>(node).filter(|op| !op.cmd.is_empty()) {
            log::debug!("matched command operator");
            return Self::Command(op);
        }
        if let Some(op) = decode::<Tarball>(node).filter(|op| !op.src.is_empty()) {
            log::debug!("matched tarball operator");
            return Self::Tarball(op);
        }
        if let Some(op) = decode::<Copy>(node).filter(|op| !op.src.is_empty()) {
            log::debug!("matched copy operator");
            return Self::Copy(op);
        }
        if let Some(op) = decode::<RecursiveCopy>(node).filter(|op| !op.src.is_empty()) {
            log::debug!("matched recursive copy operator");
            return Self::RecursiveCopy(op);
        }
        if let Some(op) = decode::<Template>(node).filter(|op| !op.dest.is_empty()) {
            log::debug!("matched template operator");
            return Self::Template(op);
        }
        if let Some(op) = decode::<PackageRepo>(node).filter(|op| !op.location.is_empty()) {
            log::debug!("matched package repository operator");
            return Self::PackageRepo(op);
        }
        if let Some(op) = decode::<Packages>(node).filter(|op| !op.package_list.is_empty()) {
            log::debug!("matched packages operator");
            return Self::Packages(op);
        }
        if let Some(op) = decode::<Services>(node).filter(|op| !op.service.is_empty()) {
            log::debug!("matched services operator");
            return Self::Services(op);
        }
        if let Some(op) = decode::<Api>(node).filter(|op| !op.endpoint.is_empty()) {
            log::debug!("matched api operator");
            return Self::Api(op);
        }
        if let Some(op) = decode::<Git>(node).filter(|op| !op.repo.is_empty()) {
            log::debug!("matched git operator");
            return Self::Git(op);
        }
        if let Some(op) = decode::<Github>(node).filter(|op| !op.repo.is_empty()) {
            log::debug!("matched github operator");
            return Self::Github(op);
        }
        if let Some(op) = decode::<RemoteExec>(node).filter(|op| !op.cmd.is_empty()) {
            log::debug!("matched remote exec operator");
            return Self::RemoteExec(op);
        }
        if let Some(op) = decode::<Loop>(node).filter(|op| !op.loop_script.is_empty()) {
            log::debug!("matched loop operator");
            return Self::Loop(op);
        }
        if let Some(op) = decode::<Signal>(node).filter(|op| !op.pid_file.is_empty()) {
            log::debug!("matched signal operator");
            return Self::Signal(op);
        }
        Self::Null
    }

    /// Short name of the resolved variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cron(_) => "cron",
            Self::Command(_) => "command",
            Self::Tarball(_) => "tarball",
            Self::Copy(_) => "copy",
            Self::RecursiveCopy(_) => "recursiveCopy",
            Self::Template(_) => "template",
            Self::PackageRepo(_) => "packageRepo",
            Self::Packages(_) => "packages",
            Self::Services(_) => "services",
            Self::Api(_) => "api",
            Self::Git(_) => "git",
            Self::Github(_) => "github",
            Self::RemoteExec(_) => "remoteExec",
            Self::Loop(_) => "loop",
            Self::Signal(_) => "signal",
            Self::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Lenient structural decode: unknown fields are ignored, any type
/// mismatch rejects this candidate without failing the load.
fn decode<T: DeserializeOwned>(node: &Value) -> Option<T> {
    serde_yaml::from_value(node.clone()).ok()
}

/// A named unit of work carrying exactly one operator.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: Action,
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let node = Value::deserialize(deserializer)?;
        let name = node
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let action = Action::resolve(&node);
        Ok(Self { name, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(yaml: &str) -> Action {
        let node: Value = serde_yaml::from_str(yaml).unwrap();
        Action::resolve(&node)
    }

    #[test]
    fn test_resolves_command() {
        let action = resolve("name: run it\ncmd: echo hi\ndir: /tmp\n");
        match action {
            Action::Command(op) => {
                assert_eq!(op.cmd, "echo hi");
                assert_eq!(op.working_dir, "/tmp");
            }
            other => panic!("expected command, got {}", other.kind()),
        }
    }

    #[test]
    fn test_resolves_packages() {
        let action = resolve("packageList: [nginx, curl]\naction: install\n");
        match action {
            Action::Packages(op) => assert_eq!(op.package_list, vec!["nginx", "curl"]),
            other => panic!("expected packages, got {}", other.kind()),
        }
    }

    #[test]
    fn test_cron_wins_over_command() {
        // A cron node also carries a cmd field; the earlier candidate wins.
        let action = resolve("cron: nightly\nschedule: '0 2 * * *'\ncmd: /usr/local/bin/job\n");
        assert_eq!(action.kind(), "cron");
    }

    #[test]
    fn test_unmatched_node_is_null() {
        let action = resolve("name: mystery\nfrobnicate: yes\n");
        assert!(action.is_null());
    }

    #[test]
    fn test_type_mismatch_skips_candidate_only() {
        // cmd as a list rejects the command candidate; the node still
        // resolves against later candidates instead of failing the load.
        let action = resolve("cmd: [not, a, string]\nservice: nginx\n");
        assert_eq!(action.kind(), "services");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let yaml = "template: /etc/app.conf\nremoteLocation: /srv/app.conf.tpl\n";
        let first = resolve(yaml).kind();
        for _ in 0..10 {
            assert_eq!(resolve(yaml).kind(), first);
        }
    }

    #[test]
    fn test_step_extracts_name() {
        let step: Step = serde_yaml::from_str("name: install nginx\npackageList: [nginx]\n").unwrap();
        assert_eq!(step.name, "install nginx");
        assert_eq!(step.action.kind(), "packages");
    }

    #[test]
    fn test_step_without_name() {
        let step: Step = serde_yaml::from_str("cmd: uptime\n").unwrap();
        assert_eq!(step.name, "");
        assert_eq!(step.action.kind(), "command");
    }
}
