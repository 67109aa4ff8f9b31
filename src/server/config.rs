//! Control-plane configuration
//!
//! Read once at startup and immutable afterwards: an identity/key pair
//! for the controller connection, the controller endpoint, and the list
//! of execution targets. Target kinds other than `cadence` and `event`
//! are skipped with a log line rather than failing the whole config.

use anyhow::{Context as _, Result};
use serde::Deserialize;

/// Top-level server configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Identity presented to the controller.
    pub id: String,
    /// Authorization key presented to the controller.
    pub key: String,
    /// Controller endpoint (`host:port`).
    pub endpoint: String,
    #[serde(rename = "execution")]
    pub executions: Vec<ExecutionTarget>,
}

/// One named binding from trigger to manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionTarget {
    pub name: String,
    /// Identifier remote `execute` commands refer to.
    pub action: String,
    /// `cadence` or `event`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Interval in minutes, for cadence targets.
    pub cadence: u64,
    /// Manifest reference, resolved through the loader.
    pub target: String,
    /// Per-target credential, carried for controllers that require one.
    pub authorization: String,
}

impl ExecutionTarget {
    pub fn is_cadence(&self) -> bool {
        self.kind == "cadence"
    }

    pub fn is_event(&self) -> bool {
        self.kind == "event"
    }
}

impl ServerConfig {
    /// Read and parse the server configuration file.
    pub fn load(path: &str) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("cannot read server config: {path}"))?;
        Self::parse(&data).with_context(|| format!("cannot parse server config: {path}"))
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let config: Self = serde_yaml::from_slice(data)?;
        Ok(config)
    }

    /// Find the event target a remote `execute` command names.
    pub fn event_target(&self, action: &str) -> Option<&ExecutionTarget> {
        self.executions
            .iter()
            .find(|e| e.is_event() && e.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
id: node-7
key: s3cret
endpoint: controller.internal:9444
execution:
  - name: nightly
    type: cadence
    cadence: 30
    target: /etc/gaffer/nightly.yml
  - name: deploy handler
    action: deploy
    type: event
    target: https://config.internal/deploy.yml
    authorization: t0ken
";

    #[test]
    fn test_parse_full_config() {
        let config = ServerConfig::parse(DOC.as_bytes()).unwrap();
        assert_eq!(config.id, "node-7");
        assert_eq!(config.endpoint, "controller.internal:9444");
        assert_eq!(config.executions.len(), 2);
        assert!(config.executions[0].is_cadence());
        assert_eq!(config.executions[0].cadence, 30);
        assert!(config.executions[1].is_event());
        assert_eq!(config.executions[1].authorization, "t0ken");
    }

    #[test]
    fn test_event_target_lookup() {
        let config = ServerConfig::parse(DOC.as_bytes()).unwrap();
        assert!(config.event_target("deploy").is_some());
        assert!(config.event_target("nightly").is_none());
        assert!(config.event_target("unknown").is_none());
    }

    #[test]
    fn test_unknown_kind_survives_parsing() {
        let doc = "execution:\n  - name: odd\n    type: webhook\n    target: /x.yml\n";
        let config = ServerConfig::parse(doc.as_bytes()).unwrap();
        assert!(!config.executions[0].is_cadence());
        assert!(!config.executions[0].is_event());
    }
}
