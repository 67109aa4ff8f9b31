//! # Manifest
//!
//! Typed model of a provisioning manifest: an ordered list of named steps,
//! each carrying exactly one operator variant.
//!
//! The manifest format is a YAML document with a `steps` list. Step nodes
//! are flat mappings with no type tag; which operator a step denotes is
//! resolved structurally at load time (see [`Action::resolve`]). Once
//! loaded a manifest is immutable; step order equals execution order.
//!
//! ## Example
//!
//! ```
//! let doc = r#"
//! steps:
//!   - name: install web server
//!     packageList: [nginx]
//!   - name: start it
//!     service: nginx
//!     state: started
//! "#;
//!
//! let manifest = manifest::Manifest::parse(doc.as_bytes()).unwrap();
//! assert_eq!(manifest.steps.len(), 2);
//! assert_eq!(manifest.steps[1].action.kind(), "services");
//! ```

mod error;
mod ops;
mod os_filter;
mod step;

pub use error::{Error, Result};
pub use ops::{
    Api, Command, Copy, Cron, Git, Github, Loop, PackageRepo, Packages, RecursiveCopy, RemoteExec,
    Services, Signal, Tarball, Template, TemplateVar,
};
pub use os_filter::{OsFilter, wash};
pub use step::{Action, Step};

use serde::Deserialize;

/// An ordered sequence of steps. Immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub steps: Vec<Step>,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// Operator resolution happens here, once; malformed step nodes become
    /// [`Action::Null`] rather than load errors and only fail when reached
    /// during execution.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let manifest: Self = serde_yaml::from_slice(data)?;
        if manifest.steps.is_empty() {
            return Err(Error::Empty);
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_step_order() {
        let doc = b"steps:\n  - name: one\n    cmd: echo 1\n  - name: two\n    cmd: echo 2\n  - name: three\n    cmd: echo 3\n";
        let manifest = Manifest::parse(doc).unwrap();
        let names: Vec<&str> = manifest.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_parse_rejects_empty_manifest() {
        assert!(matches!(Manifest::parse(b"steps: []\n"), Err(Error::Empty)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Manifest::parse(b"steps: 12\n").is_err());
    }

    #[test]
    fn test_malformed_step_becomes_null_not_error() {
        let doc = b"steps:\n  - name: fine\n    cmd: /bin/true\n  - name: bogus\n    nothing: here\n";
        let manifest = Manifest::parse(doc).unwrap();
        assert!(!manifest.steps[0].action.is_null());
        assert!(manifest.steps[1].action.is_null());
    }
}
