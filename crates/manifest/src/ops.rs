//! Operator configuration payloads
//!
//! One struct per operator variant, mirroring the manifest's YAML keys.
//! Every field is defaulted so a lenient decode succeeds on any mapping;
//! it is the signature field check in [`crate::Action::resolve`] that
//! decides whether a decode actually denotes that variant.

use serde::Deserialize;

use crate::os_filter::OsFilter;

/// Schedule a recurring job under `/etc/cron.d`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cron {
    /// Job name, used as the cron.d file name after sanitizing.
    #[serde(rename = "cron")]
    pub name: String,
    /// Five-field cron schedule expression.
    pub schedule: String,
    /// User the job runs as; defaults to the current user.
    #[serde(rename = "username")]
    pub user: String,
    /// Command line the job executes.
    pub cmd: String,
    pub only_if: String,
    pub not_if: String,
}

/// Run a shell command on the local host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Command {
    pub cmd: String,
    /// Working directory for the command.
    #[serde(rename = "dir")]
    pub working_dir: String,
    pub os_limits: OsFilter,
    /// Environment variable to set to the command's output.
    pub set_env: String,
    pub only_if: String,
    pub not_if: String,
}

/// Fetch and extract a (optionally gzipped) tar archive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tarball {
    pub name: String,
    #[serde(rename = "tarball")]
    pub src: String,
    pub dest: String,
    /// Extract even if the destination already exists.
    pub force: bool,
    /// Drop the archive's leading directory component.
    #[serde(rename = "stripRoot")]
    pub strip: bool,
    pub only_if: String,
    pub not_if: String,
}

/// Copy a single file from any loader-readable location.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Copy {
    #[serde(rename = "copy")]
    pub src: String,
    pub dest: String,
    /// Destination file mode; octal in the manifest (`0o644`).
    pub perm: Option<u32>,
}

/// Copy a directory tree, with ignore patterns and depth limits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecursiveCopy {
    #[serde(rename = "copyRecursive")]
    pub src: String,
    pub dest: String,
    #[serde(rename = "ignoreFiles")]
    pub ignores: Vec<String>,
    /// Flatten the tree into the destination directory.
    pub flat_copy: bool,
    /// 0 means unlimited.
    pub max_depth: usize,
    pub only_if: String,
    pub not_if: String,
}

/// One substitution variable for a [`Template`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateVar {
    /// `value` (literal, with package-manager selection) or `command`
    /// (output of a probe command).
    #[serde(rename = "type")]
    pub kind: String,
    pub input: String,
    /// Placeholder name the rendered value is bound to.
    pub variable: String,
}

/// Render a template file to a destination path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Template {
    /// Destination path of the rendered file.
    #[serde(rename = "template")]
    pub dest: String,
    /// Where the template source is fetched from.
    #[serde(rename = "remoteLocation")]
    pub src: String,
    /// Destination file mode; octal in the manifest.
    pub perms: Option<u32>,
    pub owner: String,
    pub group: String,
    pub vars: Vec<TemplateVar>,
}

/// Register an OS package repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageRepo {
    #[serde(rename = "repoName")]
    pub name: String,
    #[serde(rename = "repoLocation")]
    pub location: String,
    /// Package manager family the repo definition targets (apt/dnf/yum).
    #[serde(rename = "repoType")]
    pub kind: String,
    /// Signing key location, fetched and installed when set.
    #[serde(rename = "repoKey")]
    pub key: String,
    pub os_limits: OsFilter,
}

/// Install or remove OS packages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Packages {
    pub package_list: Vec<String>,
    /// `install` (default) or `remove`.
    pub action: String,
    pub os_limits: OsFilter,
    pub only_if: String,
    pub not_if: String,
}

/// Converge a systemd service to a desired state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Services {
    pub service: String,
    #[serde(rename = "setEnabled")]
    pub enabled: bool,
    /// Desired state: `started` or `stopped`.
    pub state: String,
    /// Restart when one of these rendered files changed this run.
    #[serde(rename = "restartTrigger")]
    pub restart_on_update: Vec<String>,
    pub restart_always: bool,
    pub os_limits: OsFilter,
}

/// Call a remote HTTP API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Api {
    #[serde(rename = "api")]
    pub endpoint: String,
    /// File the response body is written to, when set.
    pub output_file: String,
    pub method: String,
    /// Request body: inline text or a loader-readable location.
    pub body: String,
    /// `Name: value` header lines.
    pub headers: Vec<String>,
    /// Environment variable set to the raw response body.
    #[serde(rename = "setBodyEnv")]
    pub body_env: String,
    /// Environment variable set to the value at `jsonKey`.
    pub set_env: String,
    /// Dotted path into the JSON response.
    pub json_key: String,
    pub only_if: String,
    pub not_if: String,
}

/// Clone a git repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Git {
    #[serde(rename = "gitRepo")]
    pub repo: String,
    #[serde(rename = "dest")]
    pub location: String,
    pub os_limits: OsFilter,
    pub only_if: String,
    pub not_if: String,
}

/// Download (and optionally extract) a GitHub release asset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Github {
    #[serde(rename = "githubRepo")]
    pub repo: String,
    /// Release tag; `latest` or empty picks the newest release.
    #[serde(rename = "releaseVer")]
    pub version: String,
    /// Content-type family of the wanted asset (e.g. `gzip`).
    #[serde(rename = "assetType")]
    pub asset: String,
    /// Substring the asset name must contain.
    #[serde(rename = "strContains")]
    pub asset_match: String,
    #[serde(rename = "localDir")]
    pub storage: String,
    pub do_extract: bool,
    pub strip_root: bool,
}

/// Run a command on a remote host over ssh.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteExec {
    #[serde(rename = "remoteCmd")]
    pub cmd: String,
    /// `host`, `user@host`, or `user@host:port`.
    pub host: String,
    /// Private key path; empty uses the ssh default.
    pub key: String,
    pub set_env: String,
    pub only_if: String,
    pub not_if: String,
}

/// Re-run this executable against another manifest a fixed number of times.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Loop {
    pub loop_script: String,
    pub count: u32,
    /// Environment variable carrying the iteration index.
    #[serde(rename = "var")]
    pub variable: String,
    pub os_limits: OsFilter,
    pub only_if: String,
    pub not_if: String,
}

/// Deliver a signal to the process named in a pidfile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Signal {
    pub pid_file: String,
    /// `SIGINT` or `SIGHUP`; anything else falls back to `SIGHUP`.
    pub signal: String,
    pub only_if: String,
    pub not_if: String,
}
