//! Local command execution
//!
//! Two flavors: [`probe`] runs a command directly from its whitespace-split
//! argv (used by `onlyIf`/`notIf` checks and state queries), while
//! [`run_script`] stages the command line into a temporary shell script so
//! manifests can use pipes, redirects and multi-statement commands.
//! Both capture combined stdout/stderr, trimmed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context as _, Result, anyhow};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct Exec {
    output: String,
    success: bool,
}

impl Exec {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            output: message.into(),
            success: false,
        }
    }

    /// Combined stdout and stderr, trimmed.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn failed(&self) -> bool {
        !self.success
    }

    /// The captured output as an error value.
    pub fn into_error(self) -> anyhow::Error {
        if self.output.is_empty() {
            anyhow!("command failed")
        } else {
            anyhow!("{}", self.output)
        }
    }
}

/// Run a command from its whitespace-split argv.
pub fn probe(command: &str) -> Exec {
    let mut fields = command.split_whitespace();
    let Some(program) = fields.next() else {
        return Exec::failure("empty command");
    };
    collect(Command::new(program).args(fields))
}

/// Run a command line via a staged temporary shell script.
///
/// `working_dir` is honored when non-empty. The script is removed when the
/// returned value drops.
pub fn run_script(command: &str, working_dir: &str) -> Exec {
    let script = match stage_script(command) {
        Ok(path) => path,
        Err(err) => return Exec::failure(format!("could not stage command script: {err}")),
    };
    log::debug!("executing staged script: {}", script.display());
    let mut cmd = Command::new(&*script);
    if !working_dir.is_empty() {
        cmd.current_dir(working_dir);
    }
    collect(&mut cmd)
}

fn collect(cmd: &mut Command) -> Exec {
    match cmd.output() {
        Ok(out) => {
            let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&out.stderr));
            Exec {
                output: text.trim().to_string(),
                success: out.status.success(),
            }
        }
        Err(err) => Exec::failure(err.to_string()),
    }
}

fn stage_script(command: &str) -> Result<tempfile::TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("gaffer-")
        .suffix(".sh")
        .tempfile()
        .context("could not create command script")?;
    file.write_all(format!("#!/bin/sh\n{command}\n").as_bytes())
        .context("could not write command script")?;
    let path = file.into_temp_path();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .context("could not mark command script executable")?;
    }
    Ok(path)
}

/// Publish a value into the process environment for later steps.
pub fn set_process_env(name: &str, value: &str) {
    log::debug!("setting env var: {name}={value}");
    // SAFETY: steps within a manifest run sequentially; concurrent readers
    // only see a fully written value.
    unsafe { std::env::set_var(name, value) };
}

/// Locate an executable by name on PATH.
pub fn has_exec_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Copy a file, optionally creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path, makedirs: bool) -> Result<u64> {
    if makedirs {
        make_parent_dirs(dst)?;
    }
    std::fs::copy(src, dst)
        .with_context(|| format!("could not copy {} to {}", src.display(), dst.display()))
}

/// Create the parent directories of a path.
pub fn make_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create directories for {}", path.display()))?;
        }
    }
    Ok(())
}

/// Content checksum of a file, hex-encoded.
pub fn checksum(path: &Path) -> Result<String> {
    let data = std::fs::read(path)
        .with_context(|| format!("could not read {} for checksum", path.display()))?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_captures_output() {
        let pc = probe("echo hello");
        assert!(!pc.failed());
        assert_eq!(pc.output(), "hello");
    }

    #[test]
    fn test_probe_reports_failure() {
        let pc = probe("false");
        assert!(pc.failed());
    }

    #[test]
    fn test_probe_empty_command_fails() {
        assert!(probe("").failed());
    }

    #[test]
    fn test_probe_missing_binary_fails() {
        assert!(probe("gaffer-no-such-binary-xyz").failed());
    }

    #[test]
    fn test_run_script_supports_shell_syntax() {
        let pc = run_script("echo one && echo two | tr a-z A-Z", "");
        assert!(!pc.failed());
        assert_eq!(pc.output(), "one\nTWO");
    }

    #[test]
    fn test_run_script_honors_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pc = run_script("pwd", dir.path().to_str().unwrap());
        assert!(!pc.failed());
        assert!(pc.output().contains(dir.path().file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_has_exec_in_path_finds_sh() {
        assert!(has_exec_in_path("sh").is_some());
        assert!(has_exec_in_path("gaffer-no-such-binary-xyz").is_none());
    }

    #[test]
    fn test_copy_file_with_makedirs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, b"data").unwrap();
        let dst = dir.path().join("nested/deep/dst.txt");
        copy_file(&src, &dst, true).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"data");
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"one").unwrap();
        let first = checksum(&file).unwrap();
        std::fs::write(&file, b"two").unwrap();
        assert_ne!(first, checksum(&file).unwrap());
    }
}
