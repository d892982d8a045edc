//! Virtual-environment activation.
//!
//! A venv's `activate` script only makes sense inside a shell, so it is
//! sourced in a child shell and the resulting environment is captured and
//! handed to every tool. Activation is best-effort: a missing script is
//! normal, and a script that cannot be sourced falls back to the standard
//! venv layout (`VIRTUAL_ENV`, `<venv>/bin` first on `PATH`).

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Sources `$1` quietly, then dumps the environment NUL-separated.
const SOURCE_SCRIPT: &str = r#". "$1" 1>&2 && exec env -0"#;

/// A complete process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Snapshots the current process environment.
    #[must_use]
    pub fn inherited() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Parses `env -0` output.
    ///
    /// Entries without `=` are skipped. Returns `None` when nothing parses.
    #[must_use]
    pub fn from_nul_separated(bytes: &[u8]) -> Option<Self> {
        let vars: BTreeMap<_, _> = bytes
            .split(|b| *b == 0)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let eq = entry.iter().position(|b| *b == b'=')?;
                if eq == 0 {
                    return None;
                }
                Some((bytes_to_os(&entry[..eq]), bytes_to_os(&entry[eq + 1..])))
            })
            .collect();

        if vars.is_empty() {
            None
        } else {
            Some(Self { vars })
        }
    }

    /// Emulates `activate` for a venv rooted at `venv`.
    #[must_use]
    pub fn for_venv_layout(mut base: Self, venv: &Path) -> Self {
        let bin = venv.join(if cfg!(windows) { "Scripts" } else { "bin" });

        let mut paths = vec![bin];
        if let Some(existing) = base.get("PATH") {
            paths.extend(std::env::split_paths(existing));
        }
        if let Ok(joined) = std::env::join_paths(paths) {
            base.set("PATH", joined);
        }

        base.set("VIRTUAL_ENV", venv.as_os_str());
        base.remove("PYTHONHOME");
        base
    }

    /// Returns a variable's value.
    #[must_use]
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Sets a variable.
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Removes a variable.
    pub fn remove(&mut self, key: impl AsRef<OsStr>) {
        self.vars.remove(key.as_ref());
    }

    /// Iterates over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.vars.iter()
    }
}

#[cfg(unix)]
fn bytes_to_os(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
fn bytes_to_os(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Activates the virtual environment at `root/relative`, if present.
///
/// Returns `None` when there is no activation script; tools then inherit
/// this process's environment unchanged.
pub async fn activate(root: &Path, relative: &str, shell: &str) -> Option<Environment> {
    let script = root.join(relative);
    if !script.is_file() {
        tracing::debug!(path = %script.display(), "No activation script, using current environment");
        return None;
    }

    match source(&script, shell, root).await {
        Ok(env) => {
            tracing::debug!(path = %script.display(), vars = env.iter().count(), "Sourced activation script");
            Some(env)
        },
        Err(reason) => {
            let venv = venv_root(&script);
            tracing::warn!(
                path = %script.display(),
                venv = %venv.display(),
                %reason,
                "Could not source activation script, falling back to venv layout"
            );
            Some(Environment::for_venv_layout(Environment::inherited(), &venv))
        },
    }
}

/// Sources `script` in `shell` and captures the resulting environment.
async fn source(script: &Path, shell: &str, cwd: &Path) -> Result<Environment, String> {
    let output = Command::new(shell)
        .arg("-c")
        .arg(SOURCE_SCRIPT)
        .arg(shell)
        .arg(script)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to run {shell}: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{shell} exited with {}: {}", output.status, stderr.trim()));
    }

    Environment::from_nul_separated(&output.stdout)
        .ok_or_else(|| "activation produced no environment".to_string())
}

/// Returns the venv directory for an activation script (`<venv>/bin/activate`).
fn venv_root(script: &Path) -> PathBuf {
    script
        .parent()
        .and_then(Path::parent)
        .map_or_else(|| script.to_path_buf(), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_nul_separated() {
        let env = Environment::from_nul_separated(b"PATH=/venv/bin:/usr/bin\0EMPTY=\0MULTI=a\nb=c\0")
            .expect("should parse");
        assert_eq!(env.iter().count(), 3);
        assert_eq!(env.get("PATH"), Some(OsStr::new("/venv/bin:/usr/bin")));
        assert_eq!(env.get("EMPTY"), Some(OsStr::new("")));
        assert_eq!(env.get("MULTI"), Some(OsStr::new("a\nb=c")));
    }

    #[test]
    fn test_from_nul_separated_skips_garbage() {
        assert!(Environment::from_nul_separated(b"").is_none());
        assert!(Environment::from_nul_separated(b"no-equals\0=nokey\0").is_none());
    }

    #[test]
    fn test_for_venv_layout() {
        let mut base = Environment::default();
        base.set("PATH", "/usr/bin");
        base.set("PYTHONHOME", "/opt/python");

        let env = Environment::for_venv_layout(base, Path::new("/work/venv"));

        assert_eq!(env.get("VIRTUAL_ENV"), Some(OsStr::new("/work/venv")));
        assert!(env.get("PYTHONHOME").is_none());
        let path = env.get("PATH").expect("PATH set");
        let first = std::env::split_paths(path).next().expect("non-empty PATH");
        assert!(first.starts_with("/work/venv"));
    }

    #[test]
    fn test_venv_root() {
        assert_eq!(
            venv_root(Path::new("/work/venv/bin/activate")),
            PathBuf::from("/work/venv")
        );
    }

    #[tokio::test]
    async fn test_activate_missing_script() {
        let temp = TempDir::new().expect("create temp dir");
        assert!(activate(temp.path(), "venv/bin/activate", "sh").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_activate_sources_script() {
        let temp = TempDir::new().expect("create temp dir");
        let bin = temp.path().join("venv/bin");
        std::fs::create_dir_all(&bin).expect("create venv");
        std::fs::write(
            bin.join("activate"),
            "echo activating\nexport VIRTUAL_ENV=/somewhere/venv\nexport LINT_PIPELINE_ACTIVATED=yes\n",
        )
        .expect("write activate");

        let env = activate(temp.path(), "venv/bin/activate", "sh")
            .await
            .expect("should activate");
        assert_eq!(env.get("LINT_PIPELINE_ACTIVATED"), Some(OsStr::new("yes")));
        assert_eq!(env.get("VIRTUAL_ENV"), Some(OsStr::new("/somewhere/venv")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_activate_falls_back_on_failure() {
        let temp = TempDir::new().expect("create temp dir");
        let bin = temp.path().join("venv/bin");
        std::fs::create_dir_all(&bin).expect("create venv");
        std::fs::write(bin.join("activate"), "return 3\n").expect("write activate");

        let env = activate(temp.path(), "venv/bin/activate", "sh")
            .await
            .expect("fallback environment");
        let venv = env.get("VIRTUAL_ENV").expect("VIRTUAL_ENV set");
        assert!(Path::new(venv).ends_with("venv"));
    }

    #[tokio::test]
    async fn test_activate_falls_back_when_shell_missing() {
        let temp = TempDir::new().expect("create temp dir");
        let bin = temp.path().join("venv/bin");
        std::fs::create_dir_all(&bin).expect("create venv");
        std::fs::write(bin.join("activate"), "").expect("write activate");

        let env = activate(
            temp.path(),
            "venv/bin/activate",
            "definitely_not_a_real_shell_12345",
        )
        .await
        .expect("fallback environment");
        assert!(env.get("VIRTUAL_ENV").is_some());
    }
}
