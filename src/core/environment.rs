//! core::environment
//!
//! Process environment and platform facts, captured once at start-up.
//!
//! # Design
//!
//! Nothing below the CLI layer reads `std::env` directly. The CLI snapshots
//! the environment into an [`Environment`] and derives a [`Platform`] from
//! it; both are passed down by reference so tests can describe any
//! platform/session combination without touching process state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Operating system family the helper is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Windows,
    MacOs,
    Linux,
    /// Other POSIX systems (BSDs, etc.).
    OtherUnix,
}

impl OsKind {
    /// The OS this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsKind::Windows
        } else if cfg!(target_os = "macos") {
            OsKind::MacOs
        } else if cfg!(target_os = "linux") {
            OsKind::Linux
        } else {
            OsKind::OtherUnix
        }
    }

    pub fn is_posix(&self) -> bool {
        !matches!(self, OsKind::Windows)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OsKind::Windows => "Windows",
            OsKind::MacOs => "macOS",
            OsKind::Linux => "Linux",
            OsKind::OtherUnix => "POSIX",
        }
    }
}

/// Snapshot of environment variables plus executable lookup.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            variables: std::env::vars().collect(),
        }
    }

    /// Build an environment from explicit variables.
    pub fn from_vars<'a, I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            variables: vars
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Look up a variable. Empty values count as unset.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.variables
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Search `PATH` for an executable.
    pub fn locate_executable(&self, name: &str) -> Option<PathBuf> {
        let path = self.var("PATH")?;
        let candidates: Vec<String> = if cfg!(windows) && Path::new(name).extension().is_none() {
            vec![format!("{}.exe", name), name.to_string()]
        } else {
            vec![name.to_string()]
        };

        std::env::split_paths(path)
            .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Facts about the platform and session that gate credential backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsKind,
    /// Whether a graphical desktop session is available.
    pub desktop_session: bool,
    /// Whether the OS credential manager can persist credentials in this
    /// logon session. Only meaningful on Windows.
    pub can_persist_credentials: bool,
}

impl Platform {
    /// Detect the platform for the running process.
    pub fn detect(env: &Environment) -> Self {
        let os = OsKind::current();
        Self {
            os,
            desktop_session: detect_desktop_session(os, env),
            can_persist_credentials: crate::store::windows::can_persist_credentials(),
        }
    }

    /// A fixed platform description, for tests and diagnostics.
    pub fn new(os: OsKind, desktop_session: bool) -> Self {
        Self {
            os,
            desktop_session,
            can_persist_credentials: os == OsKind::Windows,
        }
    }
}

fn detect_desktop_session(os: OsKind, env: &Environment) -> bool {
    match os {
        // SSH logons have no window station to prompt on
        OsKind::Windows => env.var("SSH_CONNECTION").is_none(),
        OsKind::MacOs => env.var("SSH_CONNECTION").is_none(),
        OsKind::Linux | OsKind::OtherUnix => {
            env.var("DISPLAY").is_some() || env.var("WAYLAND_DISPLAY").is_some()
        }
    }
}

/// Parse a boolean-ish setting value, returning `None` when unrecognised.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
