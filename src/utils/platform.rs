//! Host environment detection
//!
//! Cygwin and MSYS2 sit on top of native Windows and change how drive paths
//! are spelled. Detection is separated from the translation rules in
//! `utils::paths` so the rules stay pure and testable on any host.

use std::env;
use std::path::Path;

/// The flavor of the host, as seen by path translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFamily {
    WindowsNative,
    Cygwin,
    Msys2,
    Posix,
}

impl HostFamily {
    /// Detect the current host. Cygwin wins over MSYS2 when both leave
    /// traces on disk; neither applies off Windows.
    pub fn detect() -> Self {
        if !cfg!(windows) {
            return HostFamily::Posix;
        }
        if is_cygwin() {
            HostFamily::Cygwin
        } else if is_msys2() {
            HostFamily::Msys2
        } else {
            HostFamily::WindowsNative
        }
    }

    pub fn is_windows(self) -> bool {
        self != HostFamily::Posix
    }
}

/// A `/cygdrive` mount is the one reliable Cygwin marker.
pub fn is_cygwin() -> bool {
    Path::new("/cygdrive").is_dir()
}

/// MSYS2 advertises itself via `MSYSTEM`, its mingw mount points, or the
/// legacy `MSYS=true` switch.
pub fn is_msys2() -> bool {
    env::var_os("MSYSTEM").is_some()
        || Path::new("/mingw64").exists()
        || Path::new("/mingw32").exists()
        || env::var("MSYS")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

/// Human-readable platform name reported by `--platform`.
pub fn platform_name() -> &'static str {
    if cfg!(windows) {
        "Windows"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else if cfg!(target_os = "macos") {
        "MacOS"
    } else {
        "Unknown"
    }
}

/// Filename suffix of executables on this platform.
pub fn executable_suffix() -> &'static str {
    if cfg!(windows) {
        ".exe"
    } else {
        ""
    }
}
