//! Path translation between native Windows, Cygwin and MSYS2 spellings
//!
//! All translation is pure over a [`HostFamily`] value so the Windows-only
//! rules can be exercised from any test host. The drive pattern accepts
//! multi-letter drives; `subst`-style assignments on old toolchains use them.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::utils::platform::HostFamily;

static WIN_PATH: OnceLock<Regex> = OnceLock::new();
static CYGWIN_PATH: OnceLock<Regex> = OnceLock::new();
static MSYS2_PATH: OnceLock<Regex> = OnceLock::new();

fn win_path() -> &'static Regex {
    WIN_PATH.get_or_init(|| Regex::new(r"^(?P<drive>[A-Za-z]+):[\\/](?P<path>.*)$").unwrap())
}

fn cygwin_path() -> &'static Regex {
    CYGWIN_PATH.get_or_init(|| Regex::new(r"^/cygdrive/(?P<drive>[A-Za-z]+)/(?P<path>.*)$").unwrap())
}

fn msys2_path() -> &'static Regex {
    MSYS2_PATH.get_or_init(|| Regex::new(r"^/(?P<drive>[A-Za-z]+)/(?P<path>.*)$").unwrap())
}

/// Rewrite one native line into the POSIX-like spelling of the given
/// environment: `/cygdrive/c/...` under Cygwin, `/c/...` under MSYS2.
///
/// Returns `None` for lines that are not drive paths; callers drop those
/// from the result set. Doubled slashes are collapsed and a single trailing
/// slash is stripped.
pub fn to_env_path(line: &str, family: HostFamily) -> Option<String> {
    let line = line.trim().replace('\\', "/");
    let caps = win_path().captures(&line)?;
    let drive = caps["drive"].to_lowercase();
    let rest = &caps["path"];
    let mapped = match family {
        HostFamily::Cygwin => format!("/cygdrive/{drive}/{rest}"),
        HostFamily::Msys2 => format!("/{drive}/{rest}"),
        // Native Windows keeps the forward-slashed drive path as is.
        _ => line.clone(),
    };
    let collapsed = mapped.replace("//", "/");
    Some(collapsed.strip_suffix('/').unwrap_or(&collapsed).to_string())
}

/// Rewrite one POSIX-like line back to a forward-slashed native drive path.
/// Lines that do not match the environment's drive spelling pass through
/// with only slash normalization applied.
pub fn to_platform_path(line: &str, family: HostFamily) -> String {
    let line = line.trim().replace('\\', "/");
    let pattern = match family {
        HostFamily::Cygwin => cygwin_path(),
        HostFamily::Msys2 => msys2_path(),
        _ => return line,
    };
    match pattern.captures(&line) {
        Some(caps) => {
            let drive = caps["drive"].to_lowercase();
            format!("{}:/{}", drive, &caps["path"])
        }
        None => line,
    }
}

/// PATH-style list separator: `;` where the shell is cmd-flavored, `:`
/// everywhere a POSIX shell runs (including Cygwin on Windows).
pub fn shell_list_separator(family: HostFamily) -> &'static str {
    match family {
        HostFamily::WindowsNative | HostFamily::Msys2 => ";",
        HostFamily::Cygwin | HostFamily::Posix => ":",
    }
}

/// Ensure a directory exists.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}
