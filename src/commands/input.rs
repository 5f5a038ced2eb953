//! Input stages: literal text, file contents and environment introspection

use std::fs;

use regex::Regex;

use crate::cli::Param;
use crate::commands::decode_escapes;
use crate::error::{StageError, StageResult};
use crate::exec::subprocess::probe_output;
use crate::state::PipelineState;
use crate::utils::platform;

/// `--in STR`: append literal input with `\n`, `\t`, `\r` decoding.
pub fn append_input(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let decoded = decode_escapes(args[0].text()?);
    state.append_text(&decoded);
    Ok(())
}

/// `--read PATH`: append a file's contents. Read failures are only fatal
/// while the stop-on-error policy is active.
pub fn read_file(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let path = args[0].text()?;
    match fs::read_to_string(path) {
        Ok(contents) => {
            state.append_text(&contents);
            Ok(())
        }
        Err(err) => {
            if state.stop_on_error {
                Err(StageError::Io(format!("Error reading file: {err}")))
            } else {
                Ok(())
            }
        }
    }
}

/// `--platform`: append the host platform name.
pub fn platform(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    state.append_text(platform::platform_name());
    Ok(())
}

/// `--platform-exec`: append the executable filename suffix.
pub fn platform_exec(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    state.append_text(platform::executable_suffix());
    Ok(())
}

/// `--platform-open`: append the platform open helper. Empty on every
/// platform; callers prepend their own helper when they need one.
pub fn platform_open(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    state.append_text("");
    Ok(())
}

/// `--cygwin`: append the installed Cygwin version, probed via `cygcheck`.
pub fn cygwin_version(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    if !platform::is_cygwin() {
        return Err(StageError::Not("Not in a Cygwin environment".to_string()));
    }
    let output = probe_output("cygcheck", &["-c", "cygwin"])
        .ok_or_else(|| StageError::Not("Cygwin version unavailable".to_string()))?;
    let pattern = Regex::new(r"^cygwin[ \t]+(?P<version>[0-9.-]+)[ \t]+").unwrap();
    append_probed_version(state, &output, &pattern)
        .ok_or_else(|| StageError::Not("Cygwin version unavailable".to_string()))
}

/// `--mingw`: append the installed MSYS2 version, probed via `mingw-get`.
pub fn mingw_version(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    if !platform::is_msys2() {
        return Err(StageError::Not("Not in a MSYS2 environment".to_string()));
    }
    let output = probe_output("mingw-get", &["--version"])
        .ok_or_else(|| StageError::Not("MSYS2 version unavailable".to_string()))?;
    let pattern = Regex::new(r"^mingw-get version[ \t]+(?P<version>[0-9a-z.-]+)[ \t]*").unwrap();
    append_probed_version(state, &output, &pattern)
        .ok_or_else(|| StageError::Not("MSYS2 version unavailable".to_string()))
}

/// `--timestamp`: append the current Unix timestamp in seconds.
pub fn timestamp(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    state.append_text(&chrono::Utc::now().timestamp().to_string());
    Ok(())
}

fn append_probed_version(
    state: &mut PipelineState,
    output: &str,
    pattern: &Regex,
) -> Option<()> {
    for line in output.lines() {
        if let Some(caps) = pattern.captures(line) {
            let version = caps["version"].to_string();
            state.append_text(&version);
            return Some(());
        }
    }
    None
}
