//! Path translation stages: `--env-path`, `--platform-path`, `--shell-list`
//!
//! The rules live in `utils::paths`; these handlers only detect the host
//! family and map the buffer. On POSIX hosts both translations are no-ops
//! and the buffer passes through byte for byte.

use crate::cli::Param;
use crate::error::StageResult;
use crate::state::PipelineState;
use crate::utils::paths;
use crate::utils::platform::HostFamily;

/// `--env-path`: native drive paths to the POSIX-like spelling of the
/// detected environment. Non-drive lines are dropped.
pub fn env_path(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    translate_env_path(state, HostFamily::detect());
    Ok(())
}

/// `--platform-path`: POSIX-like spellings back to forward-slashed native
/// drive paths.
pub fn platform_path(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    translate_platform_path(state, HostFamily::detect());
    Ok(())
}

/// `--shell-list`: join the lines with the PATH separator of the detected
/// shell flavor.
pub fn shell_list(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let separator = paths::shell_list_separator(HostFamily::detect());
    let joined = state.lines().join(separator);
    state.buffer = joined;
    Ok(())
}

fn translate_env_path(state: &mut PipelineState, family: HostFamily) {
    if !family.is_windows() {
        return;
    }
    let mapped: Vec<String> = state
        .lines()
        .into_iter()
        .filter_map(|line| paths::to_env_path(line, family))
        .collect();
    state.buffer = mapped.join("\n");
}

fn translate_platform_path(state: &mut PipelineState, family: HostFamily) {
    if !family.is_windows() {
        return;
    }
    let mapped: Vec<String> = state
        .lines()
        .into_iter()
        .map(|line| paths::to_platform_path(line, family))
        .collect();
    state.buffer = mapped.join("\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(buffer: &str) -> PipelineState {
        let mut state = PipelineState::new();
        state.buffer = buffer.to_string();
        state
    }

    #[test]
    fn env_path_under_cygwin_rewrites_and_drops() {
        let mut state = state_with("C:\\Users\\x\nnot-a-drive-path");
        translate_env_path(&mut state, HostFamily::Cygwin);
        assert_eq!(state.buffer, "/cygdrive/c/Users/x");
    }

    #[test]
    fn env_then_platform_path_round_trips_under_cygwin() {
        let mut state = state_with("C:\\Users\\x");
        translate_env_path(&mut state, HostFamily::Cygwin);
        assert_eq!(state.buffer, "/cygdrive/c/Users/x");
        translate_platform_path(&mut state, HostFamily::Cygwin);
        assert_eq!(state.buffer, "c:/Users/x");
    }

    #[test]
    fn env_path_under_msys2_uses_short_mounts() {
        let mut state = state_with("C:\\x");
        translate_env_path(&mut state, HostFamily::Msys2);
        assert_eq!(state.buffer, "/c/x");
    }

    #[test]
    fn translations_pass_through_on_posix() {
        let original = "C:\\kept\\verbatim\nanything";
        let mut state = state_with(original);
        translate_env_path(&mut state, HostFamily::Posix);
        assert_eq!(state.buffer, original);
        translate_platform_path(&mut state, HostFamily::Posix);
        assert_eq!(state.buffer, original);
    }
}
