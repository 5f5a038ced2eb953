//! Subprocess stages: `--exec` and `--foreach`

use crate::cli::Param;
use crate::error::{StageError, StageResult};
use crate::exec::subprocess::execute;
use crate::state::PipelineState;

/// `--exec CMD ARGS... ;`: run one command, appending whatever the sinks
/// captured. With stop-on-error off the stage reports success no matter how
/// the command fared; the captured text is kept either way.
pub fn run_exec(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let (command, rest) = split_command(args)?;
    let (result, output) = execute(&command, &rest, state);
    state.append_text(&output);
    if state.stop_on_error {
        result
    } else {
        Ok(())
    }
}

/// `--foreach CMD ARGS... ;`: run the command once per buffer line with the
/// line appended as the final argument, then replace the buffer with the
/// joined outputs. The first failing run aborts with the buffer untouched.
pub fn run_foreach(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let (command, rest) = split_command(args)?;
    let lines: Vec<String> = state.buffer.split('\n').map(str::to_string).collect();
    let mut outputs = Vec::with_capacity(lines.len());
    for line in lines {
        let mut call_args = rest.clone();
        call_args.push(line);
        let (result, output) = execute(&command, &call_args, state);
        result?;
        outputs.push(output);
    }
    state.buffer = outputs.join("\n");
    Ok(())
}

fn split_command(args: &[Param]) -> Result<(String, Vec<String>), StageError> {
    let mut tokens = Vec::with_capacity(args.len());
    for arg in args {
        tokens.push(arg.text()?.to_string());
    }
    let mut iter = tokens.into_iter();
    let command = iter.next().ok_or_else(|| {
        StageError::MissingParameter("No command given before the terminator".to_string())
    })?;
    Ok((command, iter.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SinkMode;

    fn params(tokens: &[&str]) -> Vec<Param> {
        tokens.iter().map(|t| Param::Text(t.to_string())).collect()
    }

    #[test]
    fn empty_command_list_is_missing_parameter() {
        let mut state = PipelineState::new();
        let err = run_exec(&mut state, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }

    #[cfg(unix)]
    #[test]
    fn exec_appends_captured_output() {
        let mut state = PipelineState::new();
        state.buffer = "first".to_string();
        run_exec(&mut state, &params(&["echo", "second"])).unwrap();
        assert_eq!(state.buffer, "first\nsecond");
    }

    #[cfg(unix)]
    #[test]
    fn exec_failure_is_masked_when_stop_on_error_is_off() {
        let mut state = PipelineState::new();
        state.stderr = SinkMode::Discard;
        state.stop_on_error = false;
        run_exec(&mut state, &params(&["false"])).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn exec_failure_propagates_under_stop_on_error() {
        let mut state = PipelineState::new();
        state.stderr = SinkMode::Discard;
        let err = run_exec(&mut state, &params(&["false"])).unwrap_err();
        assert_eq!(err.exit_code(), 9);
    }

    #[cfg(unix)]
    #[test]
    fn foreach_appends_each_line_as_final_argument() {
        let mut state = PipelineState::new();
        state.buffer = "a\nb".to_string();
        run_foreach(&mut state, &params(&["echo", "-"])).unwrap();
        assert_eq!(state.buffer, "- a\n- b");
    }

    #[cfg(unix)]
    #[test]
    fn foreach_aborts_on_first_failure_and_keeps_buffer() {
        let mut state = PipelineState::new();
        state.stderr = SinkMode::Discard;
        state.buffer = "a\nb".to_string();
        let err = run_foreach(&mut state, &params(&["false"])).unwrap_err();
        assert_eq!(err.exit_code(), 9);
        assert_eq!(state.buffer, "a\nb");
    }
}
