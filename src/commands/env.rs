//! Session configuration stages: environment overlay, sink selection and
//! the failure policy

use std::path::PathBuf;

use crate::cli::Param;
use crate::error::{StageError, StageResult};
use crate::state::{PipelineState, SinkMode};

/// `--env KEY=VALUE`: overlay one variable for every later spawned process.
pub fn set_env(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let pair = args[0].text()?;
    match pair.split_once('=') {
        Some((key, value)) => {
            state.env.insert(key.to_string(), value.to_string());
            Ok(())
        }
        None => Err(StageError::InvalidEnvValue(pair.to_string())),
    }
}

/// `--stdout MODE|PATH`
pub fn set_stdout(state: &mut PipelineState, args: &[Param]) -> StageResult {
    state.stdout = parse_sink(args[0].text()?);
    Ok(())
}

/// `--stderr MODE|PATH`
pub fn set_stderr(state: &mut PipelineState, args: &[Param]) -> StageResult {
    state.stderr = parse_sink(args[0].text()?);
    Ok(())
}

/// `--stoponerror true|false`
pub fn set_stop_on_error(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let mode = args[0].text()?.trim().to_lowercase();
    match mode.as_str() {
        "true" => state.stop_on_error = true,
        "false" => state.stop_on_error = false,
        other => {
            return Err(StageError::InvalidOutputMode(format!(
                "Invalid exit mode: {other}"
            )))
        }
    }
    Ok(())
}

/// Anything that is not a recognized mode name is a write-target path.
fn parse_sink(token: &str) -> SinkMode {
    match token {
        "process" => SinkMode::Inline,
        "print" => SinkMode::Console,
        "ignore" => SinkMode::Discard,
        path => SinkMode::File(PathBuf::from(path)),
    }
}
