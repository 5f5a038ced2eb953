//! Subprocess execution with configurable output routing
//!
//! The interpreter never talks to `std::process` directly; it goes through
//! [`execute`], which routes the child's stdout/stderr according to the sink
//! modes in the pipeline state and maps spawn/exit failures onto the status
//! taxonomy.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::error::StageError;
use crate::state::{PipelineState, SinkMode};

/// Run one external command with the state's environment, working directory
/// and sink configuration. Returns the stage status plus whatever text the
/// inline sinks captured (trailing newline stripped).
///
/// Sink files are opened for this invocation only and closed before return.
pub fn execute(
    command: &str,
    args: &[String],
    state: &PipelineState,
) -> (Result<(), StageError>, String) {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .env_clear()
        .envs(&state.env)
        .current_dir(&state.working_dir)
        .stdin(Stdio::null());

    match configure_stream(&mut cmd, &state.stdout, StreamKind::Stdout) {
        Ok(()) => {}
        Err(err) => return (Err(StageError::io(err)), String::new()),
    }
    match configure_stream(&mut cmd, &state.stderr, StreamKind::Stderr) {
        Ok(()) => {}
        Err(err) => return (Err(StageError::io(err)), String::new()),
    }

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => return (Err(spawn_error(command, args, &err)), String::new()),
    };
    let output = match child.wait_with_output() {
        Ok(output) => output,
        Err(err) => {
            let message = format!("{} {}: {}", command, args.join(" "), err);
            return (Err(StageError::CommandExecFailed(message)), String::new());
        }
    };

    let mut captured = String::new();
    if state.stdout == SinkMode::Inline {
        captured.push_str(&String::from_utf8_lossy(&output.stdout));
    }
    if state.stderr == SinkMode::Inline {
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    if let Some(stripped) = captured.strip_suffix('\n') {
        captured.truncate(stripped.len());
    }

    if output.status.success() {
        (Ok(()), captured)
    } else {
        let code = output.status.code().unwrap_or(-1);
        let message = format!(
            "Error executing command: {} {} returned {}",
            command,
            args.join(" "),
            code
        );
        route_failure_message(state, &mut captured, &message);
        (Err(StageError::Command(message)), captured)
    }
}

/// Run a probe tool quietly, capturing stdout. `None` when the tool is
/// missing, cannot run, or exits nonzero.
pub fn probe_output(command: &str, args: &[&str]) -> Option<String> {
    which::which(command).ok()?;
    let output = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

enum StreamKind {
    Stdout,
    Stderr,
}

fn configure_stream(cmd: &mut Command, sink: &SinkMode, kind: StreamKind) -> Result<()> {
    let stdio = match sink {
        SinkMode::Inline => Stdio::piped(),
        SinkMode::Console => Stdio::inherit(),
        SinkMode::Discard => Stdio::null(),
        SinkMode::File(path) => Stdio::from(open_sink_file(path)?),
    };
    match kind {
        StreamKind::Stdout => cmd.stdout(stdio),
        StreamKind::Stderr => cmd.stderr(stdio),
    };
    Ok(())
}

fn open_sink_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            crate::utils::paths::ensure_dir(parent)?;
        }
    }
    File::create(path).with_context(|| format!("Failed to open sink file: {}", path.display()))
}

fn spawn_error(command: &str, args: &[String], err: &std::io::Error) -> StageError {
    match err.kind() {
        ErrorKind::NotFound => {
            StageError::CommandNotFound(format!("{} {}", command, args.join(" ")))
        }
        _ => StageError::CommandOs(err.to_string()),
    }
}

/// The nonzero-exit diagnostic follows the stderr sink: printed, folded into
/// the captured text, appended to the sink file, or dropped.
fn route_failure_message(state: &PipelineState, captured: &mut String, message: &str) {
    match &state.stderr {
        SinkMode::Console => eprintln!("{message}"),
        SinkMode::Inline => {
            captured.push('\n');
            captured.push_str(message);
        }
        SinkMode::File(path) => {
            if let Ok(mut file) = OpenOptions::new().append(true).open(path) {
                let _ = writeln!(file, "{message}");
            }
        }
        SinkMode::Discard => {}
    }
}
