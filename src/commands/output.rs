//! Buffer sinks: file writers and stdout

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::cli::Param;
use crate::error::{StageError, StageResult};
use crate::state::PipelineState;
use crate::utils::paths::ensure_dir;

/// `--out PATH`: write the buffer (plus a trailing newline), truncating.
pub fn write_file(state: &mut PipelineState, args: &[Param]) -> StageResult {
    write_buffer(state, args[0].text()?, false)
}

/// `--append PATH`
pub fn append_file(state: &mut PipelineState, args: &[Param]) -> StageResult {
    write_buffer(state, args[0].text()?, true)
}

/// `--print`: print the buffer with a single leading newline stripped.
pub fn print_buffer(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let text = state.buffer.strip_prefix('\n').unwrap_or(&state.buffer);
    println!("{text}");
    Ok(())
}

fn write_buffer(state: &PipelineState, path: &str, append: bool) -> StageResult {
    let target = Path::new(path);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent).map_err(StageError::io)?;
        }
    }
    let written = if append {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(target)
            .and_then(|mut file| writeln!(file, "{}", state.buffer))
    } else {
        fs::write(target, format!("{}\n", state.buffer))
    };
    written.map_err(|err| StageError::Io(format!("Error writing to file: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_param(path: &Path) -> Vec<Param> {
        vec![Param::Text(path.to_string_lossy().into_owned())]
    }

    #[test]
    fn out_truncates_and_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("deep/nested/out.txt");
        let mut state = PipelineState::new();
        state.buffer = "content".to_string();
        write_file(&mut state, &path_param(&target)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "content\n");

        state.buffer = "replaced".to_string();
        write_file(&mut state, &path_param(&target)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "replaced\n");
    }

    #[test]
    fn append_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("log.txt");
        let mut state = PipelineState::new();
        state.buffer = "one".to_string();
        append_file(&mut state, &path_param(&target)).unwrap();
        state.buffer = "two".to_string();
        append_file(&mut state, &path_param(&target)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn unwritable_target_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PipelineState::new();
        // The directory itself is not a writable file target.
        let err = write_file(&mut state, &path_param(dir.path())).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
