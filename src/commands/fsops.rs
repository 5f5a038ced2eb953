//! Filesystem helper stages
//!
//! Thin wrappers over the OS: existence checks, globbing, directory
//! creation, link/touch maintenance, and the dirname/basename projections.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::cli::Param;
use crate::error::{StageError, StageResult};
use crate::state::PipelineState;
use crate::utils::paths::ensure_dir;

/// `--dirname`: map each line to its parent path.
pub fn dirname(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    project_lines(state, |path| {
        path.parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Ok(())
}

/// `--basename`: map each line to its final component.
pub fn basename(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    project_lines(state, |path| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Ok(())
}

/// `--touch PATH`: create the file or refresh its modification time.
pub fn touch(_state: &mut PipelineState, args: &[Param]) -> StageResult {
    let path = args[0].text()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| StageError::Io(format!("Error creating file: {err}")))?;
    file.set_modified(SystemTime::now())
        .map_err(|err| StageError::Io(format!("Error touching file: {err}")))
}

/// `--symlink TARGET LINK`: symlink where permitted, copy where not.
pub fn symlink(_state: &mut PipelineState, args: &[Param]) -> StageResult {
    let target = args[0].text()?;
    let link = args[1].text()?;
    if make_symlink(target, link).is_ok() {
        return Ok(());
    }
    copy_fallback(target, link).map_err(StageError::io)
}

/// `--ensure-dir PATH`
pub fn ensure_dir_path(_state: &mut PipelineState, args: &[Param]) -> StageResult {
    ensure_dir(Path::new(args[0].text()?)).map_err(StageError::io)
}

/// `--ensure-dirs PATH`: create a directory for every non-empty buffer
/// line. The path parameter is accepted for call-site compatibility and
/// not consulted.
pub fn ensure_dirs(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    for line in state.lines() {
        let path = line.trim();
        if !path.is_empty() {
            ensure_dir(Path::new(path)).map_err(StageError::io)?;
        }
    }
    Ok(())
}

/// `--glob`: expand each line as a glob pattern. A pattern with no matches
/// is fatal only while stop-on-error is active; otherwise it is dropped.
pub fn glob_lines(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let mut results: Vec<String> = Vec::new();
    for line in state.lines() {
        let matches = expand_glob(line);
        if !matches.is_empty() {
            results.extend(matches);
        } else if state.stop_on_error {
            return Err(StageError::CommandNotFound(format!(
                "No files found for pattern: {line}"
            )));
        }
    }
    state.buffer = results.join("\n");
    Ok(())
}

/// `--exists`: emit `true` once per line that matches anything on disk.
pub fn exists(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let mut results: Vec<&str> = Vec::new();
    for line in state.lines() {
        if !expand_glob(line.trim()).is_empty() {
            results.push("true");
        }
    }
    state.buffer = results.join("\n");
    Ok(())
}

/// `--print-valid FLAGS`: keep lines naming paths that pass the check.
pub fn print_valid(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let check = PathCheck::parse(args[0].text()?)?;
    let kept: Vec<&str> = state
        .lines()
        .into_iter()
        .filter(|line| check.passes(line.trim()))
        .collect();
    let joined = kept.join("\n");
    state.buffer = joined;
    Ok(())
}

#[derive(Clone, Copy)]
enum PathCheck {
    All,
    Dir,
    File,
    Symlink,
}

impl PathCheck {
    fn parse(flags: &str) -> Result<Self, StageError> {
        let mut check = PathCheck::All;
        for flag in flags.split(',') {
            check = match flag {
                "all" => check,
                "dir" => PathCheck::Dir,
                "file" => PathCheck::File,
                "symlink" => PathCheck::Symlink,
                other => {
                    return Err(StageError::InvalidFilterFlag(format!(
                        "Unknown filter flag: {other}"
                    )))
                }
            };
        }
        Ok(check)
    }

    fn passes(self, path: &str) -> bool {
        let path = Path::new(path);
        match self {
            PathCheck::All => path.exists(),
            PathCheck::Dir => path.is_dir(),
            PathCheck::File => path.is_file(),
            PathCheck::Symlink => path
                .symlink_metadata()
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false),
        }
    }
}

fn project_lines(state: &mut PipelineState, project: impl Fn(&Path) -> String) {
    let projected: Vec<String> = state
        .lines()
        .into_iter()
        .map(|line| project(Path::new(line.trim())))
        .collect();
    state.buffer = projected.join("\n");
}

fn expand_glob(pattern: &str) -> Vec<String> {
    match glob::glob(pattern) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .map(|path| path.to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(unix)]
fn make_symlink(target: &str, link: &str) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &str, link: &str) -> std::io::Result<()> {
    if Path::new(target).is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

fn copy_fallback(target: &str, link: &str) -> Result<()> {
    let source = Path::new(target);
    let destination = Path::new(link);
    if source.is_dir() {
        if destination.exists() {
            fs::remove_dir_all(destination)
                .with_context(|| format!("Failed to replace: {}", destination.display()))?;
        }
        copy_dir_all(source, destination)
    } else {
        fs::copy(source, destination)
            .with_context(|| format!("Failed to copy {} to {}", target, link))?;
        Ok(())
    }
}

fn copy_dir_all(source: &Path, destination: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("Walked entry outside the copied tree")?;
        let dest = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create directory: {}", dest.display()))?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("Failed to copy to: {}", dest.display()))?;
        }
    }
    Ok(())
}
