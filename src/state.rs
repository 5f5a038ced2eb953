//! Mutable pipeline context threaded through every stage
//!
//! There is exactly one `PipelineState` per invocation. Each stage takes it
//! by exclusive borrow, transforms the buffer, and hands it to the next
//! stage; nothing here is shared across threads.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Destination for an output stream of a spawned command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMode {
    /// Capture into the pipeline buffer.
    Inline,
    /// Pass through to this process's own stdout/stderr.
    Console,
    /// Drop the stream entirely.
    Discard,
    /// Truncate into a file, creating parent directories on demand.
    File(PathBuf),
}

/// The single piece of mutable data flowing through the interpreter.
pub struct PipelineState {
    /// Current text, an ordered sequence of lines joined by `\n`.
    pub buffer: String,
    /// Environment passed to every spawned process, overlaid by `--env`.
    pub env: HashMap<String, String>,
    /// Working directory for spawned processes.
    pub working_dir: PathBuf,
    /// Where a spawned command's stdout goes. Defaults to inline capture.
    pub stdout: SinkMode,
    /// Where a spawned command's stderr goes. Defaults to the console.
    pub stderr: SinkMode,
    /// Halt the chain on the first failing stage. Defaults to true.
    pub stop_on_error: bool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            env: env::vars().collect(),
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            stdout: SinkMode::Inline,
            stderr: SinkMode::Console,
            stop_on_error: true,
        }
    }

    /// Append a chunk of input, separated from existing content by a newline.
    pub fn append_text(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(text);
    }

    /// The buffer split on `\n`. Trailing blank segments are real lines and
    /// are preserved by every transform.
    pub fn lines(&self) -> Vec<&str> {
        self.buffer.split('\n').collect()
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
