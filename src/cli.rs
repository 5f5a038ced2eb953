//! Command registry and pipeline interpreter
//!
//! The argument list is a program: each flag names a stage, each stage
//! consumes its parameters and transforms the shared pipeline state. The
//! registry is an explicit static table built once per invocation;
//! registration order is the dispatch tie-break, so the table order below
//! is part of the interface.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use crate::commands::{env, exec, fsops, input, lines, output, paths, sortsum};
use crate::error::{StageError, StageResult};
use crate::state::PipelineState;

/// One captured argument, converted at dispatch time.
#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
    Number(i64),
}

impl Param {
    pub fn text(&self) -> Result<&str, StageError> {
        match self {
            Param::Text(value) => Ok(value),
            Param::Number(_) => Err(StageError::Undefined(
                "Expected a text parameter".to_string(),
            )),
        }
    }

    pub fn number(&self) -> Result<i64, StageError> {
        match self {
            Param::Number(value) => Ok(*value),
            Param::Text(_) => Err(StageError::Undefined(
                "Expected a numeric parameter".to_string(),
            )),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(value) => write!(f, "{value}"),
            Param::Number(value) => write!(f, "{value}"),
        }
    }
}

/// How many tokens a stage consumes.
pub enum Arity {
    /// Exactly this many tokens.
    Fixed(usize),
    /// Every token up to (not including) the terminator; the terminator
    /// itself is consumed and discarded.
    UntilTerminator(&'static str),
    /// Nothing.
    Zero,
}

pub type Handler = fn(&mut PipelineState, &[Param]) -> StageResult;
pub type Converter = fn(&str) -> Result<Param, StageError>;

/// Immutable descriptor of one supported flag.
pub struct CommandSpec {
    pub long: &'static str,
    pub short: Option<&'static str>,
    pub params: &'static [&'static str],
    pub arity: Arity,
    pub convert: Option<Converter>,
    pub handler: Handler,
    pub about: &'static str,
}

fn convert_number(token: &str) -> Result<Param, StageError> {
    token
        .trim()
        .parse::<i64>()
        .map(Param::Number)
        .map_err(|_| StageError::MissingParameter(format!("Invalid numeric parameter: {token}")))
}

fn show_help(_state: &mut PipelineState, _args: &[Param]) -> StageResult {
    print_help(&builtin_specs());
    Ok(())
}

/// The full command table, in dispatch order.
pub fn builtin_specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            long: "--env",
            short: None,
            params: &["KEY=VALUE"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: env::set_env,
            about: "Set an environment variable",
        },
        CommandSpec {
            long: "--stdout",
            short: None,
            params: &["MODE|PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: env::set_stdout,
            about: "Set the stdout mode",
        },
        CommandSpec {
            long: "--stderr",
            short: None,
            params: &["MODE|PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: env::set_stderr,
            about: "Set the stderr mode",
        },
        CommandSpec {
            long: "--stoponerror",
            short: None,
            params: &["MODE"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: env::set_stop_on_error,
            about: "Set the exit mode",
        },
        CommandSpec {
            long: "--help",
            short: Some("-h"),
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: show_help,
            about: "Show help",
        },
        CommandSpec {
            long: "--platform-exec",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: input::platform_exec,
            about: "Get the platform executable extension",
        },
        CommandSpec {
            long: "--platform-open",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: input::platform_open,
            about: "Get the platform open utility",
        },
        CommandSpec {
            long: "--exec",
            short: Some("-e"),
            params: &["COMMAND", "ARGS..."],
            arity: Arity::UntilTerminator(";"),
            convert: None,
            handler: exec::run_exec,
            about: "Run a command",
        },
        CommandSpec {
            long: "--in",
            short: Some("-i"),
            params: &["STR"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: input::append_input,
            about: "Set the input",
        },
        CommandSpec {
            long: "--read",
            short: Some("-r"),
            params: &["PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: input::read_file,
            about: "Read from a file",
        },
        CommandSpec {
            long: "--platform",
            short: Some("-p"),
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: input::platform,
            about: "Get the platform",
        },
        CommandSpec {
            long: "--cygwin",
            short: Some("-c"),
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: input::cygwin_version,
            about: "Get the Cygwin version",
        },
        CommandSpec {
            long: "--mingw",
            short: Some("-m"),
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: input::mingw_version,
            about: "Get the MSYS2 version",
        },
        CommandSpec {
            long: "--timestamp",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: input::timestamp,
            about: "Get the current timestamp",
        },
        CommandSpec {
            long: "--out",
            short: Some("-o"),
            params: &["PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: output::write_file,
            about: "Write to a file",
        },
        CommandSpec {
            long: "--append",
            short: Some("-a"),
            params: &["PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: output::append_file,
            about: "Append to a file",
        },
        CommandSpec {
            long: "--print",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: output::print_buffer,
            about: "Print to stdout",
        },
        CommandSpec {
            long: "--foreach",
            short: None,
            params: &["COMMAND", "ARGS..."],
            arity: Arity::UntilTerminator(";"),
            convert: None,
            handler: exec::run_foreach,
            about: "Run a command for each line",
        },
        CommandSpec {
            long: "--include",
            short: None,
            params: &["FROM", "TO"],
            arity: Arity::Fixed(2),
            convert: Some(convert_number),
            handler: lines::include_lines,
            about: "Include lines from the input",
        },
        CommandSpec {
            long: "--exclude",
            short: None,
            params: &["FROM", "TO"],
            arity: Arity::Fixed(2),
            convert: Some(convert_number),
            handler: lines::exclude_lines,
            about: "Exclude lines from the input",
        },
        CommandSpec {
            long: "--lower",
            short: Some("-l"),
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::to_lower,
            about: "Convert to lower case",
        },
        CommandSpec {
            long: "--upper",
            short: Some("-u"),
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::to_upper,
            about: "Convert to upper case",
        },
        CommandSpec {
            long: "--filter",
            short: Some("-f"),
            params: &["REGEX"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: lines::filter_lines,
            about: "Filter lines based on regex",
        },
        CommandSpec {
            long: "--filter-out",
            short: None,
            params: &["REGEX"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: lines::filter_out_lines,
            about: "Remove lines based on regex",
        },
        CommandSpec {
            long: "--noempty",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::remove_empty_lines,
            about: "Remove empty lines",
        },
        CommandSpec {
            long: "--sub",
            short: Some("-s"),
            params: &["REGEX", "SUB"],
            arity: Arity::Fixed(2),
            convert: None,
            handler: lines::substitute,
            about: "Replace lines based on regex",
        },
        CommandSpec {
            long: "--sort",
            short: None,
            params: &["FLAGS"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: sortsum::sort_lines,
            about: "Sort lines",
        },
        CommandSpec {
            long: "--unique",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::unique_lines,
            about: "Remove duplicate lines",
        },
        CommandSpec {
            long: "--reverse",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::reverse_lines,
            about: "Reverse lines",
        },
        CommandSpec {
            long: "--first",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::first_line,
            about: "Get the first line",
        },
        CommandSpec {
            long: "--last",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::last_line,
            about: "Get the last line",
        },
        CommandSpec {
            long: "--sum",
            short: None,
            params: &["FLAGS"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: sortsum::sum_lines,
            about: "Sum lines",
        },
        CommandSpec {
            long: "--count",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: lines::count_lines,
            about: "Count lines",
        },
        CommandSpec {
            long: "--env-path",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: paths::env_path,
            about: "Convert to environment path",
        },
        CommandSpec {
            long: "--platform-path",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: paths::platform_path,
            about: "Convert to platform path",
        },
        CommandSpec {
            long: "--shell-list",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: paths::shell_list,
            about: "Convert to shell list",
        },
        CommandSpec {
            long: "--dirname",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: fsops::dirname,
            about: "Get the directory name",
        },
        CommandSpec {
            long: "--basename",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: fsops::basename,
            about: "Get the base name",
        },
        CommandSpec {
            long: "--touch",
            short: None,
            params: &["PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: fsops::touch,
            about: "Create a file or update its timestamp",
        },
        CommandSpec {
            long: "--symlink",
            short: None,
            params: &["TARGET", "LINK"],
            arity: Arity::Fixed(2),
            convert: None,
            handler: fsops::symlink,
            about: "Create a symbolic link",
        },
        CommandSpec {
            long: "--ensure-dir",
            short: None,
            params: &["PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: fsops::ensure_dir_path,
            about: "Create a directory",
        },
        CommandSpec {
            long: "--ensure-dirs",
            short: None,
            params: &["PATH"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: fsops::ensure_dirs,
            about: "Create directories for all target lines",
        },
        CommandSpec {
            long: "--glob",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: fsops::glob_lines,
            about: "Unpack glob patterns in lines",
        },
        CommandSpec {
            long: "--exists",
            short: None,
            params: &[],
            arity: Arity::Zero,
            convert: None,
            handler: fsops::exists,
            about: "Check if all files exist",
        },
        CommandSpec {
            long: "--print-valid",
            short: None,
            params: &["FLAGS"],
            arity: Arity::Fixed(1),
            convert: None,
            handler: fsops::print_valid,
            about: "Print valid files or directories",
        },
    ]
}

/// Print the usage table for every registered command.
pub fn print_help(specs: &[CommandSpec]) {
    let name = std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    println!("Usage: {name} [COMMANDS]");
    println!("Available commands:");
    for spec in specs {
        let flag = match spec.short {
            Some(short) => format!("{:>13}|{}", spec.long, short),
            None => format!("{:>13}   ", spec.long),
        };
        let mut params = spec.params.join(" ");
        if let Arity::UntilTerminator(token) = spec.arity {
            params.push(' ');
            params.push_str(token);
        }
        if !params.is_empty() {
            params.insert(0, ' ');
        }
        println!("{flag}{params:<20}  {}", spec.about);
    }
}

/// Left-to-right driver over the argument list.
pub struct Interpreter {
    registry: Vec<CommandSpec>,
    state: PipelineState,
    args: VecDeque<String>,
}

impl Interpreter {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            registry: builtin_specs(),
            state: PipelineState::new(),
            args: args.into(),
        }
    }

    /// Run the whole chain and return the process exit code: the halting
    /// stage's status, or the final stage's status once the tokens run out.
    pub fn run(&mut self) -> i32 {
        let mut ran_any = false;
        let mut last_code = 0;
        while !self.args.is_empty() {
            let index = match self.match_head() {
                Some(index) => index,
                None => {
                    let head = self.args.front().cloned().unwrap_or_default();
                    let err = StageError::UnknownArgument(head);
                    err.report();
                    return err.exit_code();
                }
            };
            let spec = &self.registry[index];
            let captured = match capture_params(spec, &mut self.args) {
                Ok(captured) => captured,
                Err(err) => {
                    err.report();
                    return err.exit_code();
                }
            };
            ran_any = true;
            match (spec.handler)(&mut self.state, &captured) {
                Ok(()) => last_code = 0,
                Err(err) => {
                    err.report();
                    last_code = err.exit_code();
                    if self.state.stop_on_error {
                        let rendered: Vec<String> =
                            captured.iter().map(|p| p.to_string()).collect();
                        eprintln!(
                            "Failed to execute command: {} {} with result: {}",
                            spec.long,
                            rendered.join(" "),
                            last_code
                        );
                        return last_code;
                    }
                }
            }
        }
        if !ran_any {
            println!("No commands found");
            print_help(&self.registry);
            return StageError::NoCommands.exit_code();
        }
        last_code
    }

    /// First spec in registration order whose flag matches the head token
    /// wins. Matching consumes the flag token; an inline `=value` is spliced
    /// back as the new head.
    fn match_head(&mut self) -> Option<usize> {
        let head = self.args.front()?.clone();
        for (index, spec) in self.registry.iter().enumerate() {
            if let Some(rest) = head.strip_prefix(spec.long) {
                if rest.is_empty() {
                    self.args.pop_front();
                    return Some(index);
                }
                if let Some(value) = rest.strip_prefix('=') {
                    let value = value.to_string();
                    self.args.pop_front();
                    self.args.push_front(value);
                    return Some(index);
                }
                // Any other continuation belongs to a longer flag.
            }
            if spec.short == Some(head.as_str()) {
                self.args.pop_front();
                return Some(index);
            }
        }
        None
    }

    #[cfg(test)]
    fn state(&self) -> &PipelineState {
        &self.state
    }
}

/// Resolve the spec's arity against the remaining tokens and convert each
/// captured token independently.
fn capture_params(
    spec: &CommandSpec,
    args: &mut VecDeque<String>,
) -> Result<Vec<Param>, StageError> {
    let tokens: Vec<String> = match spec.arity {
        Arity::Zero => Vec::new(),
        Arity::Fixed(count) => {
            if args.len() < count {
                return Err(StageError::MissingParameter(format!(
                    "Not enough parameters for {}",
                    spec.long
                )));
            }
            args.drain(..count).collect()
        }
        Arity::UntilTerminator(token) => {
            let position = args.iter().position(|arg| arg == token).ok_or_else(|| {
                StageError::MissingParameter(format!(
                    "Missing {} terminator for {}",
                    token, spec.long
                ))
            })?;
            let taken: Vec<String> = args.drain(..position).collect();
            args.pop_front();
            taken
        }
    };
    match spec.convert {
        Some(convert) => tokens.iter().map(|token| convert(token)).collect(),
        None => Ok(tokens.into_iter().map(Param::Text).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_chain(tokens: &[&str]) -> (i32, String) {
        let mut interpreter =
            Interpreter::new(tokens.iter().map(|t| t.to_string()).collect());
        let code = interpreter.run();
        (code, interpreter.state().buffer.clone())
    }

    #[test]
    fn empty_argument_list_is_no_commands() {
        let (code, _) = run_chain(&[]);
        assert_eq!(code, 8);
    }

    #[test]
    fn unknown_flag_halts_even_without_stop_on_error() {
        let (code, _) = run_chain(&["--stoponerror", "false", "--definitely-unknown"]);
        assert_eq!(code, 7);
    }

    #[test]
    fn missing_fixed_parameter_halts_with_missing_parameter() {
        let (code, _) = run_chain(&["--in"]);
        assert_eq!(code, 6);
    }

    #[test]
    fn missing_terminator_halts_with_missing_parameter() {
        let (code, _) = run_chain(&["--exec", "echo", "hi"]);
        assert_eq!(code, 6);
    }

    #[test]
    fn bad_numeric_conversion_is_missing_parameter() {
        let (code, _) = run_chain(&["--in", "a", "--include", "zero", "1"]);
        assert_eq!(code, 6);
    }

    #[test]
    fn equals_value_is_spliced_as_next_token() {
        let (code, buffer) = run_chain(&["--in=spliced"]);
        assert_eq!(code, 0);
        assert_eq!(buffer, "spliced");
    }

    #[test]
    fn short_flags_match_exactly() {
        let (code, buffer) = run_chain(&["-i", "via-short"]);
        assert_eq!(code, 0);
        assert_eq!(buffer, "via-short");
    }

    #[test]
    fn prefix_sharing_flags_dispatch_to_the_longer_spec() {
        // --platform-path shares the --platform prefix, and --ensure-dirs
        // shares --ensure-dir; neither may be swallowed by the earlier spec.
        let (code, buffer) = run_chain(&["--in", "keep", "--platform-path"]);
        assert_eq!(code, 0);
        if !cfg!(windows) {
            assert_eq!(buffer, "keep");
        }

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("made/by/dirs");
        let (code, _) = run_chain(&[
            "--in",
            nested.to_str().unwrap(),
            "--ensure-dirs",
            "unused",
        ]);
        assert_eq!(code, 0);
        assert!(nested.is_dir());
    }

    #[test]
    fn soft_failure_continues_and_preserves_buffer() {
        let (code, buffer) = run_chain(&[
            "--stoponerror",
            "false",
            "--in",
            "kept",
            "--filter",
            "[",
            "--in",
            "more",
        ]);
        assert_eq!(code, 0);
        assert_eq!(buffer, "kept\nmore");
    }

    #[test]
    fn soft_failure_in_final_stage_sets_the_exit_code() {
        let (code, buffer) = run_chain(&["--stoponerror", "false", "--in", "x", "--filter", "["]);
        assert_eq!(code, 2);
        assert_eq!(buffer, "x");
    }

    #[test]
    fn hard_failure_halts_and_skips_later_stages() {
        let (code, buffer) = run_chain(&["--in", "x", "--filter", "[", "--in", "never"]);
        assert_eq!(code, 2);
        assert_eq!(buffer, "x");
    }

    #[test]
    fn chain_threads_buffer_through_stages() {
        let (code, buffer) = run_chain(&[
            "--in",
            "b\\na\\nb\\nc",
            "--sort",
            "none",
            "--unique",
        ]);
        assert_eq!(code, 0);
        assert_eq!(buffer, "a\nb\nc");
    }

    #[test]
    fn registry_flags_are_unique() {
        let specs = builtin_specs();
        for (index, spec) in specs.iter().enumerate() {
            for other in specs.iter().skip(index + 1) {
                assert_ne!(spec.long, other.long, "duplicate long flag");
                if spec.short.is_some() {
                    assert_ne!(spec.short, other.short, "duplicate short flag");
                }
            }
        }
    }

    #[test]
    fn terminator_is_consumed_with_the_stage() {
        // Tokens after the terminator belong to the next stage.
        let (code, buffer) = run_chain(&["--foreach", "missing-binary-zzz", ";", "--in", "x"]);
        assert_ne!(code, 0);
        assert_eq!(buffer, "");

        let (code, buffer) = run_chain(&[
            "--stoponerror",
            "false",
            "--foreach",
            "missing-binary-zzz",
            ";",
            "--in",
            "x",
        ]);
        assert_eq!(code, 0);
        assert_eq!(buffer, "x");
    }
}
