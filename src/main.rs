//! mkpipe - portable command-chain text utility for build scripts
//!
//! A single text buffer is threaded through an ordered chain of
//! flag-denoted stages (sort, filter, substitute, path translation,
//! subprocess capture), replacing the Unix text tools build scripts lean
//! on without requiring Cygwin or MSYS2 on Windows.
//!
//! ```text
//! mkpipe --read files.txt --filter '\.o$' --sort none --unique --print
//! ```

mod cli;
mod commands;
mod error;
mod exec;
mod state;
mod utils;

use std::process;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut interpreter = cli::Interpreter::new(args);
    process::exit(interpreter.run());
}
