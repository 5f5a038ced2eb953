//! Key-driven sorting and summing
//!
//! `--sort` and `--sum` share the column-addressing grammar: a key is pulled
//! from each line either by whitespace-separated field index or by a regex
//! with a named capture group `value`. Flags are resolved once into a spec
//! value per invocation; every line is validated before the buffer changes,
//! so a rejected stage leaves the previous buffer intact.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::cli::Param;
use crate::commands::decode_escapes;
use crate::error::{StageError, StageResult};
use crate::state::PipelineState;

/// `--sort FLAGS`
pub fn sort_lines(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let spec = SortSpec::parse(args[0].text()?)?;
    let lines: Vec<String> = state.buffer.split('\n').map(str::to_string).collect();

    // Key every line up front; the first unabsorbed failure aborts with the
    // buffer untouched.
    let mut keyed = Vec::with_capacity(lines.len());
    for line in lines {
        let key = spec.key_for(&line)?;
        keyed.push((key, line));
    }

    keyed.sort_by(|a, b| {
        let ordering = a.0.compare(&b.0);
        if spec.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });
    state.buffer = keyed
        .into_iter()
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(())
}

/// `--sum FLAGS`: replace the buffer with the formatted total of every
/// line's key.
pub fn sum_lines(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let spec = SumSpec::parse(args[0].text()?)?;
    let lines: Vec<String> = state.buffer.split('\n').map(str::to_string).collect();

    state.buffer = match spec.numeric {
        SumKind::Float => {
            let mut total = 0.0f64;
            for line in &lines {
                total += spec.float_value(line)?;
            }
            match spec.precision {
                Some(precision) => format!("{:.*}", precision, total),
                None => format!("{total:.6}"),
            }
        }
        SumKind::Int => {
            let mut total = 0i64;
            for line in &lines {
                total += spec.int_value(line)?;
            }
            total.to_string()
        }
        SumKind::Hex => {
            let mut total = 0i64;
            for line in &lines {
                total += spec.int_value(line)?;
            }
            format_hex(total)
        }
    };
    Ok(())
}

/// How a key is read out of a line.
enum Column {
    /// 0-based field index into the whitespace split; negative counts from
    /// the end, so the `column=0` flag addresses the last field.
    Index(i64),
    /// Search pattern exposing a named capture group `value`.
    Pattern(Regex),
}

#[derive(Clone, Copy, PartialEq)]
enum SortKind {
    Text,
    Float,
    Int,
    Hex,
}

struct SortSpec {
    column: Column,
    reverse: bool,
    kind: SortKind,
    trim: bool,
    ignore_error_lines: bool,
}

impl SortSpec {
    fn parse(flags: &str) -> Result<Self, StageError> {
        let mut spec = SortSpec {
            column: Column::Index(0),
            reverse: false,
            kind: SortKind::Text,
            trim: false,
            ignore_error_lines: false,
        };
        for flag in flags.split(',') {
            match flag {
                "none" => {}
                "desc" => spec.reverse = true,
                "asc" => spec.reverse = false,
                "float" => spec.kind = SortKind::Float,
                "int" => spec.kind = SortKind::Int,
                "int16" => spec.kind = SortKind::Hex,
                "strip" => spec.trim = true,
                "ignore_error_lines" => spec.ignore_error_lines = true,
                _ => {
                    if let Some(column) = flag.strip_prefix("column=") {
                        spec.column = parse_column(column)?;
                    } else {
                        return Err(StageError::InvalidSortFlag(flag.to_string()));
                    }
                }
            }
        }
        Ok(spec)
    }

    fn key_for(&self, line: &str) -> Result<SortKey, StageError> {
        let Some(raw) = read_column(&self.column, line) else {
            return self.error_key(format!("No sort key in: {line}"));
        };
        let raw = if self.trim { raw.trim() } else { raw };
        let parsed = match self.kind {
            SortKind::Text => return Ok(SortKey::Text(raw.to_string())),
            SortKind::Float => parse_float(raw).map(SortKey::Float),
            SortKind::Int => parse_int(raw).map(SortKey::Int),
            SortKind::Hex => parse_hex(raw).map(SortKey::Int),
        };
        match parsed {
            Some(key) => Ok(key),
            None => self.error_key(format!("Error converting value: {raw} in: {line}")),
        }
    }

    /// Deterministic fallback for unkeyable lines: they collect at the far
    /// end of the output, or the stage aborts when errors are not ignored.
    fn error_key(&self, message: String) -> Result<SortKey, StageError> {
        if !self.ignore_error_lines {
            return Err(StageError::InvalidSortValue(message));
        }
        Ok(match self.kind {
            SortKind::Text => SortKey::Text(String::new()),
            _ if self.reverse => SortKey::Min,
            _ => SortKey::Max,
        })
    }
}

enum SortKey {
    Int(i64),
    Float(f64),
    Text(String),
    Min,
    Max,
}

impl SortKey {
    fn compare(&self, other: &SortKey) -> Ordering {
        use SortKey::*;
        match (self, other) {
            (Min, Min) | (Max, Max) => Ordering::Equal,
            (Min, _) | (_, Max) => Ordering::Less,
            (Max, _) | (_, Min) => Ordering::Greater,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            // Key kinds are uniform within one invocation.
            _ => Ordering::Equal,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SumKind {
    Float,
    Int,
    Hex,
}

struct SumSpec {
    column: Column,
    numeric: SumKind,
    precision: Option<usize>,
    ignore_error_lines: bool,
}

impl SumSpec {
    fn parse(flags: &str) -> Result<Self, StageError> {
        let mut spec = SumSpec {
            column: Column::Index(0),
            numeric: SumKind::Float,
            precision: None,
            ignore_error_lines: false,
        };
        for flag in flags.split(',') {
            match flag {
                "none" | "float" => spec.numeric = SumKind::Float,
                "int" => spec.numeric = SumKind::Int,
                "int16" => spec.numeric = SumKind::Hex,
                "ignore_error_lines" => spec.ignore_error_lines = true,
                _ => {
                    if let Some(precision) = flag.strip_prefix("float=") {
                        spec.numeric = SumKind::Float;
                        spec.precision = Some(precision.parse().map_err(|_| {
                            StageError::InvalidSumFlag(flag.to_string())
                        })?);
                    } else if let Some(column) = flag.strip_prefix("column=") {
                        spec.column = parse_column(column)?;
                    } else {
                        return Err(StageError::InvalidSumFlag(flag.to_string()));
                    }
                }
            }
        }
        Ok(spec)
    }

    fn float_value(&self, line: &str) -> Result<f64, StageError> {
        match read_column(&self.column, line).and_then(parse_float) {
            Some(value) => Ok(value),
            None if self.ignore_error_lines => Ok(0.0),
            None => Err(StageError::InvalidSumValue(format!(
                "No summable value in: {line}"
            ))),
        }
    }

    fn int_value(&self, line: &str) -> Result<i64, StageError> {
        let parse = match self.numeric {
            SumKind::Hex => parse_hex,
            _ => parse_int,
        };
        match read_column(&self.column, line).and_then(parse) {
            Some(value) => Ok(value),
            None if self.ignore_error_lines => Ok(0),
            None => Err(StageError::InvalidSumValue(format!(
                "No summable value in: {line}"
            ))),
        }
    }
}

/// `column=N` is 1-based; anything non-numeric is compiled as a pattern
/// after quote stripping and escape decoding.
fn parse_column(text: &str) -> Result<Column, StageError> {
    if let Ok(index) = text.parse::<i64>() {
        return Ok(Column::Index(index - 1));
    }
    let decoded = decode_escapes(text);
    let cleaned = strip_quotes(&decoded);
    Regex::new(cleaned)
        .map(Column::Pattern)
        .map_err(|err| StageError::InvalidSortColumn(format!("{text}: {err}")))
}

fn strip_quotes(text: &str) -> &str {
    let text = text.strip_suffix('"').unwrap_or(text);
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('\'').unwrap_or(text);
    text.strip_prefix('\'').unwrap_or(text)
}

fn field_splitter() -> &'static Regex {
    static FIELD_SPLIT: OnceLock<Regex> = OnceLock::new();
    FIELD_SPLIT.get_or_init(|| Regex::new(r"[ \t]+").unwrap())
}

fn read_column<'a>(column: &Column, line: &'a str) -> Option<&'a str> {
    match column {
        Column::Index(index) => {
            let fields: Vec<&str> = field_splitter().split(line).collect();
            let resolved = if *index < 0 {
                fields.len() as i64 + index
            } else {
                *index
            };
            if resolved < 0 || resolved >= fields.len() as i64 {
                None
            } else {
                Some(fields[resolved as usize])
            }
        }
        Column::Pattern(pattern) => pattern
            .captures(line)
            .and_then(|caps| caps.name("value"))
            .map(|m| m.as_str()),
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

fn parse_hex(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    i64::from_str_radix(digits, 16).ok()
}

fn format_hex(total: i64) -> String {
    if total < 0 {
        format!("-{:x}", total.unsigned_abs())
    } else {
        format!("{total:x}")
    }
}
