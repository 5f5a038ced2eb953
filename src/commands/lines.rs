//! Structural and regex transforms over the buffer's line sequence
//!
//! Every operation here is a total function from one buffer value to the
//! next, working on `split('\n')` boundaries. Transforms that can reject
//! their input (regex compilation, range conversion) do so before the buffer
//! is touched.

use regex::{Regex, RegexBuilder};

use crate::cli::Param;
use crate::error::{StageError, StageResult};
use crate::state::PipelineState;

/// `--include FROM TO`: keep the half-open 0-based range. `TO == 0` means
/// end of buffer; out-of-range indices clamp instead of failing.
pub fn include_lines(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let (from, to) = range_params(state, args)?;
    let lines = state.lines();
    let joined = if from < to {
        lines[from..to].join("\n")
    } else {
        String::new()
    };
    state.buffer = joined;
    Ok(())
}

/// `--exclude FROM TO`: drop the half-open 0-based range, keeping both
/// sides around it.
pub fn exclude_lines(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let (from, to) = range_params(state, args)?;
    let lines = state.lines();
    let mut kept: Vec<&str> = lines[..from].to_vec();
    kept.extend_from_slice(&lines[to.max(from)..]);
    let joined = kept.join("\n");
    state.buffer = joined;
    Ok(())
}

/// `--lower`
pub fn to_lower(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    state.buffer = state.buffer.to_lowercase();
    Ok(())
}

/// `--upper`
pub fn to_upper(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    state.buffer = state.buffer.to_uppercase();
    Ok(())
}

/// `--filter REGEX`: keep lines the pattern matches anywhere.
pub fn filter_lines(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let pattern = compile(args[0].text()?)?;
    retain_lines(state, |line| pattern.is_match(line));
    Ok(())
}

/// `--filter-out REGEX`: drop lines the pattern matches anywhere.
pub fn filter_out_lines(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let pattern = compile(args[0].text()?)?;
    retain_lines(state, |line| !pattern.is_match(line));
    Ok(())
}

/// `--noempty`: drop lines that are empty after trimming.
pub fn remove_empty_lines(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    retain_lines(state, |line| !line.trim().is_empty());
    Ok(())
}

/// `--sub REGEX SUB`: per-line substitution of every match, with `.`
/// matching anything. Capture groups are referenced as `$1` or `$name`.
pub fn substitute(state: &mut PipelineState, args: &[Param]) -> StageResult {
    let raw = args[0].text()?;
    let replacement = args[1].text()?.to_string();
    let pattern = RegexBuilder::new(raw)
        .dot_matches_new_line(true)
        .build()
        .map_err(|_| StageError::Regex(raw.to_string()))?;
    let rewritten: Vec<String> = state
        .lines()
        .into_iter()
        .map(|line| pattern.replace_all(line, replacement.as_str()).into_owned())
        .collect();
    state.buffer = rewritten.join("\n");
    Ok(())
}

/// `--unique`: adjacent dedup. A line is removed only when identical to the
/// immediately preceding retained line; sort first for global uniqueness.
pub fn unique_lines(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let lines = state.lines();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        if kept.last() != Some(&line) {
            kept.push(line);
        }
    }
    let joined = kept.join("\n");
    state.buffer = joined;
    Ok(())
}

/// `--reverse`
pub fn reverse_lines(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let mut lines = state.lines();
    lines.reverse();
    let joined = lines.join("\n");
    state.buffer = joined;
    Ok(())
}

/// `--first`
pub fn first_line(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let first = state.lines().first().map(|l| l.to_string()).unwrap_or_default();
    state.buffer = first;
    Ok(())
}

/// `--last`
pub fn last_line(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let last = state.lines().last().map(|l| l.to_string()).unwrap_or_default();
    state.buffer = last;
    Ok(())
}

/// `--count`: replace the buffer with its line count.
pub fn count_lines(state: &mut PipelineState, _args: &[Param]) -> StageResult {
    let count = state.lines().len();
    state.buffer = count.to_string();
    Ok(())
}

fn compile(pattern: &str) -> Result<Regex, StageError> {
    Regex::new(pattern).map_err(|_| StageError::Regex(pattern.to_string()))
}

fn retain_lines(state: &mut PipelineState, keep: impl Fn(&str) -> bool) {
    let kept: Vec<&str> = state.lines().into_iter().filter(|l| keep(l)).collect();
    let joined = kept.join("\n");
    state.buffer = joined;
}

fn range_params(state: &PipelineState, args: &[Param]) -> Result<(usize, usize), StageError> {
    let from = args[0].number()?;
    let to = args[1].number()?;
    let len = state.lines().len() as i64;
    let to = if to == 0 { len } else { to };
    Ok((from.clamp(0, len) as usize, to.clamp(0, len) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(buffer: &str) -> PipelineState {
        let mut state = PipelineState::new();
        state.buffer = buffer.to_string();
        state
    }

    fn text(values: &[&str]) -> Vec<Param> {
        values.iter().map(|v| Param::Text(v.to_string())).collect()
    }

    fn numbers(values: &[i64]) -> Vec<Param> {
        values.iter().map(|v| Param::Number(*v)).collect()
    }

    #[test]
    fn include_with_open_end_keeps_tail() {
        let mut state = state_with("l0\nl1\nl2\nl3\nl4");
        include_lines(&mut state, &numbers(&[1, 0])).unwrap();
        assert_eq!(state.buffer, "l1\nl2\nl3\nl4");
    }

    #[test]
    fn include_clamps_out_of_range_indices() {
        let mut state = state_with("a\nb");
        include_lines(&mut state, &numbers(&[0, 99])).unwrap();
        assert_eq!(state.buffer, "a\nb");
    }

    #[test]
    fn include_with_inverted_range_is_empty() {
        let mut state = state_with("a\nb\nc");
        include_lines(&mut state, &numbers(&[2, 1])).unwrap();
        assert_eq!(state.buffer, "");
    }

    #[test]
    fn exclude_drops_the_middle() {
        let mut state = state_with("a\nb\nc\nd");
        exclude_lines(&mut state, &numbers(&[1, 3])).unwrap();
        assert_eq!(state.buffer, "a\nd");
    }

    #[test]
    fn exclude_with_open_end_keeps_head() {
        let mut state = state_with("a\nb\nc");
        exclude_lines(&mut state, &numbers(&[1, 0])).unwrap();
        assert_eq!(state.buffer, "a");
    }

    #[test]
    fn filter_keeps_matching_lines() {
        let mut state = state_with("apple\nbanana\napricot");
        filter_lines(&mut state, &text(&["^ap"])).unwrap();
        assert_eq!(state.buffer, "apple\napricot");
    }

    #[test]
    fn filter_out_drops_matching_lines() {
        let mut state = state_with("apple\nbanana\napricot");
        filter_out_lines(&mut state, &text(&["^ap"])).unwrap();
        assert_eq!(state.buffer, "banana");
    }

    #[test]
    fn invalid_pattern_reports_regex_error_and_keeps_buffer() {
        let mut state = state_with("untouched");
        let err = filter_lines(&mut state, &text(&["["])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(state.buffer, "untouched");
    }

    #[test]
    fn substitute_rewrites_with_capture_groups() {
        let mut state = state_with("name=value\nother=thing");
        substitute(&mut state, &text(&["(\\w+)=(\\w+)", "$2:$1"])).unwrap();
        assert_eq!(state.buffer, "value:name\nthing:other");
    }

    #[test]
    fn noempty_drops_whitespace_only_lines() {
        let mut state = state_with("a\n\n  \nb\n");
        remove_empty_lines(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "a\nb");
    }

    #[test]
    fn unique_is_adjacent_only() {
        let mut state = state_with("a\na\nb\na");
        unique_lines(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "a\nb\na");
    }

    #[test]
    fn reverse_first_last_count() {
        let mut state = state_with("a\nb\nc");
        reverse_lines(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "c\nb\na");

        let mut state = state_with("a\nb\nc");
        first_line(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "a");

        let mut state = state_with("a\nb\nc");
        last_line(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "c");

        let mut state = state_with("a\nb\nc");
        count_lines(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "3");
    }

    #[test]
    fn case_conversion_applies_to_whole_buffer() {
        let mut state = state_with("MiXeD\nCase");
        to_lower(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "mixed\ncase");
        to_upper(&mut state, &[]).unwrap();
        assert_eq!(state.buffer, "MIXED\nCASE");
    }
}
