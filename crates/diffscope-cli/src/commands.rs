//! Line commands read from stdin.
//!
//! Each line maps onto one gesture of the comparison view. Query arguments
//! take the rest of the line, so they may contain spaces.

use diffscope_types::{Side, Timestamp};

pub const HELP: &str = "\
commands:
  left FROM UNTIL      select the baseline window
  right FROM UNTIL     select the comparison window
  both FROM UNTIL      select both windows (combined timeline)
  lq QUERY             set the baseline query
  rq QUERY             set the comparison query
  name QUERY           pick a root name; both sides get QUERY
  main QUERY           set the main query; empty sides pick it up
  label SIDE LABEL     list values of LABEL under SIDE's query
  max N                cap nodes in the rendered diff
  refresh              re-fetch with unchanged inputs
  dismiss              clear the last fetch error
  show                 print the current view
  help                 this text
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `side: None` selects both windows.
    Select { side: Option<Side>, from: Timestamp, until: Timestamp },
    Query { side: Side, query: String },
    RootName { query: String },
    MainQuery { query: String },
    Label { side: Side, label: String },
    MaxNodes(u32),
    Refresh,
    Dismiss,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("{command}: expected {expected}")]
    Usage { command: &'static str, expected: &'static str },
    #[error("not a number: {0}")]
    Number(String),
    #[error("not a side: {0} (left or right)")]
    Side(String),
}

/// Parse one input line. Blank lines and `#` comments give `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "left" | "l" => select(Some(Side::Left), "left", rest)?,
        "right" | "r" => select(Some(Side::Right), "right", rest)?,
        "both" | "b" => select(None, "both", rest)?,
        "lq" => Command::Query { side: Side::Left, query: rest.to_string() },
        "rq" => Command::Query { side: Side::Right, query: rest.to_string() },
        "name" => Command::RootName { query: required("name", "QUERY", rest)? },
        "main" => Command::MainQuery { query: rest.to_string() },
        "label" => {
            let (side, label) = rest
                .split_once(char::is_whitespace)
                .ok_or(ParseError::Usage { command: "label", expected: "SIDE LABEL" })?;
            let side = Side::from_str(side).ok_or_else(|| ParseError::Side(side.to_string()))?;
            Command::Label { side, label: required("label", "SIDE LABEL", label.trim())? }
        }
        "max" => {
            let n = required("max", "N", rest)?;
            Command::MaxNodes(n.parse().map_err(|_| ParseError::Number(n))?)
        }
        "refresh" => Command::Refresh,
        "dismiss" => Command::Dismiss,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(cmd))
}

fn select(side: Option<Side>, command: &'static str, rest: &str) -> Result<Command, ParseError> {
    let mut parts = rest.split_whitespace();
    let (Some(from), Some(until), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::Usage { command, expected: "FROM UNTIL" });
    };
    Ok(Command::Select { side, from: timestamp(from)?, until: timestamp(until)? })
}

fn timestamp(s: &str) -> Result<Timestamp, ParseError> {
    s.parse().map_err(|_| ParseError::Number(s.to_string()))
}

fn required(command: &'static str, expected: &'static str, rest: &str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::Usage { command, expected })
    } else {
        Ok(rest.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
