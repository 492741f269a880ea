use thiserror::Error;

/// One stage of a pipeline: a program, its arguments, and the redirections
/// and background flag attached to it.
#[derive(Debug, PartialEq)]
pub struct Command {
    /// Program name followed by its arguments; never empty.
    pub argv: Vec<String>,
    /// Path the stage reads stdin from, if redirected.
    pub input_file: Option<String>,
    /// Path the stage writes stdout to, if redirected.
    pub output_file: Option<String>,
    /// Whether the stage was suffixed with `&`. Only the last stage's flag
    /// is honored by the executor.
    pub in_bg: bool,
}

/// A non-empty left-to-right sequence of commands chained through pipes.
///
/// For pipelines longer than one stage, only the first stage may carry an
/// input redirection and only the last may carry an output redirection; the
/// parser rejects anything else.
#[derive(Debug, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    /// Whether the pipeline as a whole should run in the background.
    pub fn background(&self) -> bool {
        self.commands.last().is_some_and(|cmd| cmd.in_bg)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// The input was blank. Never reported to the user; the caller just
    /// shows the next prompt.
    #[error("Empty input")]
    Empty,
    #[error("Invalid syntax")]
    Invalid,
}

/// Parse one command line into a [`Pipeline`].
pub fn parse(input: &str) -> Result<Pipeline, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let stages = split_stages(input)?;
    let multi = stages.len() > 1;
    let last = stages.len() - 1;

    let commands = stages
        .into_iter()
        .enumerate()
        .map(|(idx, stage)| {
            let cmd = parse_stage(stage)?;
            // In a pipeline, interior stages read from and write to their
            // neighbors; a redirection there has nothing to attach to.
            if multi
                && ((idx > 0 && cmd.input_file.is_some())
                    || (idx < last && cmd.output_file.is_some()))
            {
                return Err(ParseError::Invalid);
            }
            Ok(cmd)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pipeline { commands })
}

// ── Pipeline split ────────────────────────────────────────────────────────────

/// Split the line on unquoted `|`, rejecting unbalanced quotes and stages
/// that are empty (leading, trailing, or doubled pipes).
fn split_stages(input: &str) -> Result<Vec<&str>, ParseError> {
    let mut stages = Vec::new();
    let mut in_double = false;
    let mut in_single = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '|' if !in_double && !in_single => {
                stages.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_double || in_single {
        return Err(ParseError::Invalid);
    }
    stages.push(&input[start..]);

    if stages.iter().any(|s| s.trim().is_empty()) {
        return Err(ParseError::Invalid);
    }
    Ok(stages)
}

// ── Per-stage parse ───────────────────────────────────────────────────────────

fn parse_stage(stage: &str) -> Result<Command, ParseError> {
    let stage = stage.trim();

    // A trailing `&` marks the stage as background; it is stripped before
    // redirection extraction so `cmd > out &` parses.
    let (stage, in_bg) = match stage.strip_suffix('&') {
        Some(rest) => (rest.trim_end(), true),
        None => (stage, false),
    };
    if stage.is_empty() {
        return Err(ParseError::Invalid);
    }

    let chars: Vec<char> = stage.chars().collect();

    // Locate the unquoted redirection operators; at most one of each kind.
    let mut out_pos: Option<usize> = None;
    let mut in_pos: Option<usize> = None;
    let mut in_double = false;
    let mut in_single = false;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '>' if !in_double && !in_single => {
                if out_pos.replace(i).is_some() {
                    return Err(ParseError::Invalid);
                }
            }
            '<' if !in_double && !in_single => {
                if in_pos.replace(i).is_some() {
                    return Err(ParseError::Invalid);
                }
            }
            _ => {}
        }
    }

    // Each target runs from its operator to the next operator or the end of
    // the stage; argv is whatever precedes the first operator.
    let output_file = match out_pos {
        Some(p) => Some(parse_target(&chars, p + 1, region_end(p, in_pos, chars.len()))?),
        None => None,
    };
    let input_file = match in_pos {
        Some(p) => Some(parse_target(&chars, p + 1, region_end(p, out_pos, chars.len()))?),
        None => None,
    };

    let argv_end = [out_pos, in_pos]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(chars.len());
    let argv = split_words(&chars[..argv_end])?;
    if argv.is_empty() {
        return Err(ParseError::Invalid);
    }

    Ok(Command {
        argv,
        input_file,
        output_file,
        in_bg,
    })
}

fn region_end(pos: usize, other: Option<usize>, len: usize) -> usize {
    match other {
        Some(q) if q > pos => q,
        _ => len,
    }
}

/// Extract a redirection target from `chars[start..end]`.
///
/// The target starts at the first non-space character. A quoted target ends
/// at its closing quote (the quotes themselves are stripped); an unquoted
/// target extends to the end of the region with trailing whitespace removed.
fn parse_target(chars: &[char], start: usize, end: usize) -> Result<String, ParseError> {
    let mut i = start;
    while i < end && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= end {
        return Err(ParseError::Invalid); // operator with no target
    }

    let quote = chars[i];
    if quote == '"' || quote == '\'' {
        i += 1;
        let close = chars[i..end]
            .iter()
            .position(|&c| c == quote)
            .map(|off| i + off)
            .ok_or(ParseError::Invalid)?;
        if close == i {
            return Err(ParseError::Invalid); // empty quoted target
        }
        return Ok(chars[i..close].iter().collect());
    }

    let target: String = chars[i..end].iter().collect();
    Ok(target.trim_end().to_string())
}

/// States for the word-splitting state machine.
enum State {
    /// Between words — whitespace is skipped.
    Normal,
    /// Building a word — whitespace ends it.
    InWord,
    /// Inside double quotes — whitespace is preserved, single quotes literal.
    InDoubleQuote,
    /// Inside single quotes — whitespace is preserved, double quotes literal.
    InSingleQuote,
}

/// Split the argv prefix into words on unquoted whitespace.
///
/// Quote characters delimit spans but do not break words, so adjacent quoted
/// and unquoted fragments concatenate: `a' 'b` is the single word `a b`.
fn split_words(chars: &[char]) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;

    for &c in chars {
        match (&state, c) {
            (State::Normal, c) if c.is_whitespace() => {}
            (State::Normal, '"') => state = State::InDoubleQuote,
            (State::Normal, '\'') => state = State::InSingleQuote,
            (State::Normal, c) => {
                current.push(c);
                state = State::InWord;
            }

            (State::InWord, c) if c.is_whitespace() => {
                words.push(std::mem::take(&mut current));
                state = State::Normal;
            }
            (State::InWord, '"') => state = State::InDoubleQuote,
            (State::InWord, '\'') => state = State::InSingleQuote,
            (State::InWord, c) => current.push(c),

            (State::InDoubleQuote, '"') => state = State::InWord,
            (State::InDoubleQuote, c) => current.push(c),

            (State::InSingleQuote, '\'') => state = State::InWord,
            (State::InSingleQuote, c) => current.push(c),
        }
    }

    match state {
        State::Normal => {}
        State::InWord => words.push(current),
        // Unbalanced quotes are caught when the line is split into stages;
        // this guards the same invariant for direct callers.
        State::InDoubleQuote | State::InSingleQuote => return Err(ParseError::Invalid),
    }

    Ok(words)
}

// ── Unit tests ────────────────────────────────────────────────────────────────
