//! Command encoding for the checker's line protocol.
//!
//! Each request is one line of space-joined commands, each command being
//! `<target>::<verb>`. There are no request ids: one line in, one response
//! out, strictly in order.

use std::fmt;

use tycheck_types::Location;

/// First line of a `run` or `suggest` response block that is not content.
pub(crate) const SENTINEL_PREFIX: char = '#';

/// Answers the checker gives when it has no type for a location.
const NON_ANSWER_PREFIXES: [&str; 2] = ["No known type available", "Can't find expression"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check the whole workspace and stream all diagnostics.
    Run,
    /// Infer parameter and return types for a function by dotted name.
    Suggest(String),
    /// Type of the expression at a location.
    Inspect(Location),
}

impl Command {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Run => "::run".to_string(),
            Self::Suggest(name) => format!("{name}::suggest"),
            Self::Inspect(location) => format!("{location}::inspect"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Join commands into one newline-terminated request line.
#[must_use]
pub fn encode_line(commands: &[Command]) -> String {
    let mut line = commands
        .iter()
        .map(Command::encode)
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line
}

/// Strip the quote and newline padding the checker leaves around an answer.
#[must_use]
pub fn clean_answer(raw: &str) -> &str {
    raw.trim_matches(|c| matches!(c, '"' | '\n' | '\r'))
}

/// Whether an answer is one of the checker's "no type here" phrases.
#[must_use]
pub fn is_non_answer(answer: &str) -> bool {
    NON_ANSWER_PREFIXES
        .iter()
        .any(|prefix| answer.starts_with(prefix))
}

/// Re-root a dotted function name on another module.
///
/// `pkg.mod.Class.method` becomes `<module>.method`: only the last segment
/// survives, matching how the scratch module flattens the original.
#[must_use]
pub fn reroot_function(qualified_name: &str, module: &str) -> String {
    let function = qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(qualified_name);
    format!("{module}.{function}")
}
