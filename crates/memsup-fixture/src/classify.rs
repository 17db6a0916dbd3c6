//! Startup diagnostic classification.
//!
//! A freshly started server may print a few lines on stderr. Some are
//! harmless (the port was already taken by a previous fixture, or the server
//! is warning about its settings); anything else means the launch failed.
//! Rules are checked top-down and the first match wins.

use std::fmt;

/// Outcome for one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Log and keep reading.
    Benign,
    /// Abort the launch with this line as the error.
    Fatal,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Benign => write!(f, "benign"),
            Classification::Fatal => write!(f, "fatal"),
        }
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub class: Classification,
}

/// Default rules. A line that matches none of them is fatal.
pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "already-listening",
        matches: is_already_listening,
        class: Classification::Benign,
    },
    ClassificationRule {
        name: "warning",
        matches: is_warning,
        class: Classification::Benign,
    },
    ClassificationRule {
        name: "blank",
        matches: is_blank,
        class: Classification::Benign,
    },
];

fn is_already_listening(line: &str) -> bool {
    line.contains("failed to listen on")
}

fn is_warning(line: &str) -> bool {
    line.contains("WARNING") || line.contains("warning")
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Classifies `line` against [`DEFAULT_RULES`].
pub fn classify(line: &str) -> Classification {
    classify_with(DEFAULT_RULES, line).0
}

/// Classifies `line` against `rules`, also returning the matching rule name.
///
/// Lines no rule recognises come back as `(Fatal, "unrecognised")`.
pub fn classify_with(rules: &[ClassificationRule], line: &str) -> (Classification, &'static str) {
    rules
        .iter()
        .find(|rule| (rule.matches)(line))
        .map(|rule| (rule.class, rule.name))
        .unwrap_or((Classification::Fatal, "unrecognised"))
}
