//! Ordered entity rules for accumulated top-level text.
//!
//! Each rule pairs a pattern with a consumption strategy. Rules are tried in
//! table order and the first match wins; later rules are looser catch-alls, so
//! the order is the disambiguation policy and must not change.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tree::{BlockKind, ANONYMOUS};

/// `__attribute__ ((...))`, `attribute_hidden`, `weak_function` and friends.
const ATTRIBUTE: &str = r"(?:(?:_*(?:attribute|ATTRIBUTE)_*(?:\s*\(\([^)]+\)\)|\w+))|weak_function)";

static COMPOSITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:struct|union|enum)\s*(?P<name>\w*)\s*\{").unwrap());

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>\w+)\s*(?:\[[^\]]*\])?\s*(?:\S*attribute[\s\w()]+)?\s*=").unwrap()
});

static FUNCTION_POINTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\*(?P<name>\w+)\)\s*\([^)]+\);").unwrap());

static FORWARD_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?P<name>\w+)\s*\([^;]+\)\s*{ATTRIBUTE}*;")).unwrap()
});

static FUNCTION_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{ATTRIBUTE}*\s*(?P<name>\w+)\s*\([^(][^{{]+\)\s*\{{")).unwrap()
});

static BARE_MACRO_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<name>\w+)\s*\(\w+(?:\s*,\s*[\w.]+)*\)\s*$").unwrap()
});

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?P<name>\w+)(?:\[\w+\])?\s*{ATTRIBUTE}?;")).unwrap()
});

/// How much input a rule swallows once its pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consume {
    /// The buffer alone is the entity.
    Immediate,
    /// Pull lines until `{` and `}` balance.
    BraceBalanced,
    /// Pull lines until a `;` has been seen.
    UntilTerminator,
}

struct Rule {
    kind: BlockKind,
    pattern: &'static Lazy<Regex>,
    consume: Consume,
}

static RULES: &[Rule] = &[
    Rule {
        kind: BlockKind::CompositeType,
        pattern: &COMPOSITE,
        consume: Consume::BraceBalanced,
    },
    Rule {
        kind: BlockKind::StaticAssignment,
        pattern: &ASSIGNMENT,
        consume: Consume::UntilTerminator,
    },
    Rule {
        kind: BlockKind::Declaration,
        pattern: &FUNCTION_POINTER,
        consume: Consume::Immediate,
    },
    Rule {
        kind: BlockKind::FunctionForwardDeclaration,
        pattern: &FORWARD_DECLARATION,
        consume: Consume::Immediate,
    },
    Rule {
        kind: BlockKind::FunctionDefinition,
        pattern: &FUNCTION_DEFINITION,
        consume: Consume::BraceBalanced,
    },
    Rule {
        kind: BlockKind::BareMacroInvocation,
        pattern: &BARE_MACRO_CALL,
        consume: Consume::Immediate,
    },
    Rule {
        kind: BlockKind::Declaration,
        pattern: &DECLARATION,
        consume: Consume::Immediate,
    },
];

/// A recognised entity and how many lines after the buffer it swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Classified {
    pub kind: BlockKind,
    pub name: String,
    pub raw_text: String,
    pub consumed: usize,
}

/// Try every rule against `buffer`; `rest` holds the unread lines a
/// brace- or terminator-seeking rule may pull in.
pub(crate) fn classify(buffer: &str, rest: &[String]) -> Option<Classified> {
    RULES.iter().find_map(|rule| {
        let caps = rule.pattern.captures(buffer)?;
        let name = caps
            .name("name")
            .map(|m| m.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_owned();
        let (raw_text, consumed) = extend(rule.consume, buffer, rest);
        Some(Classified {
            kind: rule.kind,
            name,
            raw_text,
            consumed,
        })
    })
}

fn extend(consume: Consume, buffer: &str, rest: &[String]) -> (String, usize) {
    let mut text = buffer.to_owned();
    let mut consumed = 0;
    match consume {
        Consume::Immediate => {}
        Consume::BraceBalanced => {
            let mut depth = brace_delta(&text);
            while depth > 0 && consumed < rest.len() {
                let line = &rest[consumed];
                text.push(' ');
                text.push_str(line);
                depth += brace_delta(line);
                consumed += 1;
            }
        }
        Consume::UntilTerminator => {
            while !text.contains(';') && consumed < rest.len() {
                text.push(' ');
                text.push_str(&rest[consumed]);
                consumed += 1;
            }
        }
    }
    (text, consumed)
}

fn brace_delta(text: &str) -> i64 {
    text.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}
