//! Source normalisation ahead of structural parsing.
//!
//! Strips block comments, joins backslash-continued lines and collapses
//! whitespace so that every remaining line is a non-empty, single-spaced
//! fragment. Directive lines are rewritten to `#keyword` form.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DIRECTIVE_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\s+").unwrap());

/// Normalise raw file lines for the parser.
///
/// An unterminated `/*` is left in place; only complete comments are removed.
///
/// # Examples
///
/// ```
/// use entlog_cparse::normalize::normalize;
///
/// let lines = ["/* header", "   comment */", "#  define   X \\", "   1", "", "int\ta;"];
/// assert_eq!(normalize(&lines), vec!["#define X 1", "int a;"]);
/// ```
pub fn normalize<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let joined = lines
        .iter()
        .map(|line| collapse(line.as_ref()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let uncommented = BLOCK_COMMENT.replace_all(&joined, "");
    let continued = uncommented.replace("\\\n", " ");

    continued
        .split('\n')
        .map(collapse)
        .filter(|line| !line.is_empty())
        .map(|line| DIRECTIVE_GAP.replace_all(&line, "#").into_owned())
        .collect()
}

fn collapse(line: &str) -> String {
    WHITESPACE.replace_all(line.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_blank_and_comment_only_lines() {
        let lines = ["", "   ", "/* only a comment */", "int a;"];
        assert_eq!(normalize(&lines), vec!["int a;"]);
    }

    #[test]
    fn multi_line_comment_joins_surrounding_code() {
        let lines = ["int a; /* starts", "still comment", "ends */ int b;"];
        assert_eq!(normalize(&lines), vec!["int a; int b;"]);
    }

    #[test]
    fn comment_between_lines_keeps_them_apart() {
        let lines = ["int a;", "/* one", "two */", "int b;"];
        assert_eq!(normalize(&lines), vec!["int a;", "int b;"]);
    }

    #[test]
    fn continuation_lines_are_joined() {
        let lines = ["#define MAX(a, b) \\", "  ((a) > (b) \\", "   ? (a) : (b))"];
        assert_eq!(
            normalize(&lines),
            vec!["#define MAX(a, b) ((a) > (b) ? (a) : (b))"]
        );
    }

    #[test]
    fn directive_spacing_is_collapsed() {
        let lines = ["#   ifdef SHARED", "# include <x.h>", "  #endif"];
        assert_eq!(
            normalize(&lines),
            vec!["#ifdef SHARED", "#include <x.h>", "#endif"]
        );
    }

    #[test]
    fn unterminated_comment_is_tolerated() {
        let lines = ["int a;", "/* never closed", "int b;"];
        assert_eq!(
            normalize(&lines),
            vec!["int a;", "/* never closed", "int b;"]
        );
    }

    #[test]
    fn form_feeds_count_as_whitespace() {
        let lines = ["\u{c}", "int\u{c} a;"];
        assert_eq!(normalize(&lines), vec!["int a;"]);
    }
}
