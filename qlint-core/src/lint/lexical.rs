//! Rules decided by a token and its immediate neighbours.

use crate::analyzer::AnnotatedToken;
use crate::diagnostic::Severity;
use crate::grammar::TokenKind;
use crate::lint::{LintConfig, LintRule};

/// Escapes allowed as `\c`.
const SIMPLE_ESCAPES: [char; 6] = ['n', 'r', 't', '\\', '/', '"'];

/// `\ddd` escapes must name a byte in this range.
const OCTAL_ESCAPES: std::ops::RangeInclusive<u32> = 100..=377;

pub(crate) struct DeprecatedDatetime;

impl LintRule for DeprecatedDatetime {
    fn name(&self) -> &'static str {
        "DEPRECATED_DATETIME"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn message(&self) -> &'static str {
        "Datetime literals are deprecated, use timestamps"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|token| token.kind() == TokenKind::Datetime)
            .collect()
    }
}

pub(crate) struct AssignReservedWord;

impl LintRule for AssignReservedWord {
    fn name(&self) -> &'static str {
        "ASSIGN_RESERVED_WORD"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Assignment to a reserved word"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|token| token.kind() == TokenKind::Keyword && token.is_assignment())
            .collect()
    }
}

pub(crate) struct InvalidAssign;

impl LintRule for InvalidAssign {
    fn name(&self) -> &'static str {
        "INVALID_ASSIGN"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Invalid assignment target"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|token| token.kind().is_literal() && token.is_assignment())
            .collect()
    }
}

pub(crate) struct InvalidEscape;

impl LintRule for InvalidEscape {
    fn name(&self) -> &'static str {
        "INVALID_ESCAPE"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Invalid escape sequence"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|token| token.kind() == TokenKind::StringEscape)
            .filter(|token| escape_units(token.text()).any(|unit| !is_valid_escape(unit)))
            .collect()
    }
}

/// Split a run of escapes into units: `\` plus three digits, or `\` plus
/// one character. The leading backslash is dropped.
fn escape_units(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let unit = rest.strip_prefix('\\')?;
        let len = if unit.len() >= 3 && unit.as_bytes()[..3].iter().all(u8::is_ascii_digit) {
            3
        } else {
            unit.chars().next()?.len_utf8()
        };
        rest = &unit[len..];
        Some(&unit[..len])
    })
}

fn is_valid_escape(unit: &str) -> bool {
    let mut chars = unit.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if SIMPLE_ESCAPES.contains(&ch) {
            return true;
        }
    }
    unit.len() == 3
        && unit
            .parse::<u32>()
            .is_ok_and(|code| OCTAL_ESCAPES.contains(&code))
}

/// `n?0w` draws without bound from a fixed seed.
pub(crate) struct FixedSeed;

impl LintRule for FixedSeed {
    fn name(&self) -> &'static str {
        "FIXED_SEED"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn message(&self) -> &'static str {
        "Drawing from an infinite range with a fixed seed"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|token| token.kind() == TokenKind::Infinity)
            .filter(|token| {
                let back = |count: usize| {
                    token
                        .index()
                        .checked_sub(count)
                        .and_then(|index| tokens.get(index))
                };
                let draw = back(1)
                    .is_some_and(|prev| prev.kind() == TokenKind::Operator && prev.text() == "?");
                draw && back(2).is_some_and(|prev| {
                    prev.kind() == TokenKind::Number
                        && number_value(prev.text()).is_some_and(|value| value >= 0.0)
                })
            })
            .collect()
    }
}

/// Numeric value of a number literal, ignoring its type suffix.
fn number_value(text: &str) -> Option<f64> {
    text.trim_end_matches(['h', 'i', 'j', 'e', 'f']).parse().ok()
}

/// Flags the first token of every line longer than the limit. Breaks
/// inside block comments and multi-line strings end lines too. The final
/// line is only checked when it is terminated.
pub(crate) struct LineLength;

impl LintRule for LineLength {
    fn name(&self) -> &'static str {
        "LINE_LENGTH"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn message(&self) -> &'static str {
        "Line exceeds the maximum length"
    }

    fn check<'a>(
        &self,
        tokens: &'a [AnnotatedToken],
        config: &LintConfig,
    ) -> Vec<&'a AnnotatedToken> {
        let mut flagged: Vec<&'a AnnotatedToken> = Vec::new();
        // token holding the start of the current line
        let mut owner: Option<&'a AnnotatedToken> = None;
        let mut previous = None;
        for token in tokens {
            let mut line_owner = *owner.get_or_insert(token);
            let mut column = token.token.position.column as usize;
            let mut chars = token.text().chars().peekable();
            while let Some(ch) = chars.next() {
                if ch == '\n' {
                    let length = if previous == Some('\r') { column.saturating_sub(1) } else { column };
                    let repeated = flagged.last().is_some_and(|last| last.index() == line_owner.index());
                    if length > config.max_line_length && !repeated {
                        flagged.push(line_owner);
                    }
                    owner = chars.peek().map(|_| token);
                    line_owner = token;
                    column = 0;
                } else {
                    column += 1;
                }
                previous = Some(ch);
            }
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::parser::parse_source;

    fn flagged(rule: &dyn LintRule, source: &str) -> Vec<String> {
        let tokens = analyze(&parse_source(source).expect("parse")).tokens;
        rule.check(&tokens, &LintConfig::default())
            .into_iter()
            .map(|token| token.text().to_string())
            .collect()
    }

    #[test]
    fn escape_units_split_runs() {
        let units: Vec<_> = escape_units("\\n\\101\\x\\12").collect();
        assert_eq!(units, vec!["n", "101", "x", "1"]);
    }

    #[test]
    fn validates_escapes() {
        for valid in ["n", "r", "t", "\\", "/", "\"", "100", "377", "189"] {
            assert!(is_valid_escape(valid), "{valid:?} should be valid");
        }
        for invalid in ["q", "0", "1", "000", "099", "378", "é"] {
            assert!(!is_valid_escape(invalid), "{invalid:?} should be invalid");
        }
    }

    #[test]
    fn flags_strings_with_any_bad_escape() {
        assert_eq!(flagged(&InvalidEscape, r#""a\n\tb""#), Vec::<String>::new());
        assert_eq!(flagged(&InvalidEscape, r#""a\n\qb""#), vec!["\\n\\q"]);
        assert_eq!(flagged(&InvalidEscape, r#""\400""#), vec!["\\400"]);
    }

    #[test]
    fn fixed_seed_needs_adjacent_draw() {
        assert_eq!(flagged(&FixedSeed, "10?0w"), vec!["0w"]);
        assert_eq!(flagged(&FixedSeed, "0?0W"), vec!["0W"]);
        assert!(flagged(&FixedSeed, "-10?0w").is_empty());
        assert!(flagged(&FixedSeed, "10 ? 0w").is_empty());
        assert!(flagged(&FixedSeed, "x?0w").is_empty());
        assert!(flagged(&FixedSeed, "10+0w").is_empty());
    }

    #[test]
    fn reads_number_values() {
        assert_eq!(number_value("10"), Some(10.0));
        assert_eq!(number_value("2.5e"), Some(2.5));
        assert_eq!(number_value("1e3"), Some(1000.0));
        assert_eq!(number_value("-3j"), Some(-3.0));
    }

    #[test]
    fn reserved_and_literal_targets() {
        assert_eq!(flagged(&AssignReservedWord, "count:3; til 3"), vec!["count"]);
        assert!(flagged(&AssignReservedWord, "a:count 3").is_empty());
        assert_eq!(flagged(&InvalidAssign, "`a:1"), vec!["`a"]);
        assert_eq!(flagged(&InvalidAssign, "x:1; 2000.01.01:x"), vec!["2000.01.01"]);
    }

    #[test]
    fn datetime_only() {
        assert_eq!(
            flagged(&DeprecatedDatetime, "(2000.01.01T00:00;2000.01.01D00:00;2000.01.01)"),
            vec!["2000.01.01T00:00"]
        );
    }

    #[test]
    fn unterminated_last_line_is_not_measured() {
        let long = "a".repeat(250);
        assert!(flagged(&LineLength, &long).is_empty());
        assert_eq!(flagged(&LineLength, &format!("{long}\r\n")), vec![long.clone()]);
    }

    #[test]
    fn reports_the_first_token_of_the_line() {
        let source = format!("x: {}\ny:1\n", "1 ".repeat(120));
        assert_eq!(flagged(&LineLength, &source), vec!["x"]);
    }

    #[test]
    fn measures_lines_inside_block_comments() {
        let long = "a".repeat(300);
        let source = format!("/\n{long}\n\\\n");
        assert_eq!(flagged(&LineLength, &source), vec![format!("/\n{long}\n\\")]);
        assert!(flagged(&LineLength, "/\nshort\n\\\n").is_empty());
    }

    #[test]
    fn measures_lines_inside_strings() {
        let long = "a".repeat(300);
        let source = format!("s:\"{long}\n\"\n");
        assert_eq!(flagged(&LineLength, &source), vec!["s"]);
        let source = format!("s:\"ok\n{long}\"\n");
        assert_eq!(flagged(&LineLength, &source), vec![format!("ok\n{long}")]);
        let source = format!("s:\"ok\n{long}\nok\"\n");
        assert_eq!(flagged(&LineLength, &source), vec![format!("ok\n{long}\nok")]);
    }
}
