//! Matching of expected-output lines tagged as regular expressions or globs.

use std::borrow::Cow;

/// Suffix marking an expected-output line as a regular expression.
pub const REGEX_TAG: &str = " (re)";

/// Suffix marking an expected-output line as a glob.
pub const GLOB_TAG: &str = " (glob)";

/// The kind of pattern carried by an expected-output line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternKind {
    /// A regular expression.
    Regex,
    /// A glob supporting only `*` and `?`, with backslash escapes.
    Glob,
}

/// An expected-output line that carries a pattern tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternLine<'a> {
    /// What kind of pattern this is.
    pub kind: PatternKind,
    /// The pattern text, with the tag and the line terminator removed.
    pub pattern: &'a str,
}

impl<'a> PatternLine<'a> {
    /// Splits a tagged line into its pattern kind and text. Returns `None` for
    /// lines without a tag.
    ///
    /// # Arguments
    ///
    /// * `line` - The expected line, optionally newline-terminated.
    pub fn parse(line: &'a str) -> Option<Self> {
        let body = line.strip_suffix('\n').unwrap_or(line);

        if let Some(pattern) = body.strip_suffix(REGEX_TAG) {
            Some(Self {
                kind: PatternKind::Regex,
                pattern,
            })
        } else {
            body.strip_suffix(GLOB_TAG).map(|pattern| Self {
                kind: PatternKind::Glob,
                pattern,
            })
        }
    }

    /// Checks whether the given actual line matches this pattern.
    ///
    /// The match must begin at the start of `actual`. The pattern is extended with
    /// a newline and `actual` is expected to keep its own, which in practice makes
    /// plain patterns match whole lines. Patterns that fail to compile never match.
    pub fn matches(&self, actual: &str) -> bool {
        let mut regex_str = String::from("(?m)");
        regex_str.push_str(self.to_regex_str().as_ref());
        regex_str.push('\n');

        let re = match compile_regex(regex_str) {
            Ok(re) => re,
            Err(err) => {
                tracing::debug!(target: "pattern", "pattern '{}' does not compile: {err}", self.pattern);
                return false;
            }
        };

        match re.find(actual) {
            Ok(found) => found.is_some_and(|m| m.start() == 0),
            Err(err) => {
                tracing::debug!(target: "pattern", "failed to evaluate pattern '{}': {err}", self.pattern);
                false
            }
        }
    }

    fn to_regex_str(&self) -> Cow<'a, str> {
        match self.kind {
            PatternKind::Regex => Cow::Borrowed(self.pattern),
            PatternKind::Glob => Cow::Owned(glob_to_regex_str(self.pattern)),
        }
    }
}

/// Returns whether the given expected line carries a pattern tag.
pub fn is_pattern_line(line: &str) -> bool {
    PatternLine::parse(line).is_some()
}

/// Checks whether a tagged expected line accepts the given actual line. Lines
/// without a tag never match here; literal comparison is the caller's business.
///
/// # Arguments
///
/// * `expected` - The expected line, including its tag.
/// * `actual` - The observed line.
pub fn matches(expected: &str, actual: &str) -> bool {
    PatternLine::parse(expected).is_some_and(|pattern| pattern.matches(actual))
}

#[allow(clippy::needless_pass_by_value)]
#[cached::proc_macro::cached(size = 64, result = true)]
fn compile_regex(regex_str: String) -> Result<fancy_regex::Regex, fancy_regex::Error> {
    fancy_regex::Regex::new(regex_str.as_str())
}

/// Translates a glob into an equivalent (unanchored) regular expression.
pub fn glob_to_regex_str(glob: &str) -> String {
    let mut result = String::new();
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&escaped @ ('*' | '?' | '\\')) => {
                    chars.next();
                    result.push('\\');
                    result.push(escaped);
                }
                // A trailing or unrecognized escape is just a backslash.
                _ => push_literal(&mut result, c),
            },
            '*' => result.push_str(".*"),
            '?' => result.push('.'),
            c => push_literal(&mut result, c),
        }
    }

    result
}

fn push_literal(result: &mut String, c: char) {
    if regex_char_is_special(c) {
        result.push('\\');
    }
    result.push(c);
}

const fn regex_char_is_special(c: char) -> bool {
    matches!(
        c,
        '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '#'
    )
}
