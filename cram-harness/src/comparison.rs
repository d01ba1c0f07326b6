//! Pattern-aware comparison of expected and actual transcripts.
//!
//! The differ is a Ratcliff/Obershelp style block matcher: it repeatedly finds the
//! longest run of lines common to a window of the expected transcript and a window
//! of the actual transcript, then recurses on the unmatched regions to either side.
//! Expected lines tagged as regular expressions or globs compare equal to the
//! actual line at the same offset of the window when the pattern accepts it. The
//! matched opcodes always refer back to the original expected lines, so a rendered
//! diff shows pattern text rather than the output it happened to match.

use crate::pattern;
use std::collections::HashMap;
use std::fmt::Display;

/// Default number of context lines surrounding each change in a hunk.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Actual transcripts at least this long ignore "popular" lines when seeding
/// matches.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Classification of a block of lines within a hunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffTag {
    /// Lines present in both transcripts.
    Equal,
    /// Lines present only in the expected transcript.
    Delete,
    /// Lines present only in the actual transcript.
    Insert,
}

/// A contiguous block of lines sharing a single tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffBlock {
    /// How these lines relate the two transcripts.
    pub tag: DiffTag,
    /// The lines themselves; for equal blocks, the expected side's lines.
    pub lines: Vec<String>,
}

/// One hunk of a unified diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line of the hunk in the expected transcript.
    pub expected_start: usize,
    /// Number of expected lines covered by the hunk.
    pub expected_len: usize,
    /// 1-based first line of the hunk in the actual transcript.
    pub actual_start: usize,
    /// Number of actual lines covered by the hunk.
    pub actual_len: usize,
    /// The blocks making up the hunk, in order.
    pub blocks: Vec<DiffBlock>,
}

impl Hunk {
    /// Returns the hunk's `@@ ... @@` header.
    pub fn header(&self) -> String {
        std::format!(
            "@@ -{},{} +{},{} @@",
            self.expected_start,
            self.expected_len,
            self.actual_start,
            self.actual_len
        )
    }
}

/// A single line of rendered unified diff output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnifiedLine {
    /// The `---` header naming the expected file.
    FromFile(String),
    /// The `+++` header naming the actual file.
    ToFile(String),
    /// A hunk's `@@` header.
    HunkHeader(String),
    /// A line common to both sides.
    Equal(String),
    /// A line only in the expected transcript.
    Delete(String),
    /// A line only in the actual transcript.
    Insert(String),
}

impl Display for UnifiedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FromFile(path) => write!(f, "--- {path}\t"),
            Self::ToFile(path) => write!(f, "+++ {path}\t"),
            Self::HunkHeader(header) => write!(f, "{header}"),
            Self::Equal(line) => write!(f, " {}", strip_newline(line)),
            Self::Delete(line) => write!(f, "-{}", strip_newline(line)),
            Self::Insert(line) => write!(f, "+{}", strip_newline(line)),
        }
    }
}

/// Result of comparing two transcripts. Empty means they match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Hunks of differences, in transcript order.
    pub hunks: Vec<Hunk>,
}

impl DiffResult {
    /// Returns whether the transcripts matched.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Renders the result as a unified diff. Nothing at all (not even the file
    /// headers) is produced for an empty result.
    ///
    /// # Arguments
    ///
    /// * `from_file` - Name to display for the expected side.
    /// * `to_file` - Name to display for the actual side.
    pub fn unified(&self, from_file: &str, to_file: &str) -> Vec<UnifiedLine> {
        if self.hunks.is_empty() {
            return vec![];
        }

        let mut rendered = vec![
            UnifiedLine::FromFile(from_file.to_owned()),
            UnifiedLine::ToFile(to_file.to_owned()),
        ];

        for hunk in &self.hunks {
            rendered.push(UnifiedLine::HunkHeader(hunk.header()));
            for block in &hunk.blocks {
                rendered.extend(block.lines.iter().map(|line| match block.tag {
                    DiffTag::Equal => UnifiedLine::Equal(line.clone()),
                    DiffTag::Delete => UnifiedLine::Delete(line.clone()),
                    DiffTag::Insert => UnifiedLine::Insert(line.clone()),
                }));
            }
        }

        rendered
    }
}

/// Compares expected against actual lines with the default amount of context.
pub fn diff(expected: &[String], actual: &[String]) -> DiffResult {
    diff_with_context(expected, actual, DEFAULT_CONTEXT_LINES)
}

/// Compares expected against actual lines, keeping `context` lines of unchanged
/// text around each change.
pub fn diff_with_context(expected: &[String], actual: &[String], context: usize) -> DiffResult {
    let matcher = SequenceMatcher::new(expected, actual);
    let groups = matcher.grouped_opcodes(context);

    tracing::debug!(target: "diff", "{} hunk(s) between {} expected and {} actual lines",
        groups.len(), expected.len(), actual.len());

    let hunks = groups
        .into_iter()
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;

            let mut blocks = vec![];
            for op in &group {
                match op.tag {
                    OpTag::Equal => {
                        blocks.push(DiffBlock {
                            tag: DiffTag::Equal,
                            lines: expected[op.i1..op.i2].to_vec(),
                        });
                    }
                    OpTag::Delete => {
                        blocks.push(DiffBlock {
                            tag: DiffTag::Delete,
                            lines: expected[op.i1..op.i2].to_vec(),
                        });
                    }
                    OpTag::Insert => {
                        blocks.push(DiffBlock {
                            tag: DiffTag::Insert,
                            lines: actual[op.j1..op.j2].to_vec(),
                        });
                    }
                    OpTag::Replace => {
                        blocks.push(DiffBlock {
                            tag: DiffTag::Delete,
                            lines: expected[op.i1..op.i2].to_vec(),
                        });
                        blocks.push(DiffBlock {
                            tag: DiffTag::Insert,
                            lines: actual[op.j1..op.j2].to_vec(),
                        });
                    }
                }
            }

            Some(Hunk {
                expected_start: first.i1 + 1,
                expected_len: last.i2 - first.i1,
                actual_start: first.j1 + 1,
                actual_len: last.j2 - first.j1,
                blocks,
            })
        })
        .collect();

    DiffResult { hunks }
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpTag {
    Equal,
    Delete,
    Insert,
    Replace,
}

/// Instruction for turning `a[i1..i2]` into `b[j1..j2]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Opcode {
    tag: OpTag,
    i1: usize,
    i2: usize,
    j1: usize,
    j2: usize,
}

impl Opcode {
    const fn new(tag: OpTag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self {
            tag,
            i1,
            i2,
            j1,
            j2,
        }
    }
}

/// `a[a..a + size]` matches `b[b..b + size]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Match {
    a: usize,
    b: usize,
    size: usize,
}

struct SequenceMatcher<'a> {
    a: &'a [String],
    b: &'a [String],
    /// Positions in `b` of each line, excluding popular lines.
    b2j: HashMap<&'a str, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [String], b: &'a [String]) -> Self {
        let mut b2j: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (j, line) in b.iter().enumerate() {
            b2j.entry(line.as_str()).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let max_occurrences = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= max_occurrences);
        }

        Self { a, b, b2j }
    }

    /// Builds the expected window as seen by the matcher: every pattern line that
    /// accepts the actual line at the same offset is replaced by that actual line.
    fn aligned_view(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Vec<&'a str> {
        let a: &'a [String] = self.a;
        let b: &'a [String] = self.b;
        let actual_window = &b[blo..bhi];

        a[alo..ahi]
            .iter()
            .enumerate()
            .map(|(offset, expected)| match actual_window.get(offset) {
                Some(actual) if pattern::matches(expected, actual) => actual.as_str(),
                _ => expected.as_str(),
            })
            .collect()
    }

    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let view = self.aligned_view(alo, ahi, blo, bhi);
        let a_at = |i: usize| view[i - alo];

        let mut best = Match {
            a: alo,
            b: blo,
            size: 0,
        };

        // Length of the longest match ending at a[i - 1] and b[j], keyed by j.
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut new_j2len = HashMap::new();

            if let Some(positions) = self.b2j.get(a_at(i)) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }

                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);

                    if k > best.size {
                        best = Match {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }

            j2len = new_j2len;
        }

        // Popular lines never seed a match, but may still extend one.
        while best.a > alo && best.b > blo && a_at(best.a - 1) == self.b[best.b - 1] {
            best.a -= 1;
            best.b -= 1;
            best.size += 1;
        }
        while best.a + best.size < ahi
            && best.b + best.size < bhi
            && a_at(best.a + best.size) == self.b[best.b + best.size]
        {
            best.size += 1;
        }

        best
    }

    fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());

        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = vec![];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }

            blocks.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
        }
        blocks.sort_unstable();

        // Collapse adjacent blocks.
        let mut collapsed = vec![];
        let mut current = Match {
            a: 0,
            b: 0,
            size: 0,
        };
        for block in blocks {
            if current.a + current.size == block.a && current.b + current.size == block.b {
                current.size += block.size;
            } else {
                if current.size > 0 {
                    collapsed.push(current);
                }
                current = block;
            }
        }
        if current.size > 0 {
            collapsed.push(current);
        }

        collapsed.push(Match {
            a: la,
            b: lb,
            size: 0,
        });

        collapsed
    }

    fn opcodes(&self) -> Vec<Opcode> {
        let (mut i, mut j) = (0, 0);
        let mut opcodes = vec![];

        for m in self.matching_blocks() {
            let tag = if i < m.a && j < m.b {
                Some(OpTag::Replace)
            } else if i < m.a {
                Some(OpTag::Delete)
            } else if j < m.b {
                Some(OpTag::Insert)
            } else {
                None
            };

            if let Some(tag) = tag {
                opcodes.push(Opcode::new(tag, i, m.a, j, m.b));
            }

            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                opcodes.push(Opcode::new(OpTag::Equal, m.a, i, m.b, j));
            }
        }

        opcodes
    }

    /// Groups opcodes into hunks with up to `n` lines of context each.
    fn grouped_opcodes(&self, n: usize) -> Vec<Vec<Opcode>> {
        let mut codes = self.opcodes();
        if codes.is_empty() {
            codes.push(Opcode::new(OpTag::Equal, 0, 1, 0, 1));
        }

        if let Some(first) = codes.first_mut() {
            if first.tag == OpTag::Equal {
                first.i1 = first.i1.max(first.i2.saturating_sub(n));
                first.j1 = first.j1.max(first.j2.saturating_sub(n));
            }
        }
        if let Some(last) = codes.last_mut() {
            if last.tag == OpTag::Equal {
                last.i2 = last.i2.min(last.i1 + n);
                last.j2 = last.j2.min(last.j1 + n);
            }
        }

        let mut groups = vec![];
        let mut group = vec![];
        for mut code in codes {
            // Split long runs of unchanged lines, keeping `n` lines on each side.
            if code.tag == OpTag::Equal && code.i2 - code.i1 > 2 * n {
                group.push(Opcode::new(
                    OpTag::Equal,
                    code.i1,
                    code.i2.min(code.i1 + n),
                    code.j1,
                    code.j2.min(code.j1 + n),
                ));
                groups.push(std::mem::take(&mut group));
                code.i1 = code.i1.max(code.i2.saturating_sub(n));
                code.j1 = code.j1.max(code.j2.saturating_sub(n));
            }
            group.push(code);
        }

        if !group.is_empty() && !(group.len() == 1 && group[0].tag == OpTag::Equal) {
            groups.push(group);
        }

        groups
    }
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|line| std::format!("{line}\n")).collect()
    }

    fn block(tag: DiffTag, text: &[&str]) -> DiffBlock {
        DiffBlock {
            tag,
            lines: lines(text),
        }
    }

    #[test]
    fn identical_transcripts_have_no_hunks() {
        let transcript = lines(&["header", "  $ echo hi", "  hi"]);
        let result = diff(&transcript, &transcript);

        assert!(result.is_empty());
        assert!(result.unified("a", "b").is_empty());
    }

    #[test]
    fn empty_transcripts_have_no_hunks() {
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn changed_output_line() -> Result<()> {
        let expected = lines(&["  $ echo hi", "  bye"]);
        let actual = lines(&["  $ echo hi", "  hi"]);

        let result = diff(&expected, &actual);
        assert_eq!(result.hunks.len(), 1);

        let hunk = result.hunks.first().ok_or_else(|| anyhow::anyhow!("no hunk"))?;
        assert_eq!(hunk.header(), "@@ -1,2 +1,2 @@");
        assert_eq!(
            hunk.blocks,
            vec![
                block(DiffTag::Equal, &["  $ echo hi"]),
                block(DiffTag::Delete, &["  bye"]),
                block(DiffTag::Insert, &["  hi"]),
            ]
        );

        Ok(())
    }

    #[test]
    fn inserted_exit_code() -> Result<()> {
        let expected = lines(&["  $ (exit 7)"]);
        let actual = lines(&["  $ (exit 7)", "  [7]"]);

        let result = diff(&expected, &actual);
        let hunk = result.hunks.first().ok_or_else(|| anyhow::anyhow!("no hunk"))?;

        assert_eq!(hunk.header(), "@@ -1,1 +1,2 @@");
        assert_eq!(
            hunk.blocks,
            vec![
                block(DiffTag::Equal, &["  $ (exit 7)"]),
                block(DiffTag::Insert, &["  [7]"]),
            ]
        );

        Ok(())
    }

    #[test]
    fn matched_patterns_compare_equal() {
        let expected = lines(&["  $ date", "  [0-9]+ (re)", "  *bar (glob)"]);
        let actual = lines(&["  $ date", "  12345", "  foobar"]);

        assert!(diff(&expected, &actual).is_empty());
    }

    #[test]
    fn diff_shows_original_pattern_lines() -> Result<()> {
        let expected = lines(&["  $ cmd", "  foo* (glob)", "  bar"]);
        let actual = lines(&["  $ cmd", "  foobar", "  baz"]);

        let result = diff(&expected, &actual);
        let hunk = result.hunks.first().ok_or_else(|| anyhow::anyhow!("no hunk"))?;

        assert_eq!(
            hunk.blocks,
            vec![
                block(DiffTag::Equal, &["  $ cmd", "  foo* (glob)"]),
                block(DiffTag::Delete, &["  bar"]),
                block(DiffTag::Insert, &["  baz"]),
            ]
        );

        Ok(())
    }

    #[test]
    fn unmatched_pattern_is_deleted_verbatim() -> Result<()> {
        let expected = lines(&["  $ cmd", "  a (glob)"]);
        let actual = lines(&["  $ cmd", "  aXYZ"]);

        let result = diff(&expected, &actual);
        let hunk = result.hunks.first().ok_or_else(|| anyhow::anyhow!("no hunk"))?;

        assert_eq!(
            hunk.blocks,
            vec![
                block(DiffTag::Equal, &["  $ cmd"]),
                block(DiffTag::Delete, &["  a (glob)"]),
                block(DiffTag::Insert, &["  aXYZ"]),
            ]
        );

        Ok(())
    }

    #[test]
    fn distant_changes_form_separate_hunks() {
        let expected: Vec<String> = (0..20).map(|i| std::format!("l{i}\n")).collect();
        let mut actual = expected.clone();
        actual[2] = String::from("changed\n");
        actual[17] = String::from("changed\n");

        let result = diff(&expected, &actual);
        let headers: Vec<_> = result.hunks.iter().map(Hunk::header).collect();

        assert_eq!(headers, ["@@ -1,6 +1,6 @@", "@@ -15,6 +15,6 @@"]);
    }

    #[test]
    fn context_is_configurable() {
        let expected = lines(&["a", "b", "c", "d", "e"]);
        let actual = lines(&["a", "b", "X", "d", "e"]);

        let result = diff_with_context(&expected, &actual, 1);
        let headers: Vec<_> = result.hunks.iter().map(Hunk::header).collect();

        assert_eq!(headers, ["@@ -2,3 +2,3 @@"]);
    }

    #[test]
    fn unified_rendering() {
        let expected = lines(&["  $ echo hi", "  bye"]);
        let actual = lines(&["  $ echo hi", "  hi"]);

        let rendered: Vec<String> = diff(&expected, &actual)
            .unified("/t/x.t", "/t/x.t.err")
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            rendered,
            [
                "--- /t/x.t\t",
                "+++ /t/x.t.err\t",
                "@@ -1,2 +1,2 @@",
                "   $ echo hi",
                "-  bye",
                "+  hi",
            ]
        );
    }

    #[test]
    fn pattern_substitution_does_not_leak_between_searches() {
        // The glob accepts the aligned line in the first search window only; the
        // later search over the tail must still see the original pattern.
        let expected = lines(&["x", "  foo* (glob)", "y", "  foo* (glob)"]);
        let actual = lines(&["x", "  foo1", "z", "  other"]);

        let result = diff(&expected, &actual);
        let rendered: Vec<String> = result
            .unified("a", "b")
            .iter()
            .map(ToString::to_string)
            .collect();

        assert!(rendered.contains(&String::from("-  foo* (glob)")));
        assert!(!rendered.iter().any(|line| line.contains("foo1") && line.starts_with('-')));
    }
}
