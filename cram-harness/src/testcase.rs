//! Test files and their execution.

use crate::comparison::{self, DiffResult};
use crate::config::ShellConfig;
use crate::error::Error;
use crate::execution::{self, Sentinel};
use crate::util;
use std::path::{Path, PathBuf};

/// Lines of a test file, or of the output that a test file should have had. Each
/// line keeps its trailing newline, if any.
pub type Transcript = Vec<String>;

/// Marker starting a command line.
pub const COMMAND_PREFIX: &str = "  $ ";

/// Marker starting a continuation line of a multi-line command.
pub const CONTINUATION_PREFIX: &str = "  > ";

/// Indentation shared by commands, continuations and output.
pub const OUTPUT_INDENT: &str = "  ";

/// Suffix appended to a test's path to name its actual output.
pub const ERR_SUFFIX: &str = ".err";

/// Classification of a test-file line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Starts a new command.
    Command,
    /// Continues the current command.
    Continuation,
    /// Expected output of the current command.
    Output,
    /// Anything else; kept verbatim but never compared as output.
    Commentary,
}

impl LineKind {
    /// Classifies a test-file line.
    pub fn classify(line: &str) -> Self {
        split_marker(line).0
    }
}

/// Classifies a line, returning along with its kind the shell input it carries
/// (if it is a command or continuation) or the whole line.
fn split_marker(line: &str) -> (LineKind, &str) {
    if let Some(command) = line.strip_prefix(COMMAND_PREFIX) {
        (LineKind::Command, command)
    } else if let Some(continuation) = line.strip_prefix(CONTINUATION_PREFIX) {
        (LineKind::Continuation, continuation)
    } else if line.starts_with(OUTPUT_INDENT) {
        (LineKind::Output, line)
    } else {
        (LineKind::Commentary, line)
    }
}

/// A command of a test file together with the output expected from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandGroup {
    /// Ordinal of the command within its file.
    pub index: usize,
    /// 1-based line number of the command line.
    pub line_number: usize,
    /// Shell input, with markers stripped; one line per command or continuation
    /// line.
    pub command: String,
    /// Expected output lines, as they appear in the file.
    pub expected_output: Vec<String>,
    /// Exit code declared by a `  [<code>]` output line.
    pub expected_exit_code: Option<i32>,
}

impl CommandGroup {
    /// Returns the exit code the command is expected to finish with.
    pub fn expected_exit_code(&self) -> i32 {
        self.expected_exit_code.unwrap_or(0)
    }
}

/// A parsed test file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestFile {
    /// All lines of the file.
    pub lines: Transcript,
    /// The file's commands, in order.
    pub groups: Vec<CommandGroup>,
    /// Lines that reappear verbatim in the actual transcript, by slot. Slot 0
    /// precedes the first command and slot `k + 1` trails command `k`; a command
    /// line (and its continuations) trails the previous command.
    pub verbatim_slots: Vec<Vec<String>>,
}

impl TestFile {
    /// Parses test-file text.
    pub fn parse(content: &str) -> Self {
        let lines = util::split_lines(content);

        let mut groups: Vec<CommandGroup> = vec![];
        let mut verbatim_slots: Vec<Vec<String>> = vec![vec![]];

        for (i, line) in lines.iter().enumerate() {
            let (kind, text) = split_marker(line);
            match kind {
                LineKind::Command => {
                    push_verbatim(&mut verbatim_slots, groups.len(), line);
                    groups.push(CommandGroup {
                        index: groups.len(),
                        line_number: i + 1,
                        command: text.to_owned(),
                        expected_output: vec![],
                        expected_exit_code: None,
                    });
                    verbatim_slots.push(vec![]);
                }
                LineKind::Continuation => match groups.last_mut() {
                    Some(group) => {
                        group.command.push_str(text);
                        push_verbatim(&mut verbatim_slots, group.index, line);
                    }
                    // Nothing to continue; keep it as plain text.
                    None => push_verbatim(&mut verbatim_slots, 0, line),
                },
                LineKind::Output => {
                    if let Some(group) = groups.last_mut() {
                        if let Some(code) = parse_exit_code(line) {
                            group.expected_exit_code = Some(code);
                        }
                        group.expected_output.push(line.clone());
                    }
                }
                LineKind::Commentary => push_verbatim(&mut verbatim_slots, groups.len(), line),
            }
        }

        Self {
            lines,
            groups,
            verbatim_slots,
        }
    }

    /// Reads and parses a test file. Invalid UTF-8 is replaced and line endings
    /// are normalized to `\n`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Ok(Self::parse(&util::normalize_newlines(&bytes)))
    }

    /// Re-emits the file's text.
    pub fn render(&self) -> String {
        self.lines.concat()
    }

    /// Builds the script that runs every command of the file, each preceded by a
    /// sentinel, with a final sentinel after the last command.
    pub fn script(&self, sentinel: &Sentinel) -> String {
        let mut script = String::new();

        for group in &self.groups {
            script.push_str(&sentinel.statement(group.index));
            script.push_str(&group.command);
            if !group.command.ends_with('\n') {
                script.push('\n');
            }
        }
        script.push_str(&sentinel.statement(self.groups.len()));

        script
    }
}

fn push_verbatim(slots: &mut [Vec<String>], slot: usize, line: &str) {
    if let Some(slot) = slots.get_mut(slot) {
        slot.push(line.to_owned());
    }
}

/// Parses an `  [<code>]` output line.
fn parse_exit_code(line: &str) -> Option<i32> {
    let body = line.strip_suffix('\n').unwrap_or(line);
    let digits = body.strip_prefix("  [")?.strip_suffix(']')?;

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// Why a test was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The test file is empty.
    Empty,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Outcome of running a test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Actual output matched the expected output.
    Passed,
    /// Actual output differed.
    Failed {
        /// How the actual transcript differs from the test file.
        diff: DiffResult,
        /// The actual transcript.
        actual: Transcript,
    },
    /// The test was not run.
    Skipped(SkipReason),
}

/// A test file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    path: PathBuf,
}

impl TestCase {
    /// Creates a test case for the file at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the test file's path, as given.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the test file's absolute, normalized path.
    pub fn absolute_path(&self) -> Result<PathBuf, Error> {
        Ok(util::normalize_path(&std::path::absolute(&self.path)?))
    }

    /// Returns the path the actual output of a failed run is written to.
    pub fn err_path(&self) -> Result<PathBuf, Error> {
        let mut err_path = self.absolute_path()?.into_os_string();
        err_path.push(ERR_SUFFIX);
        Ok(err_path.into())
    }

    /// Returns whether the test file is empty (and hence skipped).
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(std::fs::metadata(&self.path)?.len() == 0)
    }

    /// Runs the test and compares its output against the file.
    ///
    /// On failure the actual transcript is written next to the test file, with
    /// an `.err` suffix. An existing `.err` file is left alone when the test
    /// passes.
    ///
    /// # Arguments
    ///
    /// * `shell_config` - Shell and environment to run with; `TESTDIR` is added.
    /// * `working_dir` - Directory to run the test's commands in.
    pub async fn execute(
        &self,
        shell_config: &ShellConfig,
        working_dir: &Path,
    ) -> Result<Verdict, Error> {
        if self.is_empty()? {
            return Ok(Verdict::Skipped(SkipReason::Empty));
        }

        let path = self.absolute_path()?;
        let test_file = TestFile::load(&path)?;

        for group in &test_file.groups {
            tracing::debug!(target: "session", "{}:{}: {:?} expecting {} output line(s), exit code {}",
                path.display(),
                group.line_number,
                group.command.trim_end(),
                group.expected_output.len(),
                group.expected_exit_code());
        }

        let sentinel = Sentinel::new();
        let script = test_file.script(&sentinel);
        let session =
            execution::run_session(&script, &shell_config.for_test(&path), working_dir).await?;

        let actual = execution::reconstruct(
            &session.lines(),
            &test_file.verbatim_slots,
            &sentinel,
        );
        let diff = comparison::diff(&test_file.lines, &actual);

        if diff.is_empty() {
            return Ok(Verdict::Passed);
        }

        std::fs::write(self.err_path()?, actual.concat())?;

        Ok(Verdict::Failed { diff, actual })
    }

    /// Replaces the test file with the output of its last failed run.
    pub fn accept(&self) -> Result<(), Error> {
        let err_path = self.err_path()?;
        std::fs::copy(&err_path, &self.path)?;
        std::fs::remove_file(&err_path)?;
        Ok(())
    }
}
