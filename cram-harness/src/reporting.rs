//! Reporting of test progress and results.

use crate::comparison::{DiffResult, UnifiedLine};
use crate::testcase::{ERR_SUFFIX, Verdict};
use colored::Colorize;
use std::io::Write;
use std::path::Path;

/// Counts of tests run, skipped and failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of distinct tests encountered, including skipped ones.
    pub ran: usize,
    /// Number of skipped tests.
    pub skipped: usize,
    /// Number of failed tests.
    pub failed: usize,
}

impl RunSummary {
    /// Accounts for one test's verdict.
    pub const fn record(&mut self, verdict: &Verdict) {
        self.ran += 1;
        match verdict {
            Verdict::Passed => (),
            Verdict::Failed { .. } => self.failed += 1,
            Verdict::Skipped(_) => self.skipped += 1,
        }
    }

    /// Returns whether no test failed.
    pub const fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "# Ran {} tests, {} skipped, {} failed.",
            self.ran, self.skipped, self.failed
        )
    }
}

/// Writes progress and results to an output stream.
///
/// Without verbosity each test is reported by a single character: `.` for a
/// pass, `!` for a failure and `s` for a skipped test. With verbosity each test
/// gets a `<path>: <status>` line.
pub struct Reporter<W: Write> {
    writer: W,
    quiet: bool,
    verbose: bool,
}

impl<W: Write> Reporter<W> {
    /// Creates a reporter writing to the given stream.
    pub const fn new(writer: W, quiet: bool, verbose: bool) -> Self {
        Self {
            writer,
            quiet,
            verbose,
        }
    }

    /// Provides direct access to the underlying stream.
    pub const fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the reporter, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Announces a test about to run.
    pub fn test_started(&mut self, path: &Path) -> std::io::Result<()> {
        if self.verbose {
            write!(self.writer, "{}: ", path.display())?;
        }
        self.writer.flush()
    }

    /// Reports the status of a finished test.
    pub fn test_finished(&mut self, verdict: &Verdict) -> std::io::Result<()> {
        match (verdict, self.verbose) {
            (Verdict::Passed, true) => writeln!(self.writer, "passed")?,
            (Verdict::Passed, false) => write!(self.writer, ".")?,
            (Verdict::Failed { .. }, true) => writeln!(self.writer, "failed")?,
            (Verdict::Failed { .. }, false) => {
                write!(self.writer, "!")?;
                if !self.quiet {
                    writeln!(self.writer)?;
                }
            }
            (Verdict::Skipped(reason), true) => writeln!(self.writer, "{reason}")?,
            (Verdict::Skipped(_), false) => write!(self.writer, "s")?,
        }
        self.writer.flush()
    }

    /// Shows how a failed test's output differs, unless quiet.
    ///
    /// # Arguments
    ///
    /// * `diff` - The differences found.
    /// * `test_path` - Absolute path of the test file.
    pub fn test_diff(&mut self, diff: &DiffResult, test_path: &Path) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let from_file = test_path.to_string_lossy();
        let to_file = std::format!("{from_file}{ERR_SUFFIX}");
        write_diff(&mut self.writer, diff, &from_file, &to_file)?;
        self.writer.flush()
    }

    /// Reports that a test's output was merged back into it.
    pub fn test_merged(&mut self, path: &Path) -> std::io::Result<()> {
        if self.verbose {
            writeln!(self.writer, "{}: merged output", path.display())?;
        }
        self.writer.flush()
    }

    /// Writes the closing summary.
    pub fn summary(&mut self, summary: &RunSummary) -> std::io::Result<()> {
        if !self.verbose {
            writeln!(self.writer)?;
        }
        writeln!(self.writer, "{summary}")?;
        if !self.verbose {
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }
}

/// Writes a unified diff, coloring deletions, insertions and hunk headers when
/// color output is enabled.
pub fn write_diff(
    writer: &mut impl Write,
    diff: &DiffResult,
    from_file: &str,
    to_file: &str,
) -> std::io::Result<()> {
    for line in diff.unified(from_file, to_file) {
        let text = line.to_string();
        let formatted = match line {
            UnifiedLine::FromFile(_) | UnifiedLine::ToFile(_) => text.bold(),
            UnifiedLine::HunkHeader(_) => text.cyan(),
            UnifiedLine::Equal(_) => text.normal(),
            UnifiedLine::Delete(_) => text.red(),
            UnifiedLine::Insert(_) => text.green(),
        };

        writeln!(writer, "{formatted}")?;
    }

    Ok(())
}
