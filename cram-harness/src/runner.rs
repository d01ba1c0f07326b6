//! Test runner implementation.

use crate::config::{RunnerConfig, ShellConfig};
use crate::discovery;
use crate::error::Error;
use crate::prompt;
use crate::reporting::{Reporter, RunSummary};
use crate::testcase::{SkipReason, TestCase, Verdict};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufRead;

/// Prefix of the base temporary directory created for a run.
pub const TEMP_DIR_PREFIX: &str = "cramtests-";

/// The main test runner.
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    /// Creates a new test runner with the given configuration.
    pub const fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runs the tests found under the given paths, one at a time.
    ///
    /// Progress, diffs and the closing summary go to `output`; answers to
    /// interactive prompts are read from `input`. Interrupting the process stops
    /// the run with [`Error::Interrupted`], killing the shell of the test in
    /// progress or abandoning a pending prompt.
    ///
    /// # Arguments
    ///
    /// * `paths` - Test files and directories of test files.
    /// * `output` - Stream to report to.
    /// * `input` - Stream to read prompt answers from.
    #[allow(clippy::future_not_send)]
    pub async fn run<P, W, R>(&self, paths: &[P], output: W, mut input: R) -> Result<RunSummary, Error>
    where
        P: AsRef<Path>,
        W: Write,
        R: AsyncBufRead + Unpin,
    {
        let tests = discovery::find_tests(paths)?;

        let base_dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()?;
        let base_path = base_dir.path().to_path_buf();
        if self.config.keep_tmpdir {
            // Retained on every exit path from here on, interrupts included.
            let _ = base_dir.keep();
        }

        let proc_tmp_dir = base_path.join("tmp");
        std::fs::create_dir(&proc_tmp_dir)?;

        let shell_config = self
            .config
            .base_shell_config()
            .with_temp_dirs(&base_path, &proc_tmp_dir);

        let mut reporter = Reporter::new(output, self.config.quiet, self.config.verbose);

        tokio::select! {
            result = self.run_tests(&tests, &shell_config, &base_path, &mut reporter, &mut input) => result,
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::debug!(target: "session", "interrupted");
                Err(Error::Interrupted)
            }
        }
    }

    #[allow(clippy::future_not_send)]
    async fn run_tests<W: Write, R: AsyncBufRead + Unpin>(
        &self,
        tests: &[PathBuf],
        shell_config: &ShellConfig,
        base_dir: &Path,
        reporter: &mut Reporter<W>,
        input: &mut R,
    ) -> Result<RunSummary, Error> {
        let mut summary = RunSummary::default();

        for path in tests {
            let test = TestCase::new(path);
            reporter.test_started(path)?;

            let verdict = if test.is_empty()? {
                Verdict::Skipped(SkipReason::Empty)
            } else {
                self.execute_in_own_dir(&test, shell_config, base_dir)
                    .await?
            };

            reporter.test_finished(&verdict)?;

            if let Verdict::Failed { diff, .. } = &verdict {
                reporter.test_diff(diff, &test.absolute_path()?)?;

                if self.config.interactive
                    && !self.config.quiet
                    && prompt::confirm_accept(input, reporter.writer(), self.config.answer).await?
                {
                    test.accept()?;
                    reporter.test_merged(path)?;
                }
            }

            summary.record(&verdict);
        }

        reporter.summary(&summary)?;

        Ok(summary)
    }

    async fn execute_in_own_dir(
        &self,
        test: &TestCase,
        shell_config: &ShellConfig,
        base_dir: &Path,
    ) -> Result<Verdict, Error> {
        let working_dir = create_working_dir(base_dir, test.path())?;

        let result = test.execute(shell_config, &working_dir).await;

        if !self.config.keep_tmpdir {
            std::fs::remove_dir_all(&working_dir)?;
        }

        result
    }
}

/// Creates a fresh directory under `base_dir` named after the test file,
/// appending a numeric suffix if the name is taken.
fn create_working_dir(base_dir: &Path, test_path: &Path) -> Result<PathBuf, Error> {
    let name = test_path
        .file_name()
        .map_or_else(|| String::from("test"), |name| name.to_string_lossy().to_string());

    let mut candidate = base_dir.join(&name);
    let mut suffix = 1;
    loop {
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = base_dir.join(std::format!("{name}-{suffix}"));
                suffix += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
