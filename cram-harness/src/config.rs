//! Configuration types for the test harness.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default shell used to run test files.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Variables reset to well-known values unless sterilization is disabled.
const STERILE_VARS: &[(&str, &str)] = &[
    ("LANG", "C"),
    ("LC_ALL", "C"),
    ("LANGUAGE", "C"),
    ("TZ", "GMT"),
    ("CDPATH", ""),
    ("COLUMNS", "80"),
    ("GREP_OPTIONS", ""),
];

/// Configuration for the shell that runs a test file.
///
/// The shell inherits the harness's own environment; `env` is applied on top of
/// it at spawn time and never written back into the harness process.
#[derive(Clone, Debug)]
pub struct ShellConfig {
    /// Path to the shell.
    pub shell: PathBuf,
    /// Arguments passed to the shell. The script is always fed through stdin.
    pub args: Vec<String>,
    /// Variables overlaid on the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellConfig {
    /// Creates a config for the given shell, reading its script from stdin.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            args: vec![String::from("-")],
            env: BTreeMap::new(),
        }
    }

    /// Sets a variable in the environment overlay.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Resets locale, timezone and a few other variables known to perturb the
    /// output of common tools.
    #[must_use]
    pub fn sterilized(mut self) -> Self {
        for (name, value) in STERILE_VARS {
            self.env.insert((*name).to_owned(), (*value).to_owned());
        }
        self
    }

    /// Exposes the harness's temporary directories to the shell: `CRAMTMP` names
    /// the base directory and `TMPDIR`, `TEMP` and `TMP` its `tmp` child.
    #[must_use]
    pub fn with_temp_dirs(self, base_dir: &Path, proc_tmp_dir: &Path) -> Self {
        let proc_tmp = proc_tmp_dir.to_string_lossy().to_string();

        self.with_var("CRAMTMP", base_dir.to_string_lossy())
            .with_var("TMPDIR", proc_tmp.as_str())
            .with_var("TEMP", proc_tmp.as_str())
            .with_var("TMP", proc_tmp)
    }

    /// Derives the config for one test file, adding `TESTDIR`.
    ///
    /// # Arguments
    ///
    /// * `test_path` - Absolute path of the test file.
    #[must_use]
    pub fn for_test(&self, test_path: &Path) -> Self {
        let test_dir = test_path.parent().unwrap_or_else(|| Path::new("/"));
        self.clone()
            .with_var("TESTDIR", test_dir.to_string_lossy())
    }

    /// Builds the command that starts a session in the given working directory.
    pub(crate) fn command(&self, working_dir: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.args(&self.args)
            .envs(&self.env)
            .current_dir(working_dir);
        cmd
    }
}

/// Answer given automatically to every interactive prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoAnswer {
    /// Accept every change.
    Yes,
    /// Reject every change.
    No,
}

/// Configuration for the test runner.
#[derive(Clone, Debug, Default)]
pub struct RunnerConfig {
    /// Don't print diffs.
    pub quiet: bool,
    /// Print file names and test status.
    pub verbose: bool,
    /// Offer to merge changed output back into failing tests.
    pub interactive: bool,
    /// Answer prompts automatically instead of reading the input stream.
    pub answer: Option<AutoAnswer>,
    /// Keep temporary directories after the run.
    pub keep_tmpdir: bool,
    /// Reset common environment variables before running tests.
    pub sterilize: bool,
    /// The shell to run tests with.
    pub shell: ShellConfig,
}

impl RunnerConfig {
    /// Creates a runner config with default values; the environment is sterilized.
    pub fn new(shell: ShellConfig) -> Self {
        Self {
            sterilize: true,
            shell,
            ..Self::default()
        }
    }

    /// Sets whether diffs are suppressed.
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Sets whether file names and statuses are printed.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets whether failing tests offer to merge their output.
    #[must_use]
    pub const fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Sets the automatic prompt answer.
    #[must_use]
    pub const fn with_answer(mut self, answer: Option<AutoAnswer>) -> Self {
        self.answer = answer;
        self
    }

    /// Sets whether temporary directories are retained.
    #[must_use]
    pub const fn with_keep_tmpdir(mut self, keep_tmpdir: bool) -> Self {
        self.keep_tmpdir = keep_tmpdir;
        self
    }

    /// Sets whether the environment is sterilized.
    #[must_use]
    pub const fn with_sterilize(mut self, sterilize: bool) -> Self {
        self.sterilize = sterilize;
        self
    }

    /// Returns the shell config every test starts from, before temporary
    /// directories and `TESTDIR` are added.
    pub fn base_shell_config(&self) -> ShellConfig {
        if self.sterilize {
            self.shell.clone().sterilized()
        } else {
            self.shell.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_shell_reads_stdin() {
        let config = ShellConfig::default();
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.args, ["-"]);
        assert!(config.env.is_empty());
    }

    #[test]
    fn sterilization_is_opt_out() {
        let config = RunnerConfig::new(ShellConfig::default());
        let env = config.base_shell_config().env;
        assert_eq!(env.get("LANG").map(String::as_str), Some("C"));
        assert_eq!(env.get("TZ").map(String::as_str), Some("GMT"));
        assert_eq!(env.get("CDPATH").map(String::as_str), Some(""));
        assert_eq!(env.get("COLUMNS").map(String::as_str), Some("80"));

        let config = config.with_sterilize(false);
        assert!(config.base_shell_config().env.is_empty());
    }

    #[test]
    fn per_test_config() {
        let base = ShellConfig::default()
            .with_temp_dirs(Path::new("/tmp/cramtests-x"), Path::new("/tmp/cramtests-x/tmp"));
        let config = base.for_test(Path::new("/src/tests/basic.t"));

        assert_eq!(
            config.env.get("TESTDIR").map(String::as_str),
            Some("/src/tests")
        );
        assert_eq!(
            config.env.get("CRAMTMP").map(String::as_str),
            Some("/tmp/cramtests-x")
        );
        for name in ["TMPDIR", "TEMP", "TMP"] {
            assert_eq!(
                config.env.get(name).map(String::as_str),
                Some("/tmp/cramtests-x/tmp")
            );
        }

        // The base config is left untouched.
        assert!(!base.env.contains_key("TESTDIR"));
    }
}
