use clap::{Parser, builder::styling};
use cram_harness::{AutoAnswer, DEFAULT_SHELL, RunnerConfig, ShellConfig};
use std::path::PathBuf;

use crate::{events, productinfo};

const SHORT_DESCRIPTION: &str = "Functional testing framework for command line applications";

const LONG_DESCRIPTION: &str = r"
cram runs shell transcript tests. A test file (*.t) mixes indented shell commands
with the output they are expected to produce; each file's commands run in a single
shell session and the actual output is compared against the file.

Failing tests leave their actual output next to them in a .err file.
";

/// Usage line shown when no tests are named.
pub const USAGE: &str = "cram [OPTIONS] TESTS...";

/// Parsed command-line arguments for cram.
#[derive(Parser, Debug)]
#[clap(name = productinfo::PRODUCT_NAME,
       version = productinfo::PRODUCT_VERSION,
       about = SHORT_DESCRIPTION,
       long_about = LONG_DESCRIPTION,
       override_usage = USAGE,
       disable_help_flag = true,
       disable_version_flag = true,
       styles = cram_help_styles())]
#[allow(clippy::module_name_repetitions)]
pub struct CommandLineArgs {
    /// Display usage information.
    #[clap(short = 'h', long = "help", action = clap::ArgAction::Help)]
    pub help: Option<bool>,

    /// Display version.
    #[clap(long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// Don't print diffs.
    #[clap(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Show filenames and test status.
    #[clap(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Interactively merge changed test output.
    #[clap(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Answer yes to all questions.
    #[clap(short = 'y', long = "yes")]
    pub yes: bool,

    /// Answer no to all questions.
    #[clap(short = 'n', long = "no")]
    pub no: bool,

    /// Keep temporary directories.
    #[clap(long = "keep-tmpdir")]
    pub keep_tmpdir: bool,

    /// Don't reset common environment variables.
    #[clap(short = 'E')]
    pub preserve_env: bool,

    /// Shell to run tests with.
    #[clap(long = "shell", value_name = "PATH", default_value = DEFAULT_SHELL)]
    pub shell: PathBuf,

    /// Colorize diffs.
    #[clap(long = "color", value_name = "WHEN", default_value_t = clap::ColorChoice::Auto)]
    pub color: clap::ColorChoice,

    /// Enable debug logging for classes of tracing events.
    #[clap(long = "debug", value_name = "EVENT")]
    pub enabled_debug_events: Vec<events::TraceEvent>,

    /// Test files or directories of test files.
    #[clap(value_name = "TESTS")]
    pub tests: Vec<PathBuf>,
}

impl CommandLineArgs {
    /// Returns the first pair of given options that can't be combined.
    pub fn conflicting_options(&self) -> Option<(&'static str, &'static str)> {
        [
            ("-y", self.yes, "-n", self.no),
            ("-q", self.quiet, "-v", self.verbose),
            ("-q", self.quiet, "-i", self.interactive),
        ]
        .into_iter()
        .find(|(_, first, _, second)| *first && *second)
        .map(|(first, _, second, _)| (first, second))
    }

    /// Returns the answer to give to every prompt, if any.
    pub const fn answer(&self) -> Option<AutoAnswer> {
        if self.yes {
            Some(AutoAnswer::Yes)
        } else if self.no {
            Some(AutoAnswer::No)
        } else {
            None
        }
    }

    /// Builds the runner configuration these arguments describe.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::new(ShellConfig::new(&self.shell))
            .with_quiet(self.quiet)
            .with_verbose(self.verbose)
            .with_interactive(self.interactive)
            .with_answer(self.answer())
            .with_keep_tmpdir(self.keep_tmpdir)
            .with_sterilize(!self.preserve_env)
    }
}

/// Returns clap styling to be used for command-line help.
#[doc(hidden)]
fn cram_help_styles() -> clap::builder::Styles {
    styling::Styles::styled()
        .header(
            styling::AnsiColor::Yellow.on_default()
                | styling::Effects::BOLD
                | styling::Effects::UNDERLINE,
        )
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Magenta.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}
