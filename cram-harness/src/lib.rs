//! Engine for running shell transcript tests.
//!
//! A test file interleaves indented shell commands (`  $ `, continued by `  > `),
//! the output they are expected to produce (any other line indented by two
//! spaces) and free-form commentary. Running a test feeds all of its commands to
//! a single shell session, rebuilds the transcript the file *should* have had
//! from the session's output, and diffs it against the file. Expected output may
//! use `(re)` and `(glob)` tagged lines to match varying output.
//!
//! The main entry points are [`TestRunner`] for running a set of test files with
//! reporting, and [`TestCase`] for running a single file.

#![cfg(any(unix, windows))]

pub mod comparison;
mod config;
pub mod discovery;
mod error;
pub mod execution;
pub mod pattern;
pub mod prompt;
mod reporting;
mod runner;
mod testcase;
pub mod util;

pub use comparison::{DiffBlock, DiffResult, DiffTag, Hunk, UnifiedLine, diff, diff_with_context};
pub use config::{AutoAnswer, DEFAULT_SHELL, RunnerConfig, ShellConfig};
pub use error::Error;
pub use execution::{Sentinel, SessionOutput, reconstruct, run_session};
pub use reporting::{Reporter, RunSummary, write_diff};
pub use runner::{TEMP_DIR_PREFIX, TestRunner};
pub use testcase::{
    CommandGroup, LineKind, SkipReason, TestCase, TestFile, Transcript, Verdict,
};
