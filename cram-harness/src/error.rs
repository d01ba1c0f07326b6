use std::path::PathBuf;

/// Monolithic error type for the test harness.
///
/// Only failures that affect the whole run are represented here; anything local
/// to a single test (unexpected output, a non-zero exit code, a malformed pattern)
/// is folded into that test's verdict instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The shell used to run a test file could not be started.
    #[error("failed to start shell {shell}: {source}")]
    SubprocessSpawn {
        /// Path of the shell that was being spawned.
        shell: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A path named on the command line does not exist.
    #[error("no such file: {0}")]
    NoSuchFile(PathBuf),

    /// An error occurred while walking a directory of tests.
    #[error("failed to walk test directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A background task driving a shell session failed.
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The run was interrupted.
    #[error("interrupted")]
    Interrupted,

    /// An I/O error occurred.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
