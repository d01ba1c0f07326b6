//! Execution of a test file's commands in a single shell session.
//!
//! All commands of a test file are fed to one shell through its stdin. Before
//! each command, and once more after the last one, the shell is asked to echo a
//! sentinel line carrying a per-session salt, the command's index and the exit
//! code of whatever ran before it. Output and sentinels arrive interleaved on a
//! single pipe, from which the actual transcript is rebuilt.

use crate::config::ShellConfig;
use crate::error::Error;
use crate::testcase::Transcript;
use crate::util;
use std::io::Read;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

/// Delimiter the shell echoes between commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentinel {
    salt: String,
}

/// A sentinel observed in shell output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SentinelMark {
    /// Index of the command about to run, or the command count for the final
    /// sentinel.
    pub index: usize,
    /// Exit code of the preceding command.
    pub exit_code: i32,
}

impl Sentinel {
    /// Creates a sentinel salted with the current wall-clock time.
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Self::with_salt(std::format!(
            "CRAM{}.{:06}",
            now.as_secs(),
            now.subsec_micros()
        ))
    }

    /// Creates a sentinel with a fixed salt.
    pub fn with_salt(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Returns the salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Returns the shell statement announcing the command at `index`.
    ///
    /// The echoed text starts with a newline so that the sentinel always lands on
    /// a line of its own, even after output lacking a trailing newline.
    pub fn statement(&self, index: usize) -> String {
        std::format!("echo \"\n{} {index} $?\"\n", self.salt)
    }

    /// Recognizes a sentinel line of output. Lines that carry the salt but don't
    /// parse as `<salt> <index> <exit code>` are not sentinels.
    pub fn parse(&self, line: &str) -> Option<SentinelMark> {
        if !line.starts_with(self.salt.as_str()) {
            return None;
        }

        let mut fields = line.split_whitespace();
        if fields.next()? != self.salt {
            return None;
        }

        let index = fields.next()?.parse().ok()?;
        let exit_code = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }

        Some(SentinelMark { index, exit_code })
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a shell session wrote to its stdout and stderr.
#[derive(Clone, Debug)]
pub struct SessionOutput {
    /// Combined output, decoded and with line endings normalized.
    pub output: String,
    /// How the shell exited.
    pub exit_status: ExitStatus,
}

impl SessionOutput {
    /// Returns the output split into newline-terminated lines.
    pub fn lines(&self) -> Vec<String> {
        util::split_lines(&self.output)
    }
}

/// Runs a script in one shell session, capturing stdout and stderr together.
///
/// The script is written to the shell's stdin while output is drained, and stdin
/// is closed once the script is written. The shell is killed if the returned
/// future is dropped before completion.
///
/// # Arguments
///
/// * `script` - The complete script, sentinels included.
/// * `shell_config` - The shell to run and its environment.
/// * `working_dir` - The directory the shell starts in.
pub async fn run_session(
    script: &str,
    shell_config: &ShellConfig,
    working_dir: &Path,
) -> Result<SessionOutput, Error> {
    let (mut reader, writer) = os_pipe::pipe()?;

    let mut cmd = shell_config.command(working_dir);
    cmd.stdin(Stdio::piped())
        .stdout(writer.try_clone()?)
        .stderr(writer)
        .kill_on_drop(true);

    tracing::debug!(target: "session", "spawning {} in {}",
        shell_config.shell.display(), working_dir.display());

    let mut child = cmd.spawn().map_err(|source| Error::SubprocessSpawn {
        shell: shell_config.shell.clone(),
        source,
    })?;

    // The command holds the write end of the pipe; the reader won't see EOF
    // until it's gone.
    drop(cmd);

    let reader_task = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
        let mut output = vec![];
        reader.read_to_end(&mut output)?;
        Ok(output)
    });

    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(script.as_bytes()).await {
            Ok(()) => (),
            // The shell exited before consuming the whole script.
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!(target: "session", "shell closed stdin early");
            }
            Err(err) => return Err(err.into()),
        }
        drop(stdin);
    }

    let exit_status = child.wait().await?;
    let output = reader_task.await??;

    tracing::debug!(target: "session", "shell exited with {exit_status}; {} byte(s) of output",
        output.len());

    Ok(SessionOutput {
        output: util::normalize_newlines(&output),
        exit_status,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReconstructState {
    /// No sentinel seen yet; output belongs to the header region.
    AwaitingSentinel,
    /// Output belongs to the command group trailed by the given slot.
    CollectingOutput(usize),
}

impl ReconstructState {
    const fn slot(self) -> usize {
        match self {
            Self::AwaitingSentinel => 0,
            Self::CollectingOutput(slot) => slot,
        }
    }
}

/// Rebuilds the actual transcript of a test file from its session output.
///
/// Output lines are indented by two spaces. Each sentinel closes the output of
/// the preceding command: a non-zero exit code is recorded as `  [<code>]` and
/// the verbatim lines (commentary and command text) trailing that command are
/// restored after it. Output the shell produced without a final newline is
/// marked with a `%` before the line break.
///
/// # Arguments
///
/// * `output` - Lines of combined shell output.
/// * `verbatim_slots` - Verbatim test-file lines, by slot: slot 0 precedes the
///   first command and slot `k + 1` trails command `k`.
/// * `sentinel` - The sentinel used for the session.
pub fn reconstruct<S: AsRef<str>>(
    output: &[S],
    verbatim_slots: &[Vec<String>],
    sentinel: &Sentinel,
) -> Transcript {
    let slot_lines = |slot: usize| verbatim_slots.get(slot).map_or(&[][..], Vec::as_slice);

    let mut transcript = Transcript::new();
    let mut state = ReconstructState::AwaitingSentinel;

    for line in output {
        let line = line.as_ref();

        let Some(mark) = sentinel.parse(line) else {
            transcript.push(std::format!("  {line}"));
            continue;
        };

        // The sentinel's leading newline either produced a blank line of its own,
        // or it terminated output that had no newline.
        if let Some(last) = transcript.pop() {
            if last != "  \n" {
                let body = last.strip_suffix('\n').unwrap_or(&last);
                transcript.push(std::format!("{body}%\n"));
            }
        }

        if mark.exit_code != 0 {
            transcript.push(std::format!("  [{}]\n", mark.exit_code));
        }

        transcript.extend_from_slice(slot_lines(state.slot()));
        state = ReconstructState::CollectingOutput(mark.index + 1);
    }

    transcript.extend_from_slice(slot_lines(state.slot()));

    transcript
}
