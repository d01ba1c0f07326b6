//! Interactive questions asked on the output stream and answered on the input
//! stream.
//!
//! Replies are read asynchronously so that a caller racing the prompt against
//! an interrupt can abandon it while it waits for input.

use crate::config::AutoAnswer;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Question asked before merging a failed test's output into the test.
pub const ACCEPT_QUESTION: &str = "Accept this change?";

/// Asks a question until it receives one of the allowed answers.
///
/// Each character of `answers` is one answer; an uppercase character marks the
/// default, taken on an empty reply or at end of input. Replies are compared
/// case-insensitively and the chosen answer is returned in lowercase. An
/// automatic answer is echoed after the question instead of reading input.
///
/// # Arguments
///
/// * `input` - Stream replies are read from.
/// * `output` - Stream the question is written to.
/// * `question` - The question.
/// * `answers` - The allowed answers, e.g. `yN`.
/// * `auto` - Answer to give without reading input.
#[allow(clippy::future_not_send)]
pub async fn ask(
    input: &mut (impl AsyncBufRead + Unpin),
    output: &mut impl Write,
    question: &str,
    answers: &str,
    auto: Option<char>,
) -> std::io::Result<char> {
    let default = answers.chars().find(char::is_ascii_uppercase);

    loop {
        write!(output, "{question} [{answers}] ")?;
        output.flush()?;

        if let Some(auto) = auto {
            writeln!(output, "{auto}")?;
            output.flush()?;
            return Ok(auto.to_ascii_lowercase());
        }

        let mut reply = String::new();
        let at_eof = input.read_line(&mut reply).await? == 0;
        let reply = reply.trim().to_lowercase();

        let mut chars = reply.chars();
        match (chars.next(), chars.next()) {
            (None, _) => {
                if let Some(default) = default {
                    return Ok(default.to_ascii_lowercase());
                }
            }
            (Some(c), None) if answers.to_lowercase().contains(c) => return Ok(c),
            _ => (),
        }

        if at_eof {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no answer given",
            ));
        }
    }
}

/// Asks whether to accept a failed test's output. Declining is the default.
#[allow(clippy::future_not_send)]
pub async fn confirm_accept(
    input: &mut (impl AsyncBufRead + Unpin),
    output: &mut impl Write,
    auto: Option<AutoAnswer>,
) -> std::io::Result<bool> {
    let auto = auto.map(|answer| match answer {
        AutoAnswer::Yes => 'y',
        AutoAnswer::No => 'n',
    });

    Ok(ask(input, output, ACCEPT_QUESTION, "yN", auto).await? == 'y')
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    async fn confirm(input: &str, auto: Option<AutoAnswer>) -> Result<(bool, String)> {
        let mut output = vec![];
        let accepted = confirm_accept(&mut input.as_bytes(), &mut output, auto).await?;
        Ok((accepted, String::from_utf8(output)?))
    }

    #[tokio::test]
    async fn explicit_answers() -> Result<()> {
        assert_eq!(
            confirm("y\n", None).await?,
            (true, String::from("Accept this change? [yN] "))
        );
        assert!(confirm(" Y \n", None).await?.0);
        assert!(!confirm("n\n", None).await?.0);
        Ok(())
    }

    #[tokio::test]
    async fn default_answer() -> Result<()> {
        assert!(!confirm("\n", None).await?.0);
        assert!(!confirm("", None).await?.0);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_answers_ask_again() -> Result<()> {
        let (accepted, output) = confirm("maybe\nyn\ny\n", None).await?;
        assert!(accepted);
        assert_eq!(output, "Accept this change? [yN] ".repeat(3));
        Ok(())
    }

    #[tokio::test]
    async fn automatic_answers() -> Result<()> {
        assert_eq!(
            confirm("n\n", Some(AutoAnswer::Yes)).await?,
            (true, String::from("Accept this change? [yN] y\n"))
        );
        assert_eq!(
            confirm("y\n", Some(AutoAnswer::No)).await?,
            (false, String::from("Accept this change? [yN] n\n"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn no_default_at_eof() {
        let mut output = vec![];
        let result = ask(&mut "".as_bytes(), &mut output, "Continue?", "yn", None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn waiting_for_input_can_be_abandoned() -> Result<()> {
        // The writing half stays open, so no reply ever arrives.
        let (reader, _writer) = tokio::io::duplex(64);
        let mut input = tokio::io::BufReader::new(reader);
        let mut output = vec![];

        let abandoned = tokio::select! {
            biased;
            _ = confirm_accept(&mut input, &mut output, None) => false,
            () = std::future::ready(()) => true,
        };

        assert!(abandoned);
        assert_eq!(String::from_utf8(output)?, "Accept this change? [yN] ");

        Ok(())
    }
}
