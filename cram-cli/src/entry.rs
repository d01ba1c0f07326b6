//! Implements the command-line interface for `cram`.

use crate::args::CommandLineArgs;
use crate::events;
use crate::productinfo;
use clap::{CommandFactory, Parser};
use cram_harness::{Error, TestRunner};
use std::io::IsTerminal;

/// Exit code when every test passed or was skipped.
const EXIT_SUCCESS: i32 = 0;
/// Exit code when at least one test failed, or the run hit a fatal error.
const EXIT_FAILURE: i32 = 1;
/// Exit code for invalid invocations.
const EXIT_USAGE: i32 = 2;
/// Exit code when the run was interrupted.
const EXIT_INTERRUPTED: i32 = 130;

/// Main entry point for `cram`.
pub fn run() {
    //
    // Install panic handlers to clean up on panic.
    //
    install_panic_handlers();

    //
    // Parse args.
    //
    let parsed_args = match CommandLineArgs::try_parse_from(std::env::args()) {
        Ok(parsed_args) => parsed_args,
        Err(e) => {
            let _ = e.print();

            // clap returns errors for `--help` and `--version` too.
            let exit_code = match e.kind() {
                clap::error::ErrorKind::DisplayVersion | clap::error::ErrorKind::DisplayHelp => {
                    EXIT_SUCCESS
                }
                _ => EXIT_USAGE,
            };

            std::process::exit(exit_code);
        }
    };

    //
    // Run.
    //
    let exit_code = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => {
            let exit_code = runtime.block_on(run_async(parsed_args));

            // An abandoned prompt may still have a blocking read of stdin pending.
            runtime.shutdown_background();

            exit_code
        }
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            EXIT_FAILURE
        }
    };

    std::process::exit(exit_code);
}

/// Installs panic handlers to report our panic and cleanly exit on panic.
fn install_panic_handlers() {
    //
    // On release builds, captures panic details to a temporary .toml file and
    // reports a human-readable message to the screen.
    //
    human_panic::setup_panic!(
        human_panic::Metadata::new(productinfo::PRODUCT_NAME, productinfo::PRODUCT_VERSION)
            .homepage(productinfo::PRODUCT_DISPLAY_URI)
            .support("please post a GitHub issue at https://github.com/reubeno/cram/issues/new")
    );
}

/// Runs the tests named in the given arguments. Returns the process exit code.
///
/// # Arguments
///
/// * `args` - The already-parsed command-line arguments.
#[doc(hidden)]
#[allow(clippy::future_not_send)]
async fn run_async(args: CommandLineArgs) -> i32 {
    let _trace_config = events::TraceEventConfig::init(&args.enabled_debug_events);

    if let Some((first, second)) = args.conflicting_options() {
        eprintln!("options {first} and {second} are mutually exclusive");
        return EXIT_USAGE;
    }

    if args.tests.is_empty() {
        println!("{}", CommandLineArgs::command().render_usage());
        return EXIT_USAGE;
    }

    if let Some(missing) = args.tests.iter().find(|path| !path.exists()) {
        eprintln!("no such file: {}", missing.display());
        return EXIT_USAGE;
    }

    configure_colors(args.color);

    let runner = TestRunner::new(args.runner_config());
    let result = runner
        .run(
            &args.tests,
            std::io::stdout().lock(),
            tokio::io::BufReader::new(tokio::io::stdin()),
        )
        .await;

    match result {
        Ok(summary) if summary.succeeded() => EXIT_SUCCESS,
        Ok(_) => EXIT_FAILURE,
        Err(Error::Interrupted) => EXIT_INTERRUPTED,
        Err(err) => {
            tracing::error!("error: {err:#}");
            EXIT_FAILURE
        }
    }
}

fn configure_colors(choice: clap::ColorChoice) {
    match choice {
        clap::ColorChoice::Always => colored::control::set_override(true),
        clap::ColorChoice::Never => colored::control::set_override(false),
        clap::ColorChoice::Auto => {
            if !std::io::stdout().is_terminal() {
                colored::control::set_override(false);
            }
        }
    }
}
