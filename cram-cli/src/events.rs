use std::{collections::HashSet, fmt::Display};

use tracing_subscriber::{
    Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Type of event to trace.
#[derive(Clone, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum TraceEvent {
    /// Traces the search for test files.
    #[clap(name = "discovery")]
    Discovery,
    /// Traces shell sessions.
    #[clap(name = "session")]
    Session,
    /// Traces comparison of expected and actual output.
    #[clap(name = "diff")]
    Diff,
    /// Traces `(re)` and `(glob)` pattern matching.
    #[clap(name = "pattern")]
    Pattern,
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Session => write!(f, "session"),
            Self::Diff => write!(f, "diff"),
            Self::Pattern => write!(f, "pattern"),
        }
    }
}

impl TraceEvent {
    /// Returns the tracing targets covered by this event class.
    const fn targets(&self) -> &'static [&'static str] {
        match self {
            Self::Discovery => &["discovery"],
            Self::Session => &["session"],
            Self::Diff => &["diff"],
            Self::Pattern => &["pattern"],
        }
    }
}

#[derive(Default)]
pub(crate) struct TraceEventConfig {
    enabled_trace_events: HashSet<TraceEvent>,
}

impl TraceEventConfig {
    /// Installs a subscriber logging to stderr. Events of the given classes are
    /// logged at debug level; everything else at info level.
    pub fn init(enabled_trace_events: &[TraceEvent]) -> Self {
        let config = Self {
            enabled_trace_events: enabled_trace_events.iter().cloned().collect(),
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(config.compose_filter());

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            // Something went wrong; proceed on anyway but complain audibly.
            eprintln!("warning: failed to initialize tracing.");
        }

        config
    }

    fn compose_filter(&self) -> Targets {
        let mut filter =
            Targets::new().with_default(tracing_subscriber::filter::LevelFilter::INFO);

        for event in &self.enabled_trace_events {
            filter = filter.with_targets(
                event
                    .targets()
                    .iter()
                    .map(|target| (*target, tracing::Level::DEBUG)),
            );
        }

        filter
    }
}
