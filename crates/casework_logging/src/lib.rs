//! Tracing setup shared by everything that embeds casework.
//!
//! The engine itself only emits `tracing` events; whoever drives collection decides whether
//! and how to subscribe to them by calling [`setup_tracing`] once.

use std::fs::File;
use std::io::BufWriter;

use casework_static::{EnvVars, non_empty_var};
use tracing_flame::{FlameLayer, FlushGuard};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_tree::HierarchicalLayer;

mod verbosity;

pub use verbosity::VerbosityLevel;

/// Crates whose events are shown when no explicit filter is configured.
const CASEWORK_TARGETS: [&str; 3] = ["casework", "casework_core", "casework_metadata"];

#[derive(Debug, thiserror::Error)]
pub enum InitTracingError {
    #[error("invalid `{var}` directives `{directives}`: {source}")]
    InvalidFilter {
        var: &'static str,
        directives: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to create the profile file `{path}`: {source}")]
    Profile {
        path: String,
        source: tracing_flame::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Keeps the profiling output flushed until dropped.
#[must_use = "dropping the guard stops flushing the profile"]
pub struct TracingGuard {
    _flame_guard: Option<FlushGuard<BufWriter<File>>>,
}

pub fn setup_tracing(level: VerbosityLevel) -> Result<TracingGuard, InitTracingError> {
    let filter = env_filter(level)?;

    let (profiling_layer, flame_guard) = match non_empty_var(EnvVars::CASEWORK_LOG_PROFILE) {
        Some(path) => {
            let (layer, guard) = FlameLayer::with_file(&path)
                .map_err(|source| InitTracingError::Profile { path, source })?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let tree_layer = level.is_trace().then(|| {
        HierarchicalLayer::new(2)
            .with_indent_lines(true)
            .with_bracketed_fields(true)
            .with_targets(true)
            .with_writer(std::io::stderr)
    });

    let fmt_layer = (!level.is_trace()).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(level >= VerbosityLevel::ExtraVerbose)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(profiling_layer)
        .with(tree_layer)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("Tracing initialized at level {level:?}");

    Ok(TracingGuard {
        _flame_guard: flame_guard,
    })
}

fn env_filter(level: VerbosityLevel) -> Result<EnvFilter, InitTracingError> {
    if let Some(directives) = non_empty_var(EnvVars::CASEWORK_LOG) {
        return EnvFilter::builder()
            .parse(&directives)
            .map_err(|source| InitTracingError::InvalidFilter {
                var: EnvVars::CASEWORK_LOG,
                directives,
                source,
            });
    }

    let level_filter = level.level_filter();
    let mut filter = EnvFilter::default();
    for target in CASEWORK_TARGETS {
        let directive = format!("{target}={level_filter}")
            .parse::<Directive>()
            .map_err(|source| InitTracingError::InvalidFilter {
                var: EnvVars::CASEWORK_LOG,
                directives: target.to_string(),
                source,
            })?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}
