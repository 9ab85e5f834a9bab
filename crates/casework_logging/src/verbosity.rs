use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default)]
pub enum VerbosityLevel {
    /// Only shows casework events up to [`WARN`](tracing::Level::WARN): skipped case classes,
    /// overridden fixtures, deduplicated alternatives.
    #[default]
    Default,

    /// Emits casework events up to [`INFO`](tracing::Level::INFO).
    Verbose,

    /// Emits casework events up to [`DEBUG`](tracing::Level::DEBUG), which includes every
    /// branch tree transition.
    ExtraVerbose,

    /// Enables all tracing events and uses a tree-like output format.
    Trace,
}

impl VerbosityLevel {
    /// Maps a count of `-v` style flags to a level, saturating at [`VerbosityLevel::Trace`].
    #[must_use]
    pub const fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Self::Default,
            1 => Self::Verbose,
            2 => Self::ExtraVerbose,
            _ => Self::Trace,
        }
    }

    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Default => LevelFilter::WARN,
            Self::Verbose => LevelFilter::INFO,
            Self::ExtraVerbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    #[must_use]
    pub const fn is_trace(self) -> bool {
        matches!(self, Self::Trace)
    }
}
