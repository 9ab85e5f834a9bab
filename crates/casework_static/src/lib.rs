pub struct EnvVars;

impl EnvVars {
    /// Path to a configuration file to use instead of discovering `casework.toml`.
    pub const CASEWORK_CONFIG_FILE: &'static str = "CASEWORK_CONFIG_FILE";

    /// Overrides the id style of both unions and plain parametrizations.
    ///
    /// Accepts `explicit`, `compact` or `none`.
    pub const CASEWORK_ID_STYLE: &'static str = "CASEWORK_ID_STYLE";

    /// Tracing filter directives, in the `RUST_LOG` syntax.
    pub const CASEWORK_LOG: &'static str = "CASEWORK_LOG";

    /// When set, a folded flamegraph profile of the collection is written to this path.
    pub const CASEWORK_LOG_PROFILE: &'static str = "CASEWORK_LOG_PROFILE";
}

/// Reads an environment variable, treating an empty or whitespace-only value as unset.
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn config_file_override() -> Option<String> {
    non_empty_var(EnvVars::CASEWORK_CONFIG_FILE)
}

pub fn id_style_override() -> Option<String> {
    non_empty_var(EnvVars::CASEWORK_ID_STYLE)
}
