//! Parametrization of tests with cases, lazy values and fixture unions.
//!
//! Most users only need [`Project`] to load the configuration, a [`FixtureNamespace`] to
//! register fixtures in, and [`generate_calls`] to expand a [`TestFunction`] into its calls.

mod project;

pub use casework_core::*;
pub use casework_logging::{InitTracingError, TracingGuard, VerbosityLevel, setup_tracing};
pub use casework_metadata::{
    CollisionPolicy, ConfigurationFile, IdStyleName, Options, OptionsOverrides, Settings,
    TagFilter,
};
pub use project::{Project, ProjectError};
