//! Configuration for casework: the `casework.toml` format, its resolved [`Settings`], and the
//! tag expressions used to select cases.

mod configuration_file;
pub mod filter;
pub mod options;
mod settings;

pub use configuration_file::{ConfigurationFile, ConfigurationFileError};
pub use filter::{TagFilter, TagFilterError};
pub use options::{CollisionPolicy, IdStyleName, Options, OptionsError, OptionsOverrides};
pub use settings::{CaseSettings, FixtureSettings, IdSettings, Settings};

pub const CASEWORK_CONFIG_FILE_NAME: &str = "casework.toml";
