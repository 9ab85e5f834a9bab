use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::filter::{TagFilter, TagFilterError};
use crate::settings::{CaseSettings, FixtureSettings, IdSettings, Settings};

/// The raw contents of a `casework.toml` file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    pub ids: Option<IdOptions>,
    pub cases: Option<CaseOptions>,
    pub fixtures: Option<FixtureOptions>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IdOptions {
    pub union_style: Option<IdStyleName>,
    pub param_style: Option<IdStyleName>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CaseOptions {
    pub prefix: Option<String>,
    pub class_prefix: Option<String>,
    pub glob: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FixtureOptions {
    pub on_collision: Option<CollisionPolicy>,
}

/// The built-in id styles that can be selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStyleName {
    Explicit,
    Compact,
    #[serde(alias = "nostyle")]
    None,
}

impl FromStr for IdStyleName {
    type Err = OptionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "explicit" => Ok(Self::Explicit),
            "compact" => Ok(Self::Compact),
            "none" | "nostyle" => Ok(Self::None),
            other => Err(OptionsError::UnknownIdStyle(other.to_string())),
        }
    }
}

impl fmt::Display for IdStyleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("explicit"),
            Self::Compact => f.write_str("compact"),
            Self::None => f.write_str("none"),
        }
    }
}

/// What happens when a generated fixture name is already taken in the target namespace.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `_1`, `_2`, ... until the name is free.
    #[default]
    Rename,
    /// Fail registration.
    Raise,
    /// Replace the existing fixture and emit a warning.
    Override,
}

/// Overrides that take precedence over the configuration file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptionsOverrides {
    pub id_style: Option<IdStyleName>,
    pub tags: Option<String>,
}

impl OptionsOverrides {
    pub fn from_env() -> Result<Self, OptionsError> {
        let id_style = casework_static::id_style_override()
            .map(|value| value.parse())
            .transpose()?;

        Ok(Self {
            id_style,
            tags: None,
        })
    }
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("unknown id style `{0}`, expected one of `explicit`, `compact` or `none`")]
    UnknownIdStyle(String),

    #[error("`cases.prefix` must not be empty")]
    EmptyPrefix,

    #[error("invalid `cases.tags`: {0}")]
    InvalidTags(#[from] TagFilterError),

    #[error("invalid `casework.toml`: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_settings(&self) -> Result<Settings, OptionsError> {
        self.to_settings_with(&OptionsOverrides::default())
    }

    pub fn to_settings_with(&self, overrides: &OptionsOverrides) -> Result<Settings, OptionsError> {
        let ids = self.ids.clone().unwrap_or_default();
        let cases = self.cases.clone().unwrap_or_default();
        let fixtures = self.fixtures.clone().unwrap_or_default();

        let id_defaults = IdSettings::default();
        let mut id_settings = IdSettings {
            union_style: ids.union_style.unwrap_or(id_defaults.union_style),
            param_style: ids.param_style.unwrap_or(id_defaults.param_style),
        };
        if let Some(style) = overrides.id_style {
            id_settings.union_style = style;
            id_settings.param_style = style;
        }

        let case_defaults = CaseSettings::default();
        let prefix = cases.prefix.unwrap_or(case_defaults.prefix);
        if prefix.is_empty() {
            return Err(OptionsError::EmptyPrefix);
        }

        let tag_filter = overrides
            .tags
            .as_deref()
            .or(cases.tags.as_deref())
            .map(TagFilter::parse)
            .transpose()?;

        Ok(Settings {
            ids: id_settings,
            cases: CaseSettings {
                prefix,
                class_prefix: cases.class_prefix.unwrap_or(case_defaults.class_prefix),
                glob: cases.glob,
                tag_filter,
            },
            fixtures: FixtureSettings {
                on_collision: fixtures.on_collision.unwrap_or_default(),
            },
        })
    }
}
