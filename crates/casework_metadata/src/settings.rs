use crate::filter::TagFilter;
use crate::options::{CollisionPolicy, IdStyleName};

/// Fully resolved configuration, with every default applied.
#[derive(Default, Debug, Clone)]
pub struct Settings {
    pub(crate) ids: IdSettings,
    pub(crate) cases: CaseSettings,
    pub(crate) fixtures: FixtureSettings,
}

impl Settings {
    pub const fn ids(&self) -> &IdSettings {
        &self.ids
    }

    pub const fn cases(&self) -> &CaseSettings {
        &self.cases
    }

    pub const fn fixtures(&self) -> &FixtureSettings {
        &self.fixtures
    }

    pub const fn on_collision(&self) -> CollisionPolicy {
        self.fixtures.on_collision
    }

    pub fn set_tag_filter(&mut self, tag_filter: Option<TagFilter>) {
        self.cases.tag_filter = tag_filter;
    }

    pub const fn set_id_styles(&mut self, style: IdStyleName) {
        self.ids.union_style = style;
        self.ids.param_style = style;
    }
}

#[derive(Debug, Clone)]
pub struct IdSettings {
    /// Style used to render the selected alternative of a union fixture.
    pub union_style: IdStyleName,
    /// Style used to render the values of a plain parametrization.
    pub param_style: IdStyleName,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            union_style: IdStyleName::Compact,
            param_style: IdStyleName::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseSettings {
    pub prefix: String,
    pub class_prefix: String,
    pub glob: Option<String>,
    pub tag_filter: Option<TagFilter>,
}

impl Default for CaseSettings {
    fn default() -> Self {
        Self {
            prefix: "case_".to_string(),
            class_prefix: "Case".to_string(),
            glob: None,
            tag_filter: None,
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct FixtureSettings {
    pub on_collision: CollisionPolicy,
}
