use std::sync::Arc;

use casework_metadata::{CaseSettings, TagFilter};

use crate::case::{Case, CaseClass, CaseItem, CaseKind, CaseModule};
use crate::error::CaseError;

pub type CasePredicate = Arc<dyn Fn(&Case) -> bool + Send + Sync>;

/// Where cases are collected from.
#[derive(Debug, Clone, Copy)]
pub enum CaseSource<'a> {
    Module(&'a CaseModule),
    Class(&'a CaseClass),
    /// Cases given explicitly, kept in the given order and not filtered by prefix.
    Cases(&'a [Case]),
}

/// Which cases to keep.
#[derive(Clone)]
pub struct CaseSelector {
    prefix: String,
    class_prefix: String,
    glob: Option<glob::Pattern>,
    has_tag: Vec<String>,
    tag_filter: Option<TagFilter>,
    /// Filters from `casework.toml`, applied on top of the ones given here.
    configured_glob: Option<glob::Pattern>,
    configured_tag_filter: Option<TagFilter>,
    predicates: Vec<CasePredicate>,
}

impl Default for CaseSelector {
    fn default() -> Self {
        Self::unfiltered(&CaseSettings::default())
    }
}

impl std::fmt::Debug for CaseSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseSelector")
            .field("prefix", &self.prefix)
            .field("class_prefix", &self.class_prefix)
            .field("glob", &self.glob.as_ref().map(glob::Pattern::as_str))
            .field("has_tag", &self.has_tag)
            .field("tag_filter", &self.tag_filter)
            .field(
                "configured_glob",
                &self.configured_glob.as_ref().map(glob::Pattern::as_str),
            )
            .field("configured_tag_filter", &self.configured_tag_filter)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl CaseSelector {
    pub fn new() -> Self {
        Self::default()
    }

    fn unfiltered(settings: &CaseSettings) -> Self {
        Self {
            prefix: settings.prefix.clone(),
            class_prefix: settings.class_prefix.clone(),
            glob: None,
            has_tag: Vec::new(),
            tag_filter: None,
            configured_glob: None,
            configured_tag_filter: settings.tag_filter.clone(),
            predicates: Vec::new(),
        }
    }

    /// A selector carrying the configured prefixes and filters.
    ///
    /// Filters added later narrow the configured ones rather than replace them.
    pub fn from_settings(settings: &CaseSettings) -> Result<Self, CaseError> {
        let mut selector = Self::unfiltered(settings);
        selector.configured_glob = settings.glob.as_deref().map(parse_glob).transpose()?;
        Ok(selector)
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_class_prefix(mut self, class_prefix: impl Into<String>) -> Self {
        self.class_prefix = class_prefix.into();
        self
    }

    /// Keeps cases whose id matches `glob`, e.g. `*_success`.
    pub fn with_glob(mut self, glob: &str) -> Result<Self, CaseError> {
        if self.glob.is_some() {
            return Err(CaseError::DuplicateFilter { filter: "glob" });
        }
        self.glob = Some(parse_glob(glob)?);
        Ok(self)
    }

    /// Keeps cases carrying `tag`. Several tags must all be present.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.has_tag.push(tag.into());
        self
    }

    /// Keeps cases whose tags satisfy `expression`, e.g. `fast and not flaky`.
    pub fn with_tag_filter(mut self, expression: &str) -> Result<Self, CaseError> {
        if self.tag_filter.is_some() {
            return Err(CaseError::DuplicateFilter {
                filter: "tag_filter",
            });
        }
        self.tag_filter = Some(TagFilter::parse(expression)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Case) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn accepts(&self, case: &Case) -> bool {
        let mut globs = self.configured_glob.iter().chain(&self.glob);
        if !globs.all(|glob| glob.matches(case.id())) {
            return false;
        }
        if !self.has_tag.iter().all(|tag| case.has_tag(tag)) {
            return false;
        }
        let mut tag_filters = self.configured_tag_filter.iter().chain(&self.tag_filter);
        if !tag_filters.all(|tag_filter| tag_filter.matches(case.tags())) {
            return false;
        }
        self.predicates.iter().all(|predicate| predicate(case))
    }
}

fn parse_glob(glob: &str) -> Result<glob::Pattern, CaseError> {
    glob::Pattern::new(glob).map_err(|error| CaseError::InvalidGlob {
        glob: glob.to_string(),
        message: error.to_string(),
    })
}

/// Collects the cases declared in `source`, in declaration order, and keeps those `selector`
/// accepts.
///
/// Only cases and classes declared in the container's own module are considered. Case classes
/// are recursed into depth first and their cases stay together at the position of the class.
pub fn collect_cases(
    source: CaseSource<'_>,
    selector: &CaseSelector,
) -> Result<Vec<Case>, CaseError> {
    let mut found: Vec<(Vec<u32>, Case)> = Vec::new();

    match source {
        CaseSource::Module(module) => {
            collect_items(module.path(), module.items(), &[], None, selector, &mut found)?;
        }
        CaseSource::Class(class) => {
            collect_class(class, &[], selector, &mut found)?;
        }
        CaseSource::Cases(cases) => {
            found.extend(
                cases
                    .iter()
                    .zip(0u32..)
                    .map(|(case, index)| (vec![index], case.clone())),
            );
        }
    }

    found.sort_by(|(left, _), (right, _)| left.cmp(right));

    let collected: Vec<Case> = found
        .into_iter()
        .map(|(_, mut case)| {
            case.resolve_id(&selector.prefix);
            case
        })
        .filter(|case| selector.accepts(case))
        .collect();

    tracing::debug!(
        "Collected {} cases: {}",
        collected.len(),
        collected.iter().map(Case::id).collect::<Vec<_>>().join(", ")
    );
    Ok(collected)
}

fn collect_items(
    module: &str,
    items: &[CaseItem],
    key: &[u32],
    class: Option<&str>,
    selector: &CaseSelector,
    found: &mut Vec<(Vec<u32>, Case)>,
) -> Result<(), CaseError> {
    for item in items {
        match item {
            CaseItem::Case(case) => {
                if case.module() != module || !case.name().starts_with(&selector.prefix) {
                    continue;
                }
                if let (Some(class), CaseKind::Method { takes_self: false, is_static: false }) =
                    (class, case.kind())
                {
                    return Err(CaseError::MissingSelf {
                        class: class.to_string(),
                        method: case.name().to_string(),
                    });
                }
                let mut case_key = key.to_vec();
                case_key.push(case.position());
                found.push((case_key, case.clone()));
            }
            CaseItem::Class(nested) => {
                if nested.module() != module || !nested.name().starts_with(&selector.class_prefix)
                {
                    continue;
                }
                collect_class(nested, key, selector, found)?;
            }
        }
    }
    Ok(())
}

fn collect_class(
    class: &CaseClass,
    key: &[u32],
    selector: &CaseSelector,
    found: &mut Vec<(Vec<u32>, Case)>,
) -> Result<(), CaseError> {
    if class.has_constructor() {
        tracing::warn!(
            "Case class `{}` has a constructor and is not collected, cases must be stateless",
            class.name()
        );
        return Ok(());
    }
    let mut class_key = key.to_vec();
    class_key.push(class.position());
    collect_items(
        class.module(),
        class.items(),
        &class_key,
        Some(class.name()),
        selector,
        found,
    )
}
