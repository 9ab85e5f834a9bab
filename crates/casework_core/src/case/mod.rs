//! Cases: functions producing the data of one test scenario, and the containers declaring them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FixtureError;
use crate::fixture::{FixtureFn, FixtureRequest};
use crate::value::{Mark, ParamValue};

mod parametrize;
mod registry;

pub use parametrize::parametrize_with_cases;
pub use registry::{CasePredicate, CaseSelector, CaseSource, collect_cases};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseKind {
    #[default]
    Function,
    /// A method of a case class.
    Method { takes_self: bool, is_static: bool },
}

/// One test scenario.
#[derive(Clone)]
pub struct Case {
    name: String,
    id: Option<String>,
    tags: Vec<String>,
    marks: Vec<Mark>,
    argnames: Vec<String>,
    func: FixtureFn,
    module: String,
    position: u32,
    kind: CaseKind,
}

impl Case {
    pub fn new<F>(name: impl Into<String>, module: impl Into<String>, position: u32, func: F) -> Self
    where
        F: Fn(&FixtureRequest<'_>) -> Result<ParamValue, FixtureError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            id: None,
            tags: Vec::new(),
            marks: Vec::new(),
            argnames: Vec::new(),
            func: Arc::new(func),
            module: module.into(),
            position,
            kind: CaseKind::Function,
        }
    }

    /// A case returning `value`.
    pub fn returning(
        name: impl Into<String>,
        module: impl Into<String>,
        position: u32,
        value: impl Into<ParamValue>,
    ) -> Self {
        let value = value.into();
        Self::new(name, module, position, move |_| Ok(value.clone()))
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Self {
        self.marks.extend(marks);
        self
    }

    /// Fixtures the case needs.
    #[must_use]
    pub fn with_argnames<I, S>(mut self, argnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argnames = argnames.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: CaseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The explicit id, or the name once collection has stripped its prefix.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn resolve_id(&mut self, prefix: &str) {
        if self.id.is_none() {
            let id = self.name.strip_prefix(prefix).unwrap_or(&self.name);
            self.id = Some(id.to_string());
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|own| own == tag)
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub const fn position(&self) -> u32 {
        self.position
    }

    pub const fn kind(&self) -> CaseKind {
        self.kind
    }

    pub(crate) fn func(&self) -> FixtureFn {
        Arc::clone(&self.func)
    }

    /// Runs the case with the given request.
    pub fn call(&self, request: &FixtureRequest<'_>) -> Result<ParamValue, FixtureError> {
        (self.func)(request)
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("tags", &self.tags)
            .field("marks", &self.marks)
            .field("argnames", &self.argnames)
            .field("module", &self.module)
            .field("position", &self.position)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum CaseItem {
    Case(Case),
    Class(CaseClass),
}

/// A class grouping case methods and nested case classes.
#[derive(Debug, Clone)]
pub struct CaseClass {
    name: String,
    module: String,
    position: u32,
    has_constructor: bool,
    items: Vec<CaseItem>,
}

impl CaseClass {
    pub fn new(name: impl Into<String>, module: impl Into<String>, position: u32) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            position,
            has_constructor: false,
            items: Vec::new(),
        }
    }

    /// Marks the class as stateful, which excludes it from collection.
    #[must_use]
    pub const fn with_constructor(mut self) -> Self {
        self.has_constructor = true;
        self
    }

    #[must_use]
    pub fn with_case(mut self, case: Case) -> Self {
        self.items.push(CaseItem::Case(case));
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: Self) -> Self {
        self.items.push(CaseItem::Class(class));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub const fn position(&self) -> u32 {
        self.position
    }

    pub const fn has_constructor(&self) -> bool {
        self.has_constructor
    }

    pub fn items(&self) -> &[CaseItem] {
        &self.items
    }
}

/// The cases and case classes visible in one module, including imported ones.
#[derive(Debug, Clone, Default)]
pub struct CaseModule {
    path: String,
    items: Vec<CaseItem>,
}

impl CaseModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_case(mut self, case: Case) -> Self {
        self.items.push(CaseItem::Case(case));
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: CaseClass) -> Self {
        self.items.push(CaseItem::Class(class));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn items(&self) -> &[CaseItem] {
        &self.items
    }
}

/// Case modules by dotted path.
#[derive(Debug, Clone, Default)]
pub struct CaseCatalog {
    modules: HashMap<String, CaseModule>,
}

impl CaseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: CaseModule) {
        self.modules.insert(module.path().to_string(), module);
    }

    pub fn get(&self, path: &str) -> Option<&CaseModule> {
        self.modules.get(path)
    }

    /// The module holding the cases of `test_module` by convention.
    ///
    /// `pkg.test_foo` looks for `pkg.test_foo_cases`, then `pkg.cases_foo`.
    pub fn companion_of(&self, test_module: &str) -> Option<&CaseModule> {
        let (package, name) = match test_module.rsplit_once('.') {
            Some((package, name)) => (Some(package), name),
            None => (None, test_module),
        };
        let qualify = |name: String| match package {
            Some(package) => format!("{package}.{name}"),
            None => name,
        };

        let mut candidates = vec![qualify(format!("{name}_cases"))];
        if let Some(stem) = name.strip_prefix("test_") {
            candidates.push(qualify(format!("cases_{stem}")));
        }

        let found = candidates.iter().find_map(|candidate| self.get(candidate));
        if found.is_none() {
            tracing::debug!(
                "No case module found for `{test_module}`, tried {}",
                candidates.join(", ")
            );
        }
        found
    }
}
