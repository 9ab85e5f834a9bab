use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::alternatives::Alternative;
use crate::error::FixtureError;
use crate::ids::{IdStyle, RenderedParam};
use crate::lazy::InvocationId;
use crate::value::ParamValue;

mod cache;
mod helpers;
mod namespace;

pub use cache::FixtureCache;
pub use helpers::{fixture_union, param_fixture, param_fixtures, unpack_fixture};
pub use namespace::{FixtureNamespace, NamespaceConfig};

pub type FixtureFn = Arc<dyn Fn(&FixtureRequest<'_>) -> Result<ParamValue, FixtureError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FixtureScope {
    #[default]
    Function,
    Class,
    Module,
    Package,
    Session,
}

impl FixtureScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Module => "module",
            Self::Package => "package",
            Self::Session => "session",
        }
    }
}

impl TryFrom<&str> for FixtureScope {
    type Error = FixtureError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "function" => Ok(Self::Function),
            "class" => Ok(Self::Class),
            "module" => Ok(Self::Module),
            "package" => Ok(Self::Package),
            "session" => Ok(Self::Session),
            _ => Err(FixtureError::InvalidScope(s.to_string())),
        }
    }
}

impl fmt::Display for FixtureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes an argument to the fixture that provides it.
///
/// This is how a test or fixture keeps its declared argument names while the values come from
/// generated fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgProvider {
    pub fixture: String,
    /// Take this element of the fixture's tuple value instead of the whole value.
    pub unpack: Option<usize>,
}

impl ArgProvider {
    pub fn whole(fixture: impl Into<String>) -> Self {
        Self {
            fixture: fixture.into(),
            unpack: None,
        }
    }

    pub fn element(fixture: impl Into<String>, index: usize) -> Self {
        Self {
            fixture: fixture.into(),
            unpack: Some(index),
        }
    }

    /// One provider per argument name: the whole value for a single name, elements otherwise.
    pub fn for_argnames(fixture: &str, argnames: &[String]) -> Vec<(String, Self)> {
        if let [argname] = argnames {
            return vec![(argname.clone(), Self::whole(fixture))];
        }
        argnames
            .iter()
            .enumerate()
            .map(|(index, argname)| (argname.clone(), Self::element(fixture, index)))
            .collect()
    }
}

/// A union fixture: resolves to exactly one of its alternatives per call.
#[derive(Debug, Clone)]
pub struct UnionDef {
    pub alternatives: Vec<Alternative>,
    pub style: IdStyle,
}

#[derive(Clone)]
pub enum FixtureKind {
    Function(FixtureFn),
    Union(UnionDef),
}

impl fmt::Debug for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function"),
            Self::Union(union) => f.debug_tuple("Union").field(union).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixtureDef {
    name: String,
    scope: FixtureScope,
    argnames: Vec<String>,
    params: Option<Vec<RenderedParam>>,
    providers: HashMap<String, ArgProvider>,
    kind: FixtureKind,
}

impl FixtureDef {
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FixtureRequest<'_>) -> Result<ParamValue, FixtureError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scope: FixtureScope::default(),
            argnames: Vec::new(),
            params: None,
            providers: HashMap::new(),
            kind: FixtureKind::Function(Arc::new(f)),
        }
    }

    /// A fixture that returns `value`, evaluating lazy values once per call.
    pub fn constant(name: impl Into<String>, value: ParamValue) -> Self {
        let name = name.into();
        let fixture = name.clone();
        Self::function(name, move |request| {
            value
                .resolve_for(request.invocation())
                .map_err(|error| FixtureError::failed(&fixture, error.to_string()))
        })
    }

    pub fn union(name: impl Into<String>, alternatives: Vec<Alternative>, style: IdStyle) -> Self {
        let argnames = alternatives
            .iter()
            .map(|alternative| alternative.alternative_name().to_string())
            .collect();
        Self {
            name: name.into(),
            scope: FixtureScope::default(),
            argnames,
            params: None,
            providers: HashMap::new(),
            kind: FixtureKind::Union(UnionDef { alternatives, style }),
        }
    }

    #[must_use]
    pub const fn with_scope(mut self, scope: FixtureScope) -> Self {
        self.scope = scope;
        self
    }

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
    pub fn with_params(mut self, params: Vec<RenderedParam>) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn with_providers(mut self, providers: impl IntoIterator<Item = (String, ArgProvider)>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub const fn scope(&self) -> FixtureScope {
        self.scope
    }

    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }

    pub fn params(&self) -> Option<&[RenderedParam]> {
        self.params.as_deref()
    }

    pub const fn providers(&self) -> &HashMap<String, ArgProvider> {
        &self.providers
    }

    pub(crate) fn add_providers(&mut self, providers: impl IntoIterator<Item = (String, ArgProvider)>) {
        self.providers.extend(providers);
    }

    pub const fn kind(&self) -> &FixtureKind {
        &self.kind
    }

    pub const fn as_union(&self) -> Option<&UnionDef> {
        match &self.kind {
            FixtureKind::Union(union) => Some(union),
            FixtureKind::Function(_) => None,
        }
    }
}

/// The body of generated parameter fixtures: returns the current parameter.
pub(crate) fn param_value(request: &FixtureRequest<'_>) -> Result<ParamValue, FixtureError> {
    request
        .require_param()?
        .resolve_for(request.invocation())
        .map_err(|error| FixtureError::failed(request.fixture_name(), error.to_string()))
}

/// Things that need fixtures to run.
pub trait RequiresFixtures {
    fn argnames(&self) -> &[String];

    fn providers(&self) -> &HashMap<String, ArgProvider>;

    /// The fixture that provides `argname`, if any.
    fn provider_of(&self, argname: &str) -> Option<&ArgProvider> {
        self.providers().get(argname)
    }

    /// The names of the fixtures required, after routing arguments through their providers.
    fn required_fixtures(&self) -> Vec<String> {
        self.argnames()
            .iter()
            .map(|argname| {
                self.provider_of(argname)
                    .map_or_else(|| argname.clone(), |provider| provider.fixture.clone())
            })
            .unique()
            .collect()
    }

    #[cfg(test)]
    fn uses_fixture(&self, fixture_name: &str) -> bool {
        self.required_fixtures()
            .iter()
            .any(|required| required == fixture_name)
    }
}

impl RequiresFixtures for FixtureDef {
    fn argnames(&self) -> &[String] {
        &self.argnames
    }

    fn providers(&self) -> &HashMap<String, ArgProvider> {
        &self.providers
    }
}

/// What a fixture function receives when it runs.
#[derive(Debug, Clone, Copy)]
pub struct FixtureRequest<'a> {
    fixture: &'a str,
    param: Option<&'a ParamValue>,
    args: &'a [(String, ParamValue)],
    invocation: InvocationId,
}

impl<'a> FixtureRequest<'a> {
    pub const fn new(
        fixture: &'a str,
        param: Option<&'a ParamValue>,
        args: &'a [(String, ParamValue)],
        invocation: InvocationId,
    ) -> Self {
        Self {
            fixture,
            param,
            args,
            invocation,
        }
    }

    pub const fn fixture_name(&self) -> &str {
        self.fixture
    }

    /// The value this fixture is parametrized with in the current call.
    pub const fn param(&self) -> Option<&ParamValue> {
        self.param
    }

    pub const fn args(&self) -> &[(String, ParamValue)] {
        self.args
    }

    pub fn arg(&self, argname: &str) -> Option<&ParamValue> {
        self.args
            .iter()
            .find(|(name, _)| name == argname)
            .map(|(_, value)| value)
    }

    pub const fn invocation(&self) -> InvocationId {
        self.invocation
    }

    pub fn require_param(&self) -> Result<&ParamValue, FixtureError> {
        self.param.ok_or_else(|| {
            FixtureError::failed(self.fixture, "fixture is not parametrized in this call")
        })
    }

    pub fn require_arg(&self, argname: &str) -> Result<&ParamValue, FixtureError> {
        self.arg(argname).ok_or_else(|| {
            FixtureError::failed(self.fixture, format!("argument `{argname}` was not resolved"))
        })
    }
}
