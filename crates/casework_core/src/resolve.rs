//! Executes the fixtures behind one call.
//!
//! This is the minimal runtime a host needs to honour union semantics: only the alternative a
//! call selects is set up, and fixtures of branches the call does not take are never run.

use std::collections::HashMap;

use itertools::Itertools;

use crate::error::ResolveError;
use crate::fixture::{
    FixtureCache, FixtureDef, FixtureKind, FixtureNamespace, FixtureRequest, FixtureScope,
    RequiresFixtures,
};
use crate::function::TestFunction;
use crate::lazy::InvocationId;
use crate::tree::{CallSpec, CallValue};
use crate::value::ParamValue;

/// The outcome of evaluating a fixture or an argument in one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Used(ParamValue),
    /// The call takes a branch that does not use this fixture.
    NotApplicable,
}

impl Resolved {
    pub const fn is_used(&self) -> bool {
        matches!(self, Self::Used(_))
    }

    pub const fn value(&self) -> Option<&ParamValue> {
        match self {
            Self::Used(value) => Some(value),
            Self::NotApplicable => None,
        }
    }

    pub fn into_value(self) -> Option<ParamValue> {
        match self {
            Self::Used(value) => Some(value),
            Self::NotApplicable => None,
        }
    }
}

/// A resolved value and the key identifying the fixture instances it came from.
type Keyed = (Resolved, String);

/// Resolves the arguments of calls, caching fixture values per scope.
#[derive(Debug)]
pub struct FixtureResolver<'a> {
    namespace: &'a FixtureNamespace,
    cache: FixtureCache,
}

impl<'a> FixtureResolver<'a> {
    pub fn new(namespace: &'a FixtureNamespace) -> Self {
        Self {
            namespace,
            cache: FixtureCache::default(),
        }
    }

    pub const fn cache(&self) -> &FixtureCache {
        &self.cache
    }

    /// Drops cached values of `scope`, for hosts leaving a module, class or package.
    pub fn clear_scope(&mut self, scope: FixtureScope) {
        self.cache.clear_fixtures(scope);
    }

    /// Evaluates every argument of `test` for `call`, in argument order.
    pub fn resolve_call(
        &mut self,
        test: &TestFunction,
        call: &CallSpec,
    ) -> Result<Vec<(String, Resolved)>, ResolveError> {
        let invocation = InvocationId::next();
        self.cache.clear_fixtures(FixtureScope::Function);
        tracing::trace!("Resolving `{}[{}]`", test.name(), call.id());

        let mut memo = HashMap::new();
        test.argnames()
            .iter()
            .map(|argname| {
                let (resolved, _) = self.resolve_arg(argname, test, call, invocation, &mut memo)?;
                Ok((argname.clone(), resolved))
            })
            .collect()
    }

    /// Rejects dependencies narrower than `fixture`, whose values its cached value would outlive.
    fn check_scopes(
        &self,
        name: &str,
        fixture: &FixtureDef,
        call: &CallSpec,
    ) -> Result<(), ResolveError> {
        for argname in fixture.argnames() {
            if call.param(argname).is_some_and(|param| !param.indirect) {
                continue;
            }
            let dependency = fixture
                .provider_of(argname)
                .map_or(argname.as_str(), |provider| provider.fixture.as_str());
            if let Some(definition) = self.namespace.get(dependency)
                && definition.scope() < fixture.scope()
            {
                return Err(ResolveError::ScopeMismatch {
                    fixture: name.to_string(),
                    scope: fixture.scope(),
                    dependency: dependency.to_string(),
                    dependency_scope: definition.scope(),
                });
            }
        }
        Ok(())
    }

    fn resolve_arg(
        &mut self,
        argname: &str,
        owner: &dyn RequiresFixtures,
        call: &CallSpec,
        invocation: InvocationId,
        memo: &mut HashMap<String, Keyed>,
    ) -> Result<Keyed, ResolveError> {
        if let Some(param) = call.param(argname)
            && !param.indirect
        {
            return match &param.value {
                CallValue::Value(value) => Ok((
                    Resolved::Used(value.resolve_for(invocation)?),
                    format!("{argname}={value}"),
                )),
                CallValue::NotApplicable | CallValue::Alternative(_) => {
                    Ok((Resolved::NotApplicable, format!("{argname}=n/a")))
                }
            };
        }

        let Some(provider) = owner.provider_of(argname) else {
            return self.resolve_fixture(argname, call, invocation, memo);
        };
        let (resolved, key) = self.resolve_fixture(&provider.fixture, call, invocation, memo)?;
        let Some(index) = provider.unpack else {
            return Ok((resolved, key));
        };
        match resolved {
            Resolved::NotApplicable => Ok((Resolved::NotApplicable, key)),
            Resolved::Used(value) => value
                .as_tuple()
                .and_then(|items| items.get(index))
                .cloned()
                .map(|item| (Resolved::Used(item), format!("{key}[{index}]")))
                .ok_or_else(|| ResolveError::Unpack {
                    fixture: provider.fixture.clone(),
                    index,
                    value: value.to_string(),
                }),
        }
    }

    fn resolve_fixture(
        &mut self,
        name: &str,
        call: &CallSpec,
        invocation: InvocationId,
        memo: &mut HashMap<String, Keyed>,
    ) -> Result<Keyed, ResolveError> {
        if let Some(found) = memo.get(name) {
            return Ok(found.clone());
        }

        let namespace = self.namespace;
        let fixture = namespace
            .get(name)
            .ok_or_else(|| ResolveError::UnknownFixture {
                name: name.to_string(),
            })?;

        let keyed = if call.is_not_applicable(name) {
            tracing::trace!("Fixture `{name}` is not used by this call");
            (Resolved::NotApplicable, format!("{name}=n/a"))
        } else {
            match fixture.kind() {
                FixtureKind::Union(_) => {
                    let alternative = call.selected_alternative(name).ok_or_else(|| {
                        ResolveError::MissingSelection {
                            union_name: name.to_string(),
                        }
                    })?;
                    let (resolved, key) = self.resolve_fixture(
                        alternative.alternative_name(),
                        call,
                        invocation,
                        memo,
                    )?;
                    (resolved, format!("{name}/{key}"))
                }
                FixtureKind::Function(function) => {
                    self.check_scopes(name, fixture, call)?;
                    let param = match call.value(name) {
                        Some(CallValue::Value(value)) => Some(value.clone()),
                        _ => None,
                    };

                    let mut args: Vec<(String, ParamValue)> = Vec::new();
                    let mut keys = Vec::new();
                    let mut applicable = true;
                    for argname in fixture.argnames() {
                        let (resolved, key) =
                            self.resolve_arg(argname, fixture, call, invocation, memo)?;
                        keys.push(key);
                        match resolved {
                            Resolved::Used(value) => args.push((argname.clone(), value)),
                            Resolved::NotApplicable => applicable = false,
                        }
                    }

                    let key = format!(
                        "{name}[{}]({})",
                        param.as_ref().map(ToString::to_string).unwrap_or_default(),
                        keys.iter().join(",")
                    );

                    if !applicable {
                        tracing::trace!("Fixture `{name}` depends on a fixture this call does not use");
                        (Resolved::NotApplicable, key)
                    } else if let Some(cached) = self.cache.get(&key, fixture.scope()) {
                        tracing::trace!("Reusing {} fixture `{key}`", fixture.scope());
                        (cached.clone(), key)
                    } else {
                        tracing::trace!("Running fixture `{name}`");
                        let request =
                            FixtureRequest::new(name, param.as_ref(), &args, invocation);
                        let resolved = Resolved::Used(function(&request)?);
                        self.cache.insert(key.clone(), resolved.clone(), fixture.scope());
                        (resolved, key)
                    }
                }
            }
        };

        memo.insert(name.to_string(), keyed.clone());
        Ok(keyed)
    }
}
