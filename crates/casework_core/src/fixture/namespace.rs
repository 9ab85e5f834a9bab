use std::collections::HashMap;

use casework_metadata::{CollisionPolicy, Settings};

use crate::error::{FixtureError, ParametrizeError};
use crate::fixture::{ArgProvider, FixtureDef, FixtureScope, param_value};
use crate::ids::IdStyle;
use crate::parametrize::{Declared, Parametrize, declare};

/// Collection-wide choices that influence what gets registered.
#[derive(Debug, Clone, Default)]
pub struct NamespaceConfig {
    /// Applies to fixtures registered under a user chosen name.
    pub on_collision: CollisionPolicy,
    /// Default style of unions built with [`fixture_union`](crate::fixture::fixture_union).
    pub union_style: IdStyle,
    /// Default style of plain parametrizations.
    pub param_style: IdStyle,
}

impl From<&Settings> for NamespaceConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            on_collision: settings.on_collision(),
            union_style: settings.ids().union_style.into(),
            param_style: settings.ids().param_style.into(),
        }
    }
}

/// The fixtures visible to the tests of one module or class.
///
/// Generated fixtures are registered here explicitly instead of being injected into a
/// namespace behind the caller's back.
#[derive(Debug, Default)]
pub struct FixtureNamespace {
    fixtures: HashMap<String, FixtureDef>,
    order: Vec<String>,
    config: NamespaceConfig,
}

impl FixtureNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NamespaceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_config(NamespaceConfig::from(settings))
    }

    pub const fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    pub fn get(&self, name: &str) -> Option<&FixtureDef> {
        self.fixtures.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut FixtureDef> {
        self.fixtures.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fixtures.contains_key(name)
    }

    /// Fixture names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// The scope of `name`, or function scope when it is not a registered fixture.
    pub fn scope_of(&self, name: &str) -> FixtureScope {
        self.get(name).map_or(FixtureScope::Function, FixtureDef::scope)
    }

    /// Returns the name `base` should be registered under.
    pub fn claim_name(&self, base: &str, policy: CollisionPolicy) -> Result<String, FixtureError> {
        if !self.contains(base) {
            return Ok(base.to_string());
        }
        match policy {
            CollisionPolicy::Raise => Err(FixtureError::NameCollision {
                name: base.to_string(),
            }),
            CollisionPolicy::Override => Ok(base.to_string()),
            CollisionPolicy::Rename => Ok((1..)
                .map(|suffix| format!("{base}_{suffix}"))
                .find(|candidate| !self.contains(candidate))
                .unwrap_or_else(|| base.to_string())),
        }
    }

    /// Registers a fixture under its own name, following the configured collision policy.
    pub fn register(&mut self, fixture: FixtureDef) -> Result<String, FixtureError> {
        self.register_with(fixture, self.config.on_collision)
    }

    /// Registers a fixture whose name was generated, renaming it when the name is taken.
    pub(crate) fn register_generated(&mut self, fixture: FixtureDef) -> String {
        let name = self
            .claim_name(fixture.name(), CollisionPolicy::Rename)
            .unwrap_or_else(|_| fixture.name().to_string());
        self.insert(name, fixture)
    }

    pub fn register_with(
        &mut self,
        fixture: FixtureDef,
        policy: CollisionPolicy,
    ) -> Result<String, FixtureError> {
        let name = self.claim_name(fixture.name(), policy)?;
        Ok(self.insert(name, fixture))
    }

    fn insert(&mut self, name: String, mut fixture: FixtureDef) -> String {
        if self.fixtures.contains_key(&name) {
            tracing::warn!("Overriding existing fixture `{name}`");
        } else {
            self.order.push(name.clone());
        }
        if fixture.name() != name {
            tracing::debug!("Registering fixture `{}` as `{name}`", fixture.name());
            fixture.set_name(name.clone());
        } else {
            tracing::debug!("Registering {} fixture `{name}`", fixture.scope());
        }
        self.fixtures.insert(name.clone(), fixture);
        name
    }

    /// Parametrizes the arguments of an already registered fixture.
    ///
    /// The values are provided through a generated fixture, or a generated union when they
    /// contain fixture references, so the fixture keeps its argument names.
    pub fn parametrize_fixture(
        &mut self,
        fixture: &str,
        parametrize: Parametrize,
    ) -> Result<(), ParametrizeError> {
        let scope = self
            .get(fixture)
            .map(FixtureDef::scope)
            .ok_or_else(|| FixtureError::Unknown {
                name: fixture.to_string(),
            })?;

        let providers = match declare(self, fixture, parametrize.with_scope(scope))? {
            Declared::Provided(providers) => providers,
            Declared::Direct(order) => {
                let params_name = self.register_generated(
                    FixtureDef::function(
                        format!("{fixture}_{}", order.argnames.join("_")),
                        param_value,
                    )
                    .with_scope(scope)
                    .with_params(order.params),
                );
                ArgProvider::for_argnames(&params_name, &order.argnames)
            }
        };

        if let Some(def) = self.get_mut(fixture) {
            def.add_providers(providers);
        }
        Ok(())
    }
}
