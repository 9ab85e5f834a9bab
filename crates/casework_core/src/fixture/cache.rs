use std::collections::HashMap;

use crate::fixture::FixtureScope;
use crate::resolve::Resolved;

/// Manages caching of fixture values based on their scope.
///
/// Keys identify one fixture instance: the fixture name, the parameter it received and the keys
/// of the instances it depends on.
#[derive(Debug, Default)]
pub struct FixtureCache {
    session: HashMap<String, Resolved>,

    package: HashMap<String, Resolved>,

    module: HashMap<String, Resolved>,

    class: HashMap<String, Resolved>,

    function: HashMap<String, Resolved>,
}

impl FixtureCache {
    const fn scope_map(&self, scope: FixtureScope) -> &HashMap<String, Resolved> {
        match scope {
            FixtureScope::Session => &self.session,
            FixtureScope::Package => &self.package,
            FixtureScope::Module => &self.module,
            FixtureScope::Class => &self.class,
            FixtureScope::Function => &self.function,
        }
    }

    const fn scope_map_mut(&mut self, scope: FixtureScope) -> &mut HashMap<String, Resolved> {
        match scope {
            FixtureScope::Session => &mut self.session,
            FixtureScope::Package => &mut self.package,
            FixtureScope::Module => &mut self.module,
            FixtureScope::Class => &mut self.class,
            FixtureScope::Function => &mut self.function,
        }
    }

    pub fn get(&self, key: &str, scope: FixtureScope) -> Option<&Resolved> {
        self.scope_map(scope).get(key)
    }

    pub fn insert(&mut self, key: String, value: Resolved, scope: FixtureScope) {
        self.scope_map_mut(scope).insert(key, value);
    }

    /// Drops every value of `scope`.
    pub fn clear_fixtures(&mut self, scope: FixtureScope) {
        self.scope_map_mut(scope).clear();
    }

    pub fn len(&self, scope: FixtureScope) -> usize {
        self.scope_map(scope).len()
    }

    pub fn is_empty(&self, scope: FixtureScope) -> bool {
        self.scope_map(scope).is_empty()
    }
}
