//! The fixture closure of a test, split at every union fixture.
//!
//! Names required by every call live at the root. Below a union, each child holds the names
//! only its alternative needs, so that parametrizations of those names reach only the calls
//! that select the alternative.

use std::fmt;

use itertools::Itertools;

use crate::fixture::{FixtureNamespace, RequiresFixtures};
use crate::function::TestFunction;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureNode {
    names: Vec<String>,
    split: Option<ClosureSplit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureSplit {
    union_name: String,
    children: Vec<ClosureNode>,
}

impl ClosureSplit {
    pub fn union_name(&self) -> &str {
        &self.union_name
    }

    /// One child per alternative, in alternative order.
    pub fn children(&self) -> &[ClosureNode] {
        &self.children
    }
}

impl ClosureNode {
    /// Builds the closure of `test`.
    ///
    /// Names parametrized directly on the test come first, followed by the fixtures the test
    /// requires and, recursively, theirs.
    pub fn build(test: &TestFunction, namespace: &FixtureNamespace) -> Self {
        let mut root = Self::default();
        for argname in test.argnames() {
            if test.is_direct(argname) {
                root.names.push(argname.clone());
            }
        }
        for fixture in test.required_fixtures() {
            root.add(&fixture, namespace, &[]);
        }
        tracing::trace!("Fixture closure of `{}`:\n{root}", test.name());
        root
    }

    fn add(&mut self, name: &str, namespace: &FixtureNamespace, above: &[&str]) {
        if above.contains(&name) || self.names.iter().any(|existing| existing == name) {
            return;
        }

        if let Some(split) = &mut self.split {
            let mut context = above.to_vec();
            context.extend(self.names.iter().map(String::as_str));
            for child in &mut split.children {
                child.add(name, namespace, &context);
            }
            return;
        }

        self.names.push(name.to_string());
        let Some(fixture) = namespace.get(name) else {
            return;
        };

        if let Some(union) = fixture.as_union() {
            let mut context = above.to_vec();
            context.extend(self.names.iter().map(String::as_str));
            let children = union
                .alternatives
                .iter()
                .map(|alternative| {
                    let mut child = Self::default();
                    child.add(alternative.alternative_name(), namespace, &context);
                    child
                })
                .collect();
            self.split = Some(ClosureSplit {
                union_name: name.to_string(),
                children,
            });
        } else {
            for dependency in fixture.required_fixtures() {
                self.add(&dependency, namespace, above);
            }
        }
    }

    /// Names held by this node, in the order they were added.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub const fn split(&self) -> Option<&ClosureSplit> {
        self.split.as_ref()
    }

    /// Every name in this subtree, depth first, without duplicates.
    pub fn all_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names.into_iter().unique().collect()
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        names.extend(self.names.iter().cloned());
        if let Some(split) = &self.split {
            for child in &split.children {
                child.collect_names(names);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
            || self
                .split
                .as_ref()
                .is_some_and(|split| split.children.iter().any(|child| child.contains(name)))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}({})", self.names.join(", "))?;
        if let Some(split) = &self.split {
            write!(f, "\n{indent}split {}:", split.union_name)?;
            for child in &split.children {
                writeln!(f)?;
                child.write_indented(f, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ClosureNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
