use std::collections::HashMap;

use crate::error::ParametrizeError;
use crate::fixture::{ArgProvider, FixtureNamespace, RequiresFixtures};
use crate::parametrize::{Declared, Parametrize, ParametrizeOrder, declare};
use crate::value::Mark;

/// A test function as the engine sees it: a name and the arguments it asks for.
#[derive(Debug, Clone, Default)]
pub struct TestFunction {
    name: String,
    argnames: Vec<String>,
    marks: Vec<Mark>,
    orders: Vec<ParametrizeOrder>,
    providers: HashMap<String, ArgProvider>,
    declared: Vec<Vec<String>>,
}

impl TestFunction {
    pub fn new<I, S>(name: impl Into<String>, argnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            argnames: argnames.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Self {
        self.marks.extend(marks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Declares a parametrization, in the order decorators would be applied.
    ///
    /// The first declared parametrization is the outer loop of the generated calls. Values that
    /// reference fixtures are provided through a generated union fixture registered in
    /// `namespace`.
    pub fn parametrize(
        &mut self,
        namespace: &mut FixtureNamespace,
        parametrize: Parametrize,
    ) -> Result<(), ParametrizeError> {
        match declare(namespace, &self.name, parametrize)? {
            Declared::Direct(order) => {
                tracing::debug!(
                    "`{}`: parametrizing `{}` with {} values",
                    self.name,
                    order.argnames.join(","),
                    order.params.len()
                );
                self.declared.push(order.argnames.clone());
                self.orders.push(order);
            }
            Declared::Provided(providers) => {
                for (argname, provider) in &providers {
                    tracing::debug!(
                        "`{}`: argument `{argname}` is provided by `{}`",
                        self.name,
                        provider.fixture
                    );
                }
                self.declared.push(providers.iter().map(|(argname, _)| argname.clone()).collect());
                self.providers.extend(providers);
            }
        }
        Ok(())
    }

    /// The plain parametrizations declared on this test.
    pub fn parametrize_orders(&self) -> &[ParametrizeOrder] {
        &self.orders
    }

    /// Position of the parametrization that covers `name`, either an argument or the fixture
    /// generated to provide one.
    pub fn declaration_rank(&self, name: &str) -> Option<usize> {
        let argname = self
            .providers
            .iter()
            .find_map(|(argname, provider)| (provider.fixture == name).then_some(argname.as_str()))
            .unwrap_or(name);
        self.declared
            .iter()
            .position(|argnames| argnames.iter().any(|declared| declared == argname))
    }

    /// Whether `argname` receives its values from a plain parametrization.
    pub fn is_direct(&self, argname: &str) -> bool {
        self.orders
            .iter()
            .any(|order| order.argnames.iter().any(|name| name == argname))
    }
}

impl RequiresFixtures for TestFunction {
    fn argnames(&self) -> &[String] {
        &self.argnames
    }

    fn providers(&self) -> &HashMap<String, ArgProvider> {
        &self.providers
    }
}
