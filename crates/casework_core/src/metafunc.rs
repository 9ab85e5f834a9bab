//! Collection-time hook: records parametrizations of one test and builds its calls on demand.

use crate::error::ParametrizeError;
use crate::fixture::{FixtureNamespace, RequiresFixtures};
use crate::function::TestFunction;
use crate::parametrize::{ParametrizeOrder, PendingOrder, UnionOrder};
use crate::tree::{BranchTree, CallSpec, ClosureNode, replay};

/// Collects the parametrizations of one test without expanding them.
///
/// Orders only make sense once the whole fixture closure is known, so they are queued and
/// replayed when [`Metafunc::calls`] is first called. After that the calls are frozen.
#[derive(Debug)]
pub struct Metafunc<'a> {
    test: &'a TestFunction,
    namespace: &'a FixtureNamespace,
    closure: ClosureNode,
    pending: Vec<PendingOrder>,
    calls: Option<Vec<CallSpec>>,
}

impl<'a> Metafunc<'a> {
    pub fn new(test: &'a TestFunction, namespace: &'a FixtureNamespace) -> Self {
        Self {
            test,
            namespace,
            closure: ClosureNode::build(test, namespace),
            pending: Vec::new(),
            calls: None,
        }
    }

    pub const fn closure(&self) -> &ClosureNode {
        &self.closure
    }

    pub fn pending(&self) -> &[PendingOrder] {
        &self.pending
    }

    pub fn parametrize(&mut self, order: ParametrizeOrder) -> Result<(), ParametrizeError> {
        self.ensure_open()?;
        self.pending.push(PendingOrder::Parametrize(order));
        Ok(())
    }

    pub fn union(&mut self, order: UnionOrder) -> Result<(), ParametrizeError> {
        self.ensure_open()?;
        self.pending.push(PendingOrder::Union(order));
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ParametrizeError> {
        if self.calls.is_some() {
            return Err(ParametrizeError::Frozen {
                test: self.test.name().to_string(),
            });
        }
        Ok(())
    }

    /// The calls of the test, built from the recorded orders on first access.
    pub fn calls(&mut self) -> Result<&[CallSpec], ParametrizeError> {
        if self.calls.is_none() {
            self.calls = Some(self.build()?);
        }
        Ok(self.calls.as_deref().unwrap_or_default())
    }

    fn build(&self) -> Result<Vec<CallSpec>, ParametrizeError> {
        let test = self.test.name();
        tracing::debug!(
            "Building calls of `{test}` from {} pending orders",
            self.pending.len()
        );

        let mut tree = BranchTree::new();
        replay(&mut tree, &self.closure, self.pending.clone(), self.test)?;
        tree.finalize();
        tracing::trace!("Branch tree of `{test}`:\n{tree}");
        let calls = tree.into_calls();

        for argname in self.test.argnames() {
            let provided =
                self.test.provider_of(argname).is_some() || self.namespace.contains(argname);
            if !provided && calls.iter().any(|call| !call.contains(argname)) {
                return Err(ParametrizeError::MissingArgument {
                    test: test.to_string(),
                    argname: argname.clone(),
                });
            }
        }

        tracing::debug!("Generated {} calls for `{test}`", calls.len());
        Ok(calls)
    }
}

/// Plays the host's part for `test`: queues its own parametrizations, then those of the
/// parametrized and union fixtures in its closure, and returns the resulting calls.
pub fn generate_calls(
    test: &TestFunction,
    namespace: &FixtureNamespace,
) -> Result<Vec<CallSpec>, ParametrizeError> {
    let mut metafunc = Metafunc::new(test, namespace);

    for order in test.parametrize_orders() {
        metafunc.parametrize(order.clone())?;
    }

    for name in metafunc.closure().all_names() {
        let Some(fixture) = namespace.get(&name) else {
            continue;
        };
        if let Some(order) = UnionOrder::for_fixture(fixture) {
            metafunc.union(order?)?;
        } else if let Some(order) = ParametrizeOrder::for_fixture(fixture) {
            metafunc.parametrize(order)?;
        }
    }

    metafunc.calls().map(<[CallSpec]>::to_vec)
}
