//! The branch tree: calls under construction, split wherever a union fixture is applied.
//!
//! Leaves hold the calls of one branch. A union explodes a leaf into one filtered leaf per
//! alternative; a filtered leaf remembers which alternative it selected and which names it
//! will never use, so that later parametrizations of those names do not multiply its calls.

use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::error::ParametrizeError;
use crate::function::TestFunction;
use crate::ids::{IdPart, alternative_part, join_parts, make_unique};
use crate::parametrize::{ParametrizeOrder, PendingOrder, UnionOrder};
use crate::tree::call::{CallSpec, CallValue};
use crate::tree::closure::{ClosureNode, ClosureSplit};

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    calls: Vec<CallSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredLeaf {
    calls: Vec<CallSpec>,
    /// `(union, alternative)` pairs selected on the path to this leaf.
    selections: Vec<(String, String)>,
    /// Names this branch does not use.
    discarded: Vec<String>,
}

impl FilteredLeaf {
    pub fn selections(&self) -> &[(String, String)] {
        &self.selections
    }

    pub fn discarded(&self) -> &[String] {
        &self.discarded
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    union_name: String,
    children: Vec<BranchNode>,
}

impl Split {
    pub fn union_name(&self) -> &str {
        &self.union_name
    }

    pub fn children(&self) -> &[BranchNode] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchNode {
    Leaf(Leaf),
    Filtered(FilteredLeaf),
    Split(Split),
}

impl BranchNode {
    fn root() -> Self {
        Self::Leaf(Leaf {
            calls: vec![CallSpec::default()],
        })
    }

    pub fn calls(&self) -> Option<&[CallSpec]> {
        match self {
            Self::Leaf(leaf) => Some(&leaf.calls),
            Self::Filtered(leaf) => Some(&leaf.calls),
            Self::Split(_) => None,
        }
    }

    fn has(calls: &[CallSpec], name: &str) -> bool {
        calls.first().is_some_and(|call| call.contains(name))
    }

    fn parametrize(&mut self, order: &ParametrizeOrder, force: bool) {
        let calls = match self {
            Self::Split(split) => {
                for child in &mut split.children {
                    child.parametrize(order, force);
                }
                return;
            }
            Self::Leaf(leaf) => &mut leaf.calls,
            Self::Filtered(leaf) => {
                let discarded = order
                    .argnames
                    .iter()
                    .any(|argname| leaf.discarded.contains(argname));
                if discarded {
                    if !force {
                        tracing::trace!(
                            "Skipping `{}` in a branch that does not use it",
                            order.argnames.join(",")
                        );
                        return;
                    }
                    leaf.discarded
                        .retain(|name| !order.argnames.contains(name));
                }
                &mut leaf.calls
            }
        };

        if order.argnames.iter().any(|argname| Self::has(calls, argname)) {
            tracing::trace!("`{}` already has values", order.argnames.join(","));
            return;
        }

        *calls = calls
            .iter()
            .cartesian_product(&order.params)
            .map(|(call, param)| {
                let mut call = call.clone();
                call.apply(&order.argnames, param, order.indirect);
                call
            })
            .collect();
    }

    fn union(&mut self, order: &UnionOrder, parts: &[IdPart], discards: &[Vec<String>]) {
        let (calls, selections, discarded) = match self {
            Self::Split(split) => {
                for child in &mut split.children {
                    child.union(order, parts, discards);
                }
                return;
            }
            Self::Leaf(leaf) => {
                if Self::has(&leaf.calls, &order.union_name) {
                    return;
                }
                (std::mem::take(&mut leaf.calls), Vec::new(), Vec::new())
            }
            Self::Filtered(leaf) => {
                if Self::has(&leaf.calls, &order.union_name)
                    || leaf.discarded.contains(&order.union_name)
                {
                    return;
                }
                (
                    std::mem::take(&mut leaf.calls),
                    std::mem::take(&mut leaf.selections),
                    std::mem::take(&mut leaf.discarded),
                )
            }
        };

        let children = order
            .alternatives
            .iter()
            .zip(parts)
            .enumerate()
            .map(|(index, (alternative, part))| {
                let calls: Vec<CallSpec> = calls
                    .iter()
                    .map(|call| {
                        let mut call = call.clone();
                        call.push_param(
                            &order.union_name,
                            CallValue::Alternative(alternative.clone()),
                            true,
                        );
                        call.push_id_part(part.clone());
                        call.extend_marks(alternative.marks());
                        call
                    })
                    .collect();

                let mut selections = selections.clone();
                selections.push((
                    order.union_name.clone(),
                    alternative.alternative_name().to_string(),
                ));

                let mut discarded = discarded.clone();
                for name in discards.get(index).into_iter().flatten() {
                    if !discarded.contains(name) && !Self::has(&calls, name) {
                        discarded.push(name.clone());
                    }
                }

                Self::Filtered(FilteredLeaf {
                    calls,
                    selections,
                    discarded,
                })
            })
            .collect();

        *self = Self::Split(Split {
            union_name: order.union_name.clone(),
            children,
        });
    }

    fn finalize(&mut self) {
        match self {
            Self::Leaf(_) => {}
            Self::Split(split) => split.children.iter_mut().for_each(Self::finalize),
            Self::Filtered(leaf) => {
                for name in &leaf.discarded {
                    if Self::has(&leaf.calls, name) {
                        continue;
                    }
                    for call in &mut leaf.calls {
                        call.push_param(name, CallValue::NotApplicable, true);
                    }
                }
            }
        }
    }

    fn collect_calls(self, calls: &mut Vec<CallSpec>) {
        match self {
            Self::Leaf(leaf) => calls.extend(leaf.calls),
            Self::Filtered(leaf) => calls.extend(leaf.calls),
            Self::Split(split) => {
                for child in split.children {
                    child.collect_calls(calls);
                }
            }
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) | Self::Filtered(_) => 1,
            Self::Split(split) => split.children.iter().map(Self::leaf_count).sum(),
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let calls = match self {
            Self::Split(split) => {
                write!(f, "{indent}split {}", split.union_name)?;
                for child in &split.children {
                    writeln!(f)?;
                    child.write_indented(f, depth + 1)?;
                }
                return Ok(());
            }
            Self::Leaf(leaf) => {
                write!(f, "{indent}leaf")?;
                &leaf.calls
            }
            Self::Filtered(leaf) => {
                write!(
                    f,
                    "{indent}filtered [{}]",
                    leaf.selections
                        .iter()
                        .map(|(union, alternative)| format!("{union}={alternative}"))
                        .join(", ")
                )?;
                if !leaf.discarded.is_empty() {
                    write!(f, " discarded [{}]", leaf.discarded.join(", "))?;
                }
                &leaf.calls
            }
        };
        for call in calls {
            write!(f, "\n{indent}  {}", join_parts(call.id_parts()))?;
        }
        Ok(())
    }
}

/// The calls of one test, grown one order at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchTree {
    root: Option<BranchNode>,
}

impl BranchTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn root(&self) -> Option<&BranchNode> {
        self.root.as_ref()
    }

    fn root_mut(&mut self) -> &mut BranchNode {
        self.root.get_or_insert_with(BranchNode::root)
    }

    /// Multiplies the calls of every branch by the values of `order`.
    ///
    /// Existing calls are the outer loop. Branches that already have values for the names are
    /// left alone, and so are branches that discarded them unless `force` is set.
    pub fn parametrize(&mut self, order: &ParametrizeOrder, force: bool) {
        tracing::debug!(
            "Parametrizing `{}` with {} values",
            order.argnames.join(","),
            order.params.len()
        );
        self.root_mut().parametrize(order, force);
    }

    /// Splits every branch into one branch per alternative of `order`.
    ///
    /// `discards[i]` lists the names the branch of alternative `i` will never use.
    pub fn union(
        &mut self,
        order: &UnionOrder,
        discards: &[Vec<String>],
    ) -> Result<(), ParametrizeError> {
        let parts = order
            .alternatives
            .iter()
            .map(|alternative| alternative_part(alternative, &order.style))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            "Splitting on union `{}` into {} alternatives",
            order.union_name,
            order.alternatives.len()
        );
        self.root_mut().union(order, &parts, discards);
        Ok(())
    }

    /// Gives every discarded name a hidden not-applicable value.
    pub fn finalize(&mut self) {
        if let Some(root) = &mut self.root {
            root.finalize();
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.root.as_ref().map_or(0, BranchNode::leaf_count)
    }

    /// Flattens the tree into calls, depth first, and renders their unique ids.
    pub fn into_calls(self) -> Vec<CallSpec> {
        let mut calls = Vec::new();
        if let Some(root) = self.root {
            root.collect_calls(&mut calls);
        }
        let ids = make_unique(
            calls
                .iter()
                .map(|call| join_parts(call.id_parts()))
                .collect(),
        );
        for (call, id) in calls.iter_mut().zip(ids) {
            call.set_id(id);
        }
        calls
    }
}

impl fmt::Display for BranchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => root.write_indented(f, 0),
            None => f.write_str("<empty>"),
        }
    }
}

/// Applies `orders` to `tree`, walking the closure so that each order reaches only the branches
/// that use its names.
///
/// Orders for names of a closure node are applied on that node, in closure order below the
/// root. At the root, declared parametrizations come first in declaration order, and a split on
/// a union generated for a declaration takes that declaration's place. A split hands each child
/// branch its own copy of the orders still pending.
pub(crate) fn replay(
    tree: &mut BranchTree,
    closure: &ClosureNode,
    orders: Vec<PendingOrder>,
    test: &TestFunction,
) -> Result<(), ParametrizeError> {
    let mut pending: Vec<(usize, PendingOrder)> = orders.into_iter().enumerate().collect();
    let root = tree.root_mut();
    walk_root(root, closure, &mut pending, test)?;

    if !pending.is_empty() {
        return Err(ParametrizeError::UnknownArgument {
            test: test.name().to_string(),
            names: pending
                .iter()
                .flat_map(|(_, order)| order.names())
                .join(", "),
        });
    }
    Ok(())
}

fn walk_root(
    node: &mut BranchNode,
    closure: &ClosureNode,
    pending: &mut Vec<(usize, PendingOrder)>,
    test: &TestFunction,
) -> Result<(), ParametrizeError> {
    let rank_of = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| test.declaration_rank(name))
            .min()
            .unwrap_or(usize::MAX)
    };

    let mut ready: Vec<((usize, usize), usize)> = pending
        .iter()
        .filter(|(_, order)| matches!(order, PendingOrder::Parametrize(_)))
        .filter(|(_, order)| {
            order
                .names()
                .iter()
                .any(|name| closure.names().iter().any(|own| own == name))
        })
        .map(|(index, order)| ((rank_of(order.names().as_slice()), *index), *index))
        .collect();
    ready.sort_unstable();

    let split_key = closure.split().map_or((usize::MAX, usize::MAX), |split| {
        (rank_of(std::slice::from_ref(&split.union_name())), usize::MAX)
    });
    let (before, after): (Vec<_>, Vec<_>) =
        ready.into_iter().partition(|(key, _)| *key < split_key);

    let mut later = Vec::new();
    for (_, index) in &after {
        if let Some(position) = pending.iter().position(|(candidate, _)| candidate == index) {
            later.push(pending.remove(position));
        }
    }

    let mut consumed = BTreeSet::new();
    apply_ready(node, pending, before.iter().map(|(_, index)| *index), false, &mut consumed);
    pending.retain(|(index, _)| !consumed.contains(index));

    if let Some(split) = closure.split() {
        split_node(node, split, pending, test.name())?;
    }

    for (_, order) in &later {
        if let PendingOrder::Parametrize(order) = order {
            node.parametrize(order, false);
        }
    }
    Ok(())
}

fn walk(
    node: &mut BranchNode,
    closure: &ClosureNode,
    pending: &mut Vec<(usize, PendingOrder)>,
    test: &str,
) -> Result<BTreeSet<usize>, ParametrizeError> {
    let ready: Vec<usize> = closure
        .names()
        .iter()
        .flat_map(|name| {
            pending
                .iter()
                .filter(move |(_, order)| {
                    matches!(order, PendingOrder::Parametrize(_))
                        && order.names().contains(&name.as_str())
                })
                .map(|(index, _)| *index)
        })
        .unique()
        .collect();

    let mut consumed = BTreeSet::new();
    apply_ready(node, pending, ready, true, &mut consumed);
    pending.retain(|(index, _)| !consumed.contains(index));

    if let Some(split) = closure.split() {
        consumed.extend(split_node(node, split, pending, test)?);
    }
    Ok(consumed)
}

fn apply_ready(
    node: &mut BranchNode,
    pending: &[(usize, PendingOrder)],
    ready: impl IntoIterator<Item = usize>,
    force: bool,
    consumed: &mut BTreeSet<usize>,
) {
    for index in ready {
        if let Some((_, PendingOrder::Parametrize(order))) =
            pending.iter().find(|(candidate, _)| *candidate == index)
        {
            node.parametrize(order, force);
            consumed.insert(index);
        }
    }
}

/// Splits `node` on the union of `split`, then walks each child branch.
fn split_node(
    node: &mut BranchNode,
    split: &ClosureSplit,
    pending: &mut Vec<(usize, PendingOrder)>,
    test: &str,
) -> Result<BTreeSet<usize>, ParametrizeError> {
    let mut consumed = BTreeSet::new();
    let Some(position) = pending.iter().position(|(_, order)| {
        matches!(order, PendingOrder::Union(union) if union.union_name == split.union_name())
    }) else {
        return Err(ParametrizeError::MissingUnionOrder {
            test: test.to_string(),
            union_name: split.union_name().to_string(),
        });
    };
    let (index, order) = pending.remove(position);
    consumed.insert(index);
    let PendingOrder::Union(order) = order else {
        return Ok(consumed);
    };

    let subtree_names: Vec<Vec<String>> = split
        .children()
        .iter()
        .map(ClosureNode::all_names)
        .collect();
    let discards: Vec<Vec<String>> = subtree_names
        .iter()
        .enumerate()
        .map(|(own, names)| {
            subtree_names
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != own)
                .flat_map(|(_, other_names)| other_names)
                .filter(|name| !names.contains(*name))
                .unique()
                .cloned()
                .collect()
        })
        .collect();

    let parts = order
        .alternatives
        .iter()
        .map(|alternative| alternative_part(alternative, &order.style))
        .collect::<Result<Vec<_>, _>>()?;
    node.union(&order, &parts, &discards);

    let BranchNode::Split(branches) = node else {
        return Ok(consumed);
    };
    let mut consumed_below = BTreeSet::new();
    for (branch, child) in branches.children.iter_mut().zip(split.children()) {
        let mut branch_pending = pending.clone();
        consumed_below.extend(walk(branch, child, &mut branch_pending, test)?);
    }
    pending.retain(|(index, _)| !consumed_below.contains(index));
    consumed.extend(consumed_below);

    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::alternatives::Alternative;
    use crate::fixture::FixtureScope;
    use crate::ids::{IdStyle, RenderedParam};
    use crate::value::ParamValue;

    fn order(argnames: &str, values: &[i64]) -> ParametrizeOrder {
        ParametrizeOrder {
            argnames: argnames.split(',').map(str::to_string).collect(),
            params: values
                .iter()
                .map(|value| RenderedParam {
                    value: ParamValue::Int(*value),
                    id: value.to_string(),
                    marks: Vec::new(),
                })
                .collect(),
            indirect: false,
            scope: FixtureScope::Function,
        }
    }

    fn union(name: &str, alternatives: &[&str]) -> UnionOrder {
        UnionOrder::new(
            name,
            alternatives
                .iter()
                .map(|alternative| Alternative::fixture(name, *alternative))
                .collect(),
            IdStyle::Compact,
        )
        .unwrap()
    }

    fn ids(tree: BranchTree) -> Vec<String> {
        tree.into_calls()
            .iter()
            .map(|call| call.id().to_string())
            .collect()
    }

    #[test]
    fn parametrize_on_empty_tree_creates_a_leaf() {
        let mut tree = BranchTree::new();
        tree.parametrize(&order("a", &[1, 2]), false);
        tree.parametrize(&order("b", &[3, 4]), false);

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(ids(tree), ["1-3", "1-4", "2-3", "2-4"]);
    }

    #[test]
    fn repeated_names_are_not_parametrized_twice() {
        let mut tree = BranchTree::new();
        tree.parametrize(&order("a", &[1, 2]), false);
        tree.parametrize(&order("a", &[5, 6, 7]), false);

        assert_eq!(ids(tree), ["1", "2"]);
    }

    #[test]
    fn union_multiplies_leaves() {
        let mut tree = BranchTree::new();
        tree.parametrize(&order("a", &[1, 2]), false);
        tree.union(&union("u", &["x", "y", "z"]), &[]).unwrap();
        assert_eq!(tree.leaf_count(), 3);

        tree.union(&union("v", &["p", "q"]), &[]).unwrap();
        assert_eq!(tree.leaf_count(), 6);
    }

    #[test]
    fn discarded_names_are_skipped_then_finalized() {
        let mut tree = BranchTree::new();
        tree.union(
            &union("u", &["x", "y"]),
            &[vec!["y".to_string()], vec!["x".to_string()]],
        )
        .unwrap();
        tree.parametrize(&order("x", &[1, 2]), false);
        tree.parametrize(&order("y", &[3]), false);

        assert_snapshot!(tree, @r"
        split u
          filtered [u=x] discarded [y]
            /x-1
            /x-2
          filtered [u=y] discarded [x]
            /y-3
        ");

        tree.finalize();
        let calls = tree.into_calls();
        assert!(calls[0].is_not_applicable("y"));
        assert!(calls[2].is_not_applicable("x"));
        assert_eq!(
            calls.iter().map(CallSpec::id).collect::<Vec<_>>(),
            ["/x-1", "/x-2", "/y-3"]
        );
    }

    #[test]
    fn forcing_reclaims_discarded_names() {
        let mut tree = BranchTree::new();
        tree.union(&union("u", &["x", "y"]), &[vec!["y".to_string()], Vec::new()])
            .unwrap();
        tree.parametrize(&order("y", &[3, 4]), true);
        tree.finalize();

        let calls = tree.into_calls();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|call| !call.is_not_applicable("y")));
    }

    #[test]
    fn not_applicable_values_stay_out_of_ids() {
        let mut tree = BranchTree::new();
        tree.union(&union("u", &["x", "y"]), &[vec!["y".to_string()], vec!["x".to_string()]])
            .unwrap();
        tree.finalize();

        let calls = tree.into_calls();
        assert_eq!(calls[0].id(), "/x");
        assert_eq!(calls[0].id_parts().len(), 1);
    }
}
