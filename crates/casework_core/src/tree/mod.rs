mod branch;
mod call;
mod closure;

pub use branch::{BranchNode, BranchTree, FilteredLeaf, Leaf, Split};
pub(crate) use branch::replay;
pub use call::{CallParam, CallSpec, CallValue};
pub use closure::{ClosureNode, ClosureSplit};
