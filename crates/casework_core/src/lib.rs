pub mod alternatives;
pub mod argset;
pub mod case;
pub mod error;
pub mod fixture;
pub mod function;
pub mod ids;
pub mod lazy;
pub mod metafunc;
pub mod parametrize;
pub mod resolve;
pub mod tree;
pub mod value;

pub use alternatives::{Alternative, AlternativeKind};
pub use argset::{ArgNames, ArgValues, normalize};
pub use case::{
    Case, CaseCatalog, CaseClass, CaseItem, CaseKind, CaseModule, CaseSelector, CaseSource,
    collect_cases, parametrize_with_cases,
};
pub use error::{CaseError, FixtureError, LazyError, ParametrizeError, ResolveError};
pub use fixture::{
    ArgProvider, FixtureCache, FixtureDef, FixtureKind, FixtureNamespace, FixtureRequest,
    FixtureScope, NamespaceConfig, RequiresFixtures, fixture_union, param_fixture, param_fixtures,
    unpack_fixture,
};
pub use function::TestFunction;
pub use ids::{IdGen, IdStyle};
pub use lazy::{InvocationId, LazyTuple, LazyTupleItem, LazyValue};
pub use metafunc::{Metafunc, generate_calls};
pub use parametrize::{Parametrize, ParametrizeOrder, PendingOrder, UnionOrder};
pub use resolve::{FixtureResolver, Resolved};
pub use tree::{BranchTree, CallParam, CallSpec, CallValue, ClosureNode};
pub use value::{FixtureRef, Mark, Param, ParamValue, fixture_ref};
