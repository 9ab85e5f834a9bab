use casework_metadata::CollisionPolicy;

use crate::alternatives::{Alternative, build_alternatives};
use crate::argset::{ArgNames, ArgValues, normalize};
use crate::error::{FixtureError, ParametrizeError};
use crate::fixture::{ArgProvider, FixtureDef, FixtureNamespace, FixtureScope};
use crate::ids::{IdStyle, RenderedParam, render_params};

/// A parametrization as declared by a test author.
#[derive(Debug, Clone)]
pub struct Parametrize {
    argnames: ArgNames,
    argvalues: ArgValues,
    ids: Option<Vec<String>>,
    idstyle: Option<IdStyle>,
    scope: FixtureScope,
}

impl Parametrize {
    pub fn new(argnames: impl Into<ArgNames>, argvalues: impl Into<ArgValues>) -> Self {
        Self {
            argnames: argnames.into(),
            argvalues: argvalues.into(),
            ids: None,
            idstyle: None,
            scope: FixtureScope::Function,
        }
    }

    /// One explicit id per value.
    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_idstyle(mut self, idstyle: IdStyle) -> Self {
        self.idstyle = Some(idstyle);
        self
    }

    /// Scope of the fixtures generated for these values.
    #[must_use]
    pub const fn with_scope(mut self, scope: FixtureScope) -> Self {
        self.scope = scope;
        self
    }
}

/// A plain parametrization waiting to be applied to the branch tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametrizeOrder {
    pub argnames: Vec<String>,
    pub params: Vec<RenderedParam>,
    /// Whether the values are handed to fixtures of the same name rather than to the test.
    pub indirect: bool,
    pub scope: FixtureScope,
}

impl ParametrizeOrder {
    /// The order that parametrizes a fixture with its own params.
    pub fn for_fixture(fixture: &FixtureDef) -> Option<Self> {
        fixture.params().map(|params| Self {
            argnames: vec![fixture.name().to_string()],
            params: params.to_vec(),
            indirect: true,
            scope: fixture.scope(),
        })
    }
}

/// A union waiting to split the branch tree.
#[derive(Debug, Clone)]
pub struct UnionOrder {
    pub union_name: String,
    pub alternatives: Vec<Alternative>,
    pub style: IdStyle,
}

impl UnionOrder {
    pub fn new(
        union_name: impl Into<String>,
        alternatives: Vec<Alternative>,
        style: IdStyle,
    ) -> Result<Self, FixtureError> {
        let union_name = union_name.into();
        if alternatives.is_empty() {
            return Err(FixtureError::EmptyUnion { name: union_name });
        }
        Ok(Self {
            union_name,
            alternatives,
            style,
        })
    }

    pub fn for_fixture(fixture: &FixtureDef) -> Option<Result<Self, FixtureError>> {
        fixture.as_union().map(|union| {
            Self::new(
                fixture.name(),
                union.alternatives.clone(),
                union.style.clone(),
            )
        })
    }
}

/// An order recorded during collection and replayed when the calls are built.
#[derive(Debug, Clone)]
pub enum PendingOrder {
    Parametrize(ParametrizeOrder),
    Union(UnionOrder),
}

impl PendingOrder {
    /// The parameter names this order provides values for.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Parametrize(order) => order.argnames.iter().map(String::as_str).collect(),
            Self::Union(order) => vec![order.union_name.as_str()],
        }
    }
}

/// How a declared parametrization reaches its target.
#[derive(Debug, Clone)]
pub(crate) enum Declared {
    /// Plain values, applied as they are.
    Direct(ParametrizeOrder),
    /// Values containing fixture references, routed through a generated union fixture.
    Provided(Vec<(String, ArgProvider)>),
}

/// Normalizes a parametrization of `target` and decides how it is provided.
pub(crate) fn declare(
    namespace: &mut FixtureNamespace,
    target: &str,
    parametrize: Parametrize,
) -> Result<Declared, ParametrizeError> {
    let Parametrize {
        argnames,
        argvalues,
        ids,
        idstyle,
        scope,
    } = parametrize;
    let style = idstyle.unwrap_or_else(|| namespace.config().param_style.clone());

    let normalized = normalize(target, argnames, argvalues)?;
    let argnames = normalized.argnames.clone();
    let fixture_refs = normalized.fixture_refs.clone();
    let params = render_params(target, &argnames, normalized.entries, ids.as_deref(), &style)?;

    if fixture_refs.is_empty() {
        return Ok(Declared::Direct(ParametrizeOrder {
            argnames,
            params,
            indirect: false,
            scope,
        }));
    }

    let union_name = namespace.claim_name(
        &format!("{target}_{}", argnames.join("_")),
        CollisionPolicy::Rename,
    )?;
    let alternatives = build_alternatives(
        namespace,
        target,
        &union_name,
        &argnames,
        params,
        &fixture_refs,
        scope,
    )?;
    let union_scope = alternatives
        .iter()
        .map(|alternative| namespace.scope_of(alternative.alternative_name()))
        .min()
        .unwrap_or(scope);

    let union_name = namespace.register_generated(
        FixtureDef::union(union_name, alternatives, IdStyle::None).with_scope(union_scope),
    );

    Ok(Declared::Provided(ArgProvider::for_argnames(
        &union_name,
        &argnames,
    )))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::{Param, fixture_ref};

    #[test]
    fn plain_values_are_applied_directly() {
        let mut namespace = FixtureNamespace::new();

        let declared = declare(
            &mut namespace,
            "test_add",
            Parametrize::new("a,b", vec![(1, 2), (3, 4)]).with_ids(["small", "big"]),
        )
        .unwrap();

        let Declared::Direct(order) = declared else {
            panic!("expected a direct parametrization");
        };
        assert_eq!(order.argnames, ["a", "b"]);
        assert!(!order.indirect);
        assert_eq!(
            order.params.iter().map(|param| param.id.as_str()).collect::<Vec<_>>(),
            ["small", "big"]
        );
        assert!(namespace.is_empty());
    }

    #[test]
    fn fixture_references_go_through_a_union() {
        let mut namespace = FixtureNamespace::new();
        namespace
            .register(FixtureDef::constant("db", "sqlite".into()).with_scope(FixtureScope::Module))
            .unwrap();

        let declared = declare(
            &mut namespace,
            "test_query",
            Parametrize::new("conn", vec![Param::new(fixture_ref("db")), Param::new("memory")]),
        )
        .unwrap();

        let Declared::Provided(providers) = declared else {
            panic!("expected providers");
        };
        assert_eq!(
            providers,
            vec![("conn".to_string(), ArgProvider::whole("test_query_conn"))]
        );
        let union = namespace.get("test_query_conn").unwrap();
        assert_eq!(union.scope(), FixtureScope::Function);
        let alternatives = &union.as_union().unwrap().alternatives;
        assert_eq!(
            alternatives
                .iter()
                .map(Alternative::alternative_name)
                .collect::<Vec<_>>(),
            ["db", "test_query_conn_is_P1"]
        );
    }

    #[test]
    fn empty_unions_are_rejected() {
        let error = UnionOrder::new("nothing", Vec::new(), IdStyle::Compact).unwrap_err();
        assert_eq!(error.to_string(), "union fixture `nothing` has no alternatives");
    }
}
