//! Turning parameter lists that contain fixture references into union alternatives.
//!
//! Runs of plain values, lone fixture references and tuples mixing references with values each
//! become one alternative of a union, backed by a dedicated fixture where needed.

use itertools::Itertools;

use crate::argset::FixtureRefAt;
use crate::error::{FixtureError, ParametrizeError};
use crate::fixture::{FixtureDef, FixtureNamespace, FixtureScope, param_value};
use crate::ids::RenderedParam;
use crate::value::{Mark, ParamValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternativeKind {
    /// A member of an explicit fixture union.
    Fixture,
    /// One plain value at `index`, returned by a fixture that is not itself parametrized.
    SingleParam { index: usize },
    /// The plain values in `from..to`, carried by one parametrized fixture.
    MultiParam { from: usize, to: usize },
    /// The fixture referenced at `index`.
    FixtureParam { index: usize },
    /// The tuple at `index`, reassembled from the fixtures it references.
    ProductParam { index: usize },
}

/// One branch of a union fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    union_name: String,
    alternative_name: String,
    id: String,
    marks: Vec<Mark>,
    kind: AlternativeKind,
}

impl Alternative {
    pub fn fixture(union_name: impl Into<String>, alternative_name: impl Into<String>) -> Self {
        let alternative_name = alternative_name.into();
        Self {
            union_name: union_name.into(),
            id: alternative_name.clone(),
            alternative_name,
            marks: Vec::new(),
            kind: AlternativeKind::Fixture,
        }
    }

    fn param(
        union_name: &str,
        alternative_name: String,
        id: String,
        marks: Vec<Mark>,
        kind: AlternativeKind,
    ) -> Self {
        Self {
            union_name: union_name.to_string(),
            alternative_name,
            id,
            marks,
            kind,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Self {
        self.marks.extend(marks);
        self
    }

    pub fn union_name(&self) -> &str {
        &self.union_name
    }

    /// The fixture this alternative selects.
    pub fn alternative_name(&self) -> &str {
        &self.alternative_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub const fn kind(&self) -> AlternativeKind {
        self.kind
    }
}

/// Builds the alternatives covering every value of `params`, in order.
///
/// Fixtures backing the alternatives are registered in `namespace` under names derived from
/// `union_name`.
pub(crate) fn build_alternatives(
    namespace: &mut FixtureNamespace,
    target: &str,
    union_name: &str,
    argnames: &[String],
    params: Vec<RenderedParam>,
    fixture_refs: &[FixtureRefAt],
    scope: FixtureScope,
) -> Result<Vec<Alternative>, ParametrizeError> {
    let mut alternatives: Vec<Alternative> = Vec::new();
    let mut run: Vec<(usize, RenderedParam)> = Vec::new();

    for (index, param) in params.into_iter().enumerate() {
        let Some(found) = fixture_refs.iter().find(|found| found.index == index) else {
            run.push((index, param));
            continue;
        };

        if !run.is_empty() {
            alternatives.push(plain_run(namespace, union_name, std::mem::take(&mut run), scope));
        }

        let alternative = match &found.positions {
            None => {
                let Some(fixture) = param.value.as_fixture_ref() else {
                    continue;
                };
                Alternative::param(
                    union_name,
                    fixture.name().to_string(),
                    param.id,
                    param.marks,
                    AlternativeKind::FixtureParam { index },
                )
            }
            Some(_) => product(namespace, target, union_name, argnames, index, param, scope)?,
        };

        if alternatives
            .iter()
            .any(|existing| existing.alternative_name == alternative.alternative_name)
        {
            tracing::warn!(
                "`{target}`: fixture `{}` is referenced more than once in `{}`, keeping the first",
                alternative.alternative_name,
                argnames.join(",")
            );
            continue;
        }
        alternatives.push(alternative);
    }

    if !run.is_empty() {
        alternatives.push(plain_run(namespace, union_name, run, scope));
    }

    tracing::debug!(
        "Built {} alternatives for union `{union_name}`: {}",
        alternatives.len(),
        alternatives.iter().map(Alternative::alternative_name).join(", ")
    );

    Ok(alternatives)
}

/// A run of plain values. A single value is returned as is, several are parametrized.
fn plain_run(
    namespace: &mut FixtureNamespace,
    union_name: &str,
    run: Vec<(usize, RenderedParam)>,
    scope: FixtureScope,
) -> Alternative {
    let from = run.first().map_or(0, |(index, _)| *index);
    let to = run.last().map_or(from, |(index, _)| index + 1);

    if let [(index, param)] = run.as_slice() {
        let name = namespace.register_generated(
            FixtureDef::constant(format!("{union_name}_is_P{index}"), param.value.clone())
                .with_scope(scope),
        );
        return Alternative::param(
            union_name,
            name,
            param.id.clone(),
            param.marks.clone(),
            AlternativeKind::SingleParam { index: *index },
        );
    }

    let params = run.into_iter().map(|(_, param)| param).collect();
    let name = namespace.register_generated(
        FixtureDef::function(
            format!("{union_name}_is_P{from}toP{}", to - 1),
            param_value,
        )
        .with_scope(scope)
        .with_params(params),
    );
    Alternative::param(
        union_name,
        name.clone(),
        name,
        Vec::new(),
        AlternativeKind::MultiParam { from, to },
    )
}

/// A tuple mixing fixture references and plain values.
fn product(
    namespace: &mut FixtureNamespace,
    target: &str,
    union_name: &str,
    argnames: &[String],
    index: usize,
    param: RenderedParam,
    scope: FixtureScope,
) -> Result<Alternative, ParametrizeError> {
    let items = param.value.as_tuple().map(<[ParamValue]>::to_vec).unwrap_or_default();
    if items.len() != argnames.len() {
        return Err(ParametrizeError::ArgCountMismatch {
            target: target.to_string(),
            argnames: argnames.join(","),
            index,
            value: param.value.to_string(),
            expected: argnames.len(),
            actual: items.len(),
        });
    }

    let dependencies: Vec<String> = items
        .iter()
        .filter_map(ParamValue::as_fixture_ref)
        .map(|fixture| fixture.name().to_string())
        .unique()
        .collect();
    let scope = dependencies
        .iter()
        .map(|dependency| namespace.scope_of(dependency))
        .fold(scope, std::cmp::min);

    let fixture = format!("{union_name}_is_P{index}");
    let fixture_name = fixture.clone();
    let name = namespace.register_generated(
        FixtureDef::function(fixture, move |request| {
            items
                .iter()
                .map(|item| match item {
                    ParamValue::FixtureRef(dependency) => {
                        request.require_arg(dependency.name()).cloned()
                    }
                    value => value
                        .resolve_for(request.invocation())
                        .map_err(|error| FixtureError::failed(&fixture_name, error.to_string())),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::Tuple)
        })
        .with_scope(scope)
        .with_argnames(dependencies),
    );

    Ok(Alternative::param(
        union_name,
        name,
        param.id,
        param.marks,
        AlternativeKind::ProductParam { index },
    ))
}
