//! Fixtures built from values and from other fixtures.

use casework_metadata::CollisionPolicy;
use itertools::Itertools;

use crate::alternatives::{Alternative, build_alternatives};
use crate::argset::{ArgNames, ArgValues, normalize};
use crate::error::{FixtureError, ParametrizeError};
use crate::fixture::{FixtureDef, FixtureNamespace, FixtureScope, param_value};
use crate::ids::{IdStyle, render_params};
use crate::value::{FixtureRef, fixture_ref};

/// Registers a union of the fixtures named in `alternatives`.
///
/// Each call of a test using the union receives the value of exactly one alternative, and only
/// that alternative is set up. `style` defaults to the namespace's union style.
pub fn fixture_union<I, S>(
    namespace: &mut FixtureNamespace,
    name: &str,
    alternatives: I,
    style: Option<IdStyle>,
) -> Result<FixtureRef, FixtureError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let alternatives: Vec<String> = alternatives.into_iter().map(Into::into).collect();
    if alternatives.is_empty() {
        return Err(FixtureError::EmptyUnion {
            name: name.to_string(),
        });
    }
    if let Some(duplicate) = alternatives.iter().duplicates().next() {
        return Err(FixtureError::DuplicateAlternative {
            union_name: name.to_string(),
            alternative: duplicate.clone(),
        });
    }

    let union_name = namespace.claim_name(name, namespace.config().on_collision)?;
    let scope = alternatives
        .iter()
        .map(|alternative| namespace.scope_of(alternative))
        .min()
        .unwrap_or_default();
    let style = style.unwrap_or_else(|| namespace.config().union_style.clone());
    let alternatives = alternatives
        .into_iter()
        .map(|alternative| Alternative::fixture(&union_name, alternative))
        .collect();

    let union_name = namespace.register_with(
        FixtureDef::union(union_name, alternatives, style).with_scope(scope),
        CollisionPolicy::Override,
    )?;
    Ok(fixture_ref(union_name))
}

/// Registers a fixture parametrized with `argvalues`.
///
/// Values referencing other fixtures turn the fixture into a union of those fixtures and of the
/// plain values.
pub fn param_fixture(
    namespace: &mut FixtureNamespace,
    name: &str,
    argvalues: impl Into<ArgValues>,
    ids: Option<&[String]>,
) -> Result<FixtureRef, ParametrizeError> {
    let policy = namespace.config().on_collision;
    register_params(namespace, name, ArgNames::parse(name), argvalues.into(), ids, policy)
        .map(fixture_ref)
}

/// Registers one fixture per name in `argnames`, jointly parametrized with `argvalues`.
///
/// The values are carried by a generated root fixture that the returned fixtures unpack.
pub fn param_fixtures(
    namespace: &mut FixtureNamespace,
    argnames: impl Into<ArgNames>,
    argvalues: impl Into<ArgValues>,
) -> Result<Vec<FixtureRef>, ParametrizeError> {
    let argnames = argnames.into();
    if let [argname] = argnames.as_slice() {
        let argname = argname.clone();
        return param_fixture(namespace, &argname, argvalues, None).map(|fixture| vec![fixture]);
    }

    let root_name = format!("{}__param_fixtures_root", argnames.as_slice().join("__"));
    let root = register_params(
        namespace,
        &root_name,
        argnames.clone(),
        argvalues.into(),
        None,
        CollisionPolicy::Rename,
    )?;
    Ok(unpack_fixture(namespace, argnames, &fixture_ref(root))?)
}

/// Registers one fixture per name in `argnames`, each returning its element of `source`.
pub fn unpack_fixture(
    namespace: &mut FixtureNamespace,
    argnames: impl Into<ArgNames>,
    source: &FixtureRef,
) -> Result<Vec<FixtureRef>, FixtureError> {
    let scope = namespace.scope_of(source.name());
    argnames
        .into()
        .into_vec()
        .into_iter()
        .enumerate()
        .map(|(index, argname)| {
            let source_name = source.name().to_string();
            let fixture = argname.clone();
            let def = FixtureDef::function(argname, move |request| {
                let value = request.require_arg(&source_name)?;
                value
                    .as_tuple()
                    .and_then(|items| items.get(index))
                    .cloned()
                    .ok_or_else(|| {
                        FixtureError::failed(
                            &fixture,
                            format!("cannot take element {index} of `{source_name}` value `{value}`"),
                        )
                    })
            })
            .with_argnames([source.name()])
            .with_scope(scope);
            namespace.register(def).map(fixture_ref)
        })
        .collect()
}

fn register_params(
    namespace: &mut FixtureNamespace,
    name: &str,
    argnames: ArgNames,
    argvalues: ArgValues,
    ids: Option<&[String]>,
    policy: CollisionPolicy,
) -> Result<String, ParametrizeError> {
    let style = namespace.config().param_style.clone();
    let normalized = normalize(name, argnames, argvalues)?;
    let argnames = normalized.argnames.clone();
    let fixture_refs = normalized.fixture_refs.clone();
    let params = render_params(name, &argnames, normalized.entries, ids, &style)?;
    let claimed = namespace.claim_name(name, policy)?;

    if fixture_refs.is_empty() {
        return Ok(namespace.register_with(
            FixtureDef::function(claimed, param_value).with_params(params),
            CollisionPolicy::Override,
        )?);
    }

    let alternatives = build_alternatives(
        namespace,
        name,
        &claimed,
        &argnames,
        params,
        &fixture_refs,
        FixtureScope::Function,
    )?;
    Ok(namespace.register_with(
        FixtureDef::union(claimed, alternatives, IdStyle::None),
        CollisionPolicy::Override,
    )?)
}
