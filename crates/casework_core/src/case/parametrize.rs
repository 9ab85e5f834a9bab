use crate::argset::ArgNames;
use crate::case::Case;
use crate::error::{FixtureError, LazyError, ParametrizeError};
use crate::fixture::{FixtureDef, FixtureNamespace, FixtureRequest};
use crate::lazy::{InvocationId, LazyValue};
use crate::parametrize::Parametrize;
use crate::value::{Param, fixture_ref};

/// Turns `cases` into the parametrization of `argnames` on `target`.
///
/// Cases without arguments become lazy values, evaluated only when a call runs. Cases that need
/// fixtures are registered as fixtures of their own and referenced, so their arguments are
/// resolved like any other fixture's. With several argnames, each case result is destructured.
pub fn parametrize_with_cases(
    namespace: &mut FixtureNamespace,
    target: &str,
    argnames: impl Into<ArgNames>,
    cases: &[Case],
) -> Result<Parametrize, ParametrizeError> {
    let argnames = argnames.into();
    let argvalues = cases
        .iter()
        .map(|case| case_param(namespace, target, case))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "Parametrizing `{argnames}` of `{target}` with {} cases",
        argvalues.len()
    );
    Ok(Parametrize::new(argnames, argvalues))
}

fn case_param(
    namespace: &mut FixtureNamespace,
    target: &str,
    case: &Case,
) -> Result<Param, FixtureError> {
    let func = case.func();

    if case.argnames().is_empty() {
        let name = case.name().to_string();
        let lazy = LazyValue::new(case.name(), move || {
            func(&FixtureRequest::new(&name, None, &[], InvocationId::DETACHED))
                .map_err(|error| LazyError::failed(&name, error.to_string()))
        })
        .with_id(case.id())
        .with_marks(case.marks().iter().cloned());
        return Ok(Param::new(lazy));
    }

    let fixture = namespace.register_generated(
        FixtureDef::function(format!("{target}_{}", case.name()), move |request| func(request))
            .with_argnames(case.argnames().iter().cloned()),
    );
    tracing::trace!("Case `{}` needs fixtures, provided by `{fixture}`", case.name());
    Ok(Param::new(fixture_ref(fixture))
        .with_id(case.id())
        .with_marks(case.marks().iter().cloned()))
}
