use casework::{
    Case, CaseCatalog, CaseClass, CaseKind, CaseModule, CaseSelector, CaseSource,
    FixtureDef, FixtureNamespace, FixtureResolver, ParamValue, Resolved, TestFunction,
    collect_cases, generate_calls, parametrize_with_cases,
};
use pretty_assertions::assert_eq;

use crate::common::{TestContext, ids};

const MODULE: &str = "tests.test_parser_cases";

fn method(name: &str, position: u32, value: i64) -> Case {
    Case::returning(name, MODULE, position, value).with_kind(CaseKind::Method {
        takes_self: true,
        is_static: false,
    })
}

fn parser_cases() -> CaseModule {
    CaseModule::new(MODULE)
        .with_case(Case::returning("case_a", MODULE, 0, 1))
        .with_case(Case::returning("case_b", MODULE, 1, 2).with_tags(["slow"]))
        .with_class(
            CaseClass::new("CaseErrors", MODULE, 2)
                .with_case(method("case_empty", 0, -1))
                .with_case(method("case_truncated", 1, -2).with_tags(["slow"])),
        )
        .with_case(Case::returning("helper", MODULE, 3, 0))
}

#[test]
fn filtering_by_tag_keeps_tagged_cases() {
    let module = CaseModule::new(MODULE)
        .with_case(Case::returning("case_a", MODULE, 0, 1))
        .with_case(Case::returning("case_b", MODULE, 1, 2).with_tags(["slow"]));

    let cases = collect_cases(
        CaseSource::Module(&module),
        &CaseSelector::new().with_tag("slow"),
    )
    .unwrap();

    assert_eq!(cases.iter().map(Case::name).collect::<Vec<_>>(), ["case_b"]);
}

#[test]
fn cases_parametrize_a_test_end_to_end() -> anyhow::Result<()> {
    let mut catalog = CaseCatalog::new();
    catalog.insert(parser_cases());
    let module = catalog
        .companion_of("tests.test_parser")
        .expect("companion module is registered");

    let project = TestContext::new().project()?;
    let cases = collect_cases(CaseSource::Module(module), &project.case_selector()?)?;
    let mut namespace = project.namespace();
    let mut test = TestFunction::new("test_parse", ["expected"]);
    let parametrize = parametrize_with_cases(&mut namespace, test.name(), "expected", &cases)?;
    test.parametrize(&mut namespace, parametrize)?;

    let calls = generate_calls(&test, &namespace)?;
    assert_eq!(ids(&calls), ["a", "b", "empty", "truncated"]);

    let mut resolver = FixtureResolver::new(&namespace);
    let values = calls
        .iter()
        .map(|call| -> anyhow::Result<Option<ParamValue>> {
            Ok(resolver
                .resolve_call(&test, call)?
                .remove(0)
                .1
                .into_value())
        })
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        values,
        [1, 2, -1, -2].map(|value| Some(ParamValue::Int(value)))
    );
    Ok(())
}

#[test]
fn configured_tag_filters_apply_to_collection() -> anyhow::Result<()> {
    let context = TestContext::with_config(
        r#"
[cases]
tags = "not slow"
"#,
    );
    let project = context.project()?;

    let cases = collect_cases(
        CaseSource::Module(&parser_cases()),
        &project.case_selector()?,
    )?;

    assert_eq!(
        cases.iter().map(Case::id).collect::<Vec<_>>(),
        ["a", "empty"]
    );
    Ok(())
}

#[test]
fn configured_globs_apply_to_case_ids() -> anyhow::Result<()> {
    let context = TestContext::with_config(
        r#"
[cases]
glob = "*t*"
"#,
    );
    let project = context.project()?;

    let cases = collect_cases(
        CaseSource::Module(&parser_cases()),
        &project.case_selector()?,
    )?;

    assert_eq!(
        cases.iter().map(Case::id).collect::<Vec<_>>(),
        ["empty", "truncated"]
    );
    Ok(())
}

#[test]
fn custom_prefixes_are_stripped_from_ids() -> anyhow::Result<()> {
    let context = TestContext::with_config(
        r#"
[cases]
prefix = "data_"
"#,
    );
    let project = context.project()?;
    let module = CaseModule::new(MODULE)
        .with_case(Case::returning("data_small", MODULE, 0, 1))
        .with_case(Case::returning("case_ignored", MODULE, 1, 2));

    let cases = collect_cases(CaseSource::Module(&module), &project.case_selector()?)?;

    assert_eq!(cases.iter().map(Case::id).collect::<Vec<_>>(), ["small"]);
    Ok(())
}

#[test]
fn cases_requiring_fixtures_are_resolved_with_them() {
    let mut namespace = FixtureNamespace::new();
    namespace
        .register(FixtureDef::constant("size", ParamValue::Int(3)))
        .unwrap();
    let cases = [
        Case::new("case_sized", MODULE, 0, |request| {
            let size = request.require_arg("size")?.as_int().unwrap_or_default();
            Ok(ParamValue::tuple([size, size * 2]))
        })
        .with_argnames(["size"]),
        Case::returning("case_fixed", MODULE, 1, (1, 1)),
    ];
    let cases = collect_cases(CaseSource::Cases(&cases), &CaseSelector::new()).unwrap();
    let mut test = TestFunction::new("test_grow", ["before", "after"]);
    let parametrize =
        parametrize_with_cases(&mut namespace, "test_grow", "before,after", &cases).unwrap();
    test.parametrize(&mut namespace, parametrize).unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();
    assert_eq!(ids(&calls), ["sized", "fixed"]);

    let mut resolver = FixtureResolver::new(&namespace);
    assert_eq!(
        resolver.resolve_call(&test, &calls[0]).unwrap(),
        [
            ("before".to_string(), Resolved::Used(ParamValue::Int(3))),
            ("after".to_string(), Resolved::Used(ParamValue::Int(6))),
        ]
    );
}
