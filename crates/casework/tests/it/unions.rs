use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use casework::{
    FixtureError, FixtureNamespace, FixtureResolver, FixtureScope, IdStyle, ParamValue,
    Parametrize, Resolved, TestFunction, fixture_ref, fixture_union, generate_calls,
    param_fixture,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{TestContext, constant, counted, ids, runs};

#[test]
fn a_union_of_two_fixtures_gives_two_calls() {
    let mut namespace = FixtureNamespace::new();
    namespace.register(constant("x")).unwrap();
    namespace.register(constant("y")).unwrap();
    fixture_union(&mut namespace, "u", ["x", "y"], None).unwrap();
    let test = TestFunction::new("test_u", ["u"]);

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(ids(&calls), ["x", "y"]);
    let mut resolver = FixtureResolver::new(&namespace);
    let values: Vec<_> = calls
        .iter()
        .map(|call| resolver.resolve_call(&test, call).unwrap())
        .collect();
    assert_eq!(
        values,
        [
            vec![("u".to_string(), Resolved::Used(ParamValue::from("x")))],
            vec![("u".to_string(), Resolved::Used(ParamValue::from("y")))],
        ]
    );
}

#[test]
fn parametrized_alternatives_only_multiply_their_own_branch() -> anyhow::Result<()> {
    let context = TestContext::new();
    let mut namespace = context.project()?.namespace();
    param_fixture(&mut namespace, "x", vec![1, 2], None)?;
    namespace.register(constant("y"))?;
    fixture_union(&mut namespace, "u", ["x", "y"], None)?;
    let test = TestFunction::new("test_u", ["u"]);

    let calls = generate_calls(&test, &namespace)?;

    assert_eq!(ids(&calls), ["/x-1", "/x-2", "/y"]);
    assert!(calls[2].is_not_applicable("x"));

    let mut resolver = FixtureResolver::new(&namespace);
    let last = resolver.resolve_call(&test, &calls[2])?;
    assert_eq!(last, [("u".to_string(), Resolved::Used(ParamValue::from("y")))]);
    let first = resolver.resolve_call(&test, &calls[0])?;
    assert_eq!(first, [("u".to_string(), Resolved::Used(ParamValue::Int(1)))]);
    Ok(())
}

#[test]
fn sibling_unions_share_a_parametrized_dependency() -> anyhow::Result<()> {
    let context = TestContext::new();
    let mut namespace = context.project()?.namespace();
    let runs_a = Arc::new(AtomicUsize::new(0));
    let runs_c = Arc::new(AtomicUsize::new(0));
    param_fixture(&mut namespace, "db", vec![1, 2], None)?;
    namespace.register(counted("a", &runs_a).with_argnames(["db"]))?;
    namespace.register(constant("b"))?;
    namespace.register(counted("c", &runs_c).with_argnames(["db"]))?;
    namespace.register(constant("d"))?;
    fixture_union(&mut namespace, "u1", ["a", "b"], None)?;
    fixture_union(&mut namespace, "u2", ["c", "d"], None)?;
    let test = TestFunction::new("test_pair", ["u1", "u2"]);

    let calls = generate_calls(&test, &namespace)?;

    assert_eq!(
        ids(&calls),
        ["/a-1-/c", "/a-2-/c", "/a-1-/d", "/a-2-/d", "/b-/c-1", "/b-/c-2", "/b-/d"]
    );
    let without_db: Vec<_> = calls
        .iter()
        .map(|call| call.is_not_applicable("db"))
        .collect();
    assert_eq!(without_db, [false, false, false, false, false, false, true]);

    let mut resolver = FixtureResolver::new(&namespace);
    let last = resolver.resolve_call(&test, &calls[6])?;
    assert_eq!(
        last,
        [
            ("u1".to_string(), Resolved::Used(ParamValue::from("b"))),
            ("u2".to_string(), Resolved::Used(ParamValue::from("d"))),
        ]
    );
    assert_eq!(runs(&runs_a), 0);
    assert_eq!(runs(&runs_c), 0);
    Ok(())
}

#[rstest]
#[case::two_alternatives(&["x", "y"], &[1, 2])]
#[case::three_alternatives(&["x", "y", "z"], &[1, 2])]
#[case::wide_parametrization(&["x", "y"], &[1, 2, 3, 4])]
fn unions_multiply_the_calls(#[case] alternatives: &[&str], #[case] values: &[i64]) {
    let mut namespace = FixtureNamespace::new();
    for alternative in alternatives {
        namespace.register(constant(alternative)).unwrap();
    }
    fixture_union(&mut namespace, "u", alternatives.iter().copied(), None).unwrap();
    let mut test = TestFunction::new("test_u", ["a", "u"]);
    test.parametrize(&mut namespace, Parametrize::new("a", values.to_vec()))
        .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(calls.len(), alternatives.len() * values.len());
    for alternative in alternatives {
        let selecting = calls
            .iter()
            .filter(|call| {
                call.selected_alternative("u")
                    .is_some_and(|selected| selected.alternative_name() == *alternative)
            })
            .count();
        assert_eq!(selecting, values.len());
    }
}

#[test]
fn unions_of_unions_nest_their_ids() {
    let mut namespace = FixtureNamespace::new();
    for name in ["x", "y", "z"] {
        namespace.register(constant(name)).unwrap();
    }
    fixture_union(&mut namespace, "inner", ["x", "y"], None).unwrap();
    fixture_union(&mut namespace, "outer", ["inner", "z"], None).unwrap();
    let test = TestFunction::new("test_nested", ["outer"]);

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(ids(&calls), ["inner-x", "inner-y", "z"]);
    assert!(calls[2].is_not_applicable("inner"));

    let mut resolver = FixtureResolver::new(&namespace);
    let values = resolver.resolve_call(&test, &calls[1]).unwrap();
    assert_eq!(
        values,
        [("outer".to_string(), Resolved::Used(ParamValue::from("y")))]
    );
}

#[test]
fn fixtures_of_branches_not_taken_never_run() {
    let runs_x = Arc::new(AtomicUsize::new(0));
    let runs_y = Arc::new(AtomicUsize::new(0));
    let mut namespace = FixtureNamespace::new();
    namespace.register(counted("x", &runs_x)).unwrap();
    namespace.register(counted("y", &runs_y)).unwrap();
    fixture_union(&mut namespace, "u", ["x", "y"], Some(IdStyle::Explicit)).unwrap();
    let test = TestFunction::new("test_u", ["u"]);

    let calls = generate_calls(&test, &namespace).unwrap();
    assert_eq!(ids(&calls), ["u/x", "u/y"]);

    let mut resolver = FixtureResolver::new(&namespace);
    resolver.resolve_call(&test, &calls[0]).unwrap();

    assert_eq!(runs(&runs_x), 1);
    assert_eq!(runs(&runs_y), 0);
}

#[test]
fn session_fixtures_shared_by_branches_run_once() {
    let setups = Arc::new(AtomicUsize::new(0));
    let mut namespace = FixtureNamespace::new();
    namespace
        .register(counted("db", &setups).with_scope(FixtureScope::Session))
        .unwrap();
    namespace
        .register(constant("left").with_argnames(["db"]))
        .unwrap();
    namespace
        .register(constant("right").with_argnames(["db"]))
        .unwrap();
    fixture_union(&mut namespace, "side", ["left", "right"], None).unwrap();
    let test = TestFunction::new("test_side", ["side"]);

    let calls = generate_calls(&test, &namespace).unwrap();
    let mut resolver = FixtureResolver::new(&namespace);
    for call in &calls {
        resolver.resolve_call(&test, call).unwrap();
    }

    assert_eq!(calls.len(), 2);
    assert_eq!(runs(&setups), 1);
}

#[test]
fn fixture_references_in_values_select_the_fixture() {
    let mut namespace = FixtureNamespace::new();
    namespace.register(constant("db")).unwrap();
    let mut test = TestFunction::new("test_source", ["source"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "source",
            vec![ParamValue::from(fixture_ref("db")), ParamValue::from("inline")],
        ),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();
    assert_eq!(ids(&calls), ["db", "inline"]);

    let mut resolver = FixtureResolver::new(&namespace);
    let values: Vec<_> = calls
        .iter()
        .map(|call| {
            resolver
                .resolve_call(&test, call)
                .unwrap()
                .remove(0)
                .1
                .into_value()
        })
        .collect();
    assert_eq!(
        values,
        [Some(ParamValue::from("db")), Some(ParamValue::from("inline"))]
    );
}

#[test]
fn unions_need_alternatives() {
    let mut namespace = FixtureNamespace::new();

    let error = fixture_union(&mut namespace, "u", Vec::<&str>::new(), None).unwrap_err();

    assert_eq!(
        error,
        FixtureError::EmptyUnion {
            name: "u".to_string()
        }
    );
}
