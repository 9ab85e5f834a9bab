use std::collections::HashSet;

use casework::{
    FixtureDef, FixtureNamespace, FixtureResolver, IdStyle, Mark, Param, ParamValue, Parametrize,
    Resolved, TestFunction, fixture_ref, generate_calls,
};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{constant, ids};

#[test]
fn first_declaration_is_the_outer_loop() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_add", ["a", "b"]);
    test.parametrize(&mut namespace, Parametrize::new("a", vec![1, 2]))
        .unwrap();
    test.parametrize(&mut namespace, Parametrize::new("b", vec![3, 4]))
        .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(ids(&calls), ["1-3", "1-4", "2-3", "2-4"]);

    let mut resolver = FixtureResolver::new(&namespace);
    let pairs: Vec<_> = calls
        .iter()
        .map(|call| {
            let values = resolver.resolve_call(&test, call).unwrap();
            values
                .into_iter()
                .map(|(_, resolved)| resolved.into_value().unwrap())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(
        pairs,
        [
            vec![ParamValue::Int(1), ParamValue::Int(3)],
            vec![ParamValue::Int(1), ParamValue::Int(4)],
            vec![ParamValue::Int(2), ParamValue::Int(3)],
            vec![ParamValue::Int(2), ParamValue::Int(4)],
        ]
    );
}

#[test]
fn fixture_references_keep_declaration_order() {
    let mut namespace = FixtureNamespace::new();
    namespace.register(constant("db")).unwrap();
    let mut test = TestFunction::new("test_it", ["a", "b"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "a",
            vec![
                ParamValue::from(fixture_ref("db")),
                ParamValue::from(5),
                ParamValue::from(6),
            ],
        ),
    )
    .unwrap();
    test.parametrize(&mut namespace, Parametrize::new("b", vec![1, 2]))
        .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(
        ids(&calls),
        ["db-1", "db-2", "5-1", "5-2", "6-1", "6-2"]
    );

    let mut resolver = FixtureResolver::new(&namespace);
    let pairs: Vec<_> = calls
        .iter()
        .map(|call| {
            resolver
                .resolve_call(&test, call)
                .unwrap()
                .into_iter()
                .map(|(_, resolved)| resolved.into_value().unwrap())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(
        pairs,
        [
            vec![ParamValue::from("db"), ParamValue::Int(1)],
            vec![ParamValue::from("db"), ParamValue::Int(2)],
            vec![ParamValue::Int(5), ParamValue::Int(1)],
            vec![ParamValue::Int(5), ParamValue::Int(2)],
            vec![ParamValue::Int(6), ParamValue::Int(1)],
            vec![ParamValue::Int(6), ParamValue::Int(2)],
        ]
    );
}

#[rstest]
#[case::two_by_two(&[2, 2])]
#[case::three_lists(&[3, 1, 2])]
#[case::single(&[4])]
fn calls_enumerate_the_product_in_declaration_order(#[case] sizes: &[i64]) {
    let argnames: Vec<String> = (0..sizes.len()).map(|index| format!("p{index}")).collect();
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_product", argnames.clone());
    for (argname, size) in argnames.iter().zip(sizes) {
        test.parametrize(
            &mut namespace,
            Parametrize::new(argname.as_str(), (0..*size).collect::<Vec<_>>()),
        )
        .unwrap();
    }

    let calls = generate_calls(&test, &namespace).unwrap();

    let mut expected = vec![Vec::new()];
    for size in sizes {
        expected = expected
            .into_iter()
            .flat_map(|prefix: Vec<i64>| {
                (0..*size).map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value);
                    next
                })
            })
            .collect();
    }
    let actual: Vec<Vec<i64>> = calls
        .iter()
        .map(|call| {
            argnames
                .iter()
                .map(|argname| match call.value(argname) {
                    Some(casework::CallValue::Value(value)) => value.as_int().unwrap(),
                    other => panic!("unexpected value {other:?}"),
                })
                .collect()
        })
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn joint_argnames_with_styles_and_explicit_ids() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_pairs", ["x", "y", "z"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new("x,y", vec![(1, "a"), (2, "b")]).with_idstyle(IdStyle::Explicit),
    )
    .unwrap();
    test.parametrize(
        &mut namespace,
        Parametrize::new("z", vec![true, false]).with_ids(["on", "off"]),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(
        ids(&calls),
        ["x=1-y=a-on", "x=1-y=a-off", "x=2-y=b-on", "x=2-y=b-off"]
    );
}

#[test]
fn templates_and_callables_render_ids() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_ids", ["a", "b"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new("a", vec![1, 2]).with_idstyle(IdStyle::template("a{a}")),
    )
    .unwrap();
    test.parametrize(
        &mut namespace,
        Parametrize::new("b", vec!["x", "y"]).with_idstyle(IdStyle::callable(|named| {
            named
                .iter()
                .map(|(argname, value)| format!("{argname}:{value}"))
                .collect::<Vec<_>>()
                .join("+")
        })),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(ids(&calls).len(), 4);
    assert!(ids(&calls)[0].starts_with("a1-b:"));
}

#[test]
fn unknown_template_fields_are_reported() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_ids", ["a"]);

    let error = test
        .parametrize(
            &mut namespace,
            Parametrize::new("a", vec![1]).with_idstyle(IdStyle::template("{b}")),
        )
        .unwrap_err();

    assert_snapshot!(
        error,
        @"id template `{b}` uses `{b}` but the available fields are: a"
    );
}

#[test]
fn duplicate_ids_are_made_unique() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_dupes", ["a"]);
    test.parametrize(&mut namespace, Parametrize::new("a", vec![1, 1, 2, 1]))
        .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    let unique: HashSet<&str> = ids(&calls).into_iter().collect();
    assert_eq!(unique.len(), 4);
    assert!(unique.contains("2"));
}

#[test]
fn marks_follow_their_values() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_marked", ["a"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "a",
            vec![Param::new(1), Param::new(2).with_mark(Mark::skip("flaky"))],
        ),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert!(calls[0].marks().is_empty());
    assert_eq!(calls[1].marks(), [Mark::skip("flaky")]);
}

#[test]
fn parametrized_fixture_arguments_reach_the_fixture() {
    let mut namespace = FixtureNamespace::new();
    namespace
        .register(
            FixtureDef::function("conn", |request| {
                let host = request.require_arg("host")?.as_str().unwrap_or_default().to_string();
                let port = request.require_arg("port")?.as_int().unwrap_or_default();
                Ok(ParamValue::from(format!("{host}:{port}")))
            })
            .with_argnames(["host", "port"]),
        )
        .unwrap();
    namespace
        .parametrize_fixture(
            "conn",
            Parametrize::new("host,port", vec![("alpha", 1), ("beta", 2)]),
        )
        .unwrap();
    let test = TestFunction::new("test_conn", ["conn"]);

    let calls = generate_calls(&test, &namespace).unwrap();
    assert_eq!(ids(&calls), ["alpha-1", "beta-2"]);

    let mut resolver = FixtureResolver::new(&namespace);
    let values = resolver.resolve_call(&test, &calls[1]).unwrap();
    assert_eq!(
        values,
        [(
            "conn".to_string(),
            Resolved::Used(ParamValue::from("beta:2"))
        )]
    );
}

#[rstest]
#[case::empty_values(
    Parametrize::new("a", Vec::<i64>::new()),
    "got an empty list of values"
)]
#[case::wrong_arity(
    Parametrize::new("a,b", vec![(1, 2, 3)]),
    "names 2 arguments but value #0"
)]
fn invalid_parametrizations_are_rejected(#[case] parametrize: Parametrize, #[case] needle: &str) {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_invalid", ["a", "b"]);

    let error = test.parametrize(&mut namespace, parametrize).unwrap_err();

    assert!(
        error.to_string().contains(needle),
        "`{error}` does not mention `{needle}`"
    );
}
