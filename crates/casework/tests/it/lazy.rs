use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use casework::{
    FixtureNamespace, FixtureResolver, LazyError, LazyValue, Mark, ParamValue, Parametrize,
    ResolveError, Resolved, TestFunction, generate_calls,
};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

use crate::common::ids;

fn counting(name: &str, runs: &Arc<AtomicUsize>, value: ParamValue) -> LazyValue {
    let runs = Arc::clone(runs);
    LazyValue::new(name, move || {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(value.clone())
    })
}

#[test]
fn a_lazy_tuple_is_evaluated_once_per_call() {
    let getter_runs = Arc::new(AtomicUsize::new(0));
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_pair", ["x", "y"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "x,y",
            vec![counting("case_pair", &getter_runs, ParamValue::from((1, 2)))],
        ),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();
    assert_eq!(ids(&calls), ["case_pair"]);
    assert_eq!(getter_runs.load(Ordering::SeqCst), 0);

    let mut resolver = FixtureResolver::new(&namespace);
    let values = resolver.resolve_call(&test, &calls[0]).unwrap();

    assert_eq!(
        values,
        [
            ("x".to_string(), Resolved::Used(ParamValue::Int(1))),
            ("y".to_string(), Resolved::Used(ParamValue::Int(2))),
        ]
    );
    assert_eq!(getter_runs.load(Ordering::SeqCst), 1);

    resolver.resolve_call(&test, &calls[0]).unwrap();
    assert_eq!(getter_runs.load(Ordering::SeqCst), 2);
}

#[test]
fn lazy_values_carry_ids_and_marks() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_lazy", ["a"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "a",
            vec![
                LazyValue::new("make_a", || Ok(ParamValue::Int(1))),
                LazyValue::new("make_b", || Ok(ParamValue::Int(2)))
                    .with_id("b")
                    .with_marks([Mark::xfail("known")]),
                LazyValue::anonymous(|| Ok(ParamValue::Int(3))),
            ],
        ),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();

    assert_eq!(ids(&calls), ["make_a", "b", "a2"]);
    assert_eq!(calls[1].marks(), [Mark::xfail("known")]);
}

#[test]
fn lazy_tuples_must_return_tuples_of_the_declared_size() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_pair", ["x", "y"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "x,y",
            vec![LazyValue::new("case_scalar", || Ok(ParamValue::Int(4)))],
        ),
    )
    .unwrap();
    let calls = generate_calls(&test, &namespace).unwrap();

    let mut resolver = FixtureResolver::new(&namespace);
    let error = resolver.resolve_call(&test, &calls[0]).unwrap_err();

    assert!(matches!(
        error,
        ResolveError::Lazy(LazyError::NotATuple { expected: 2, .. })
    ));
    assert_snapshot!(
        error,
        @"lazy value `case_scalar` was declared to return a tuple of 2 values but returned `4`"
    );
}

#[test]
fn failing_getters_surface_when_the_call_runs() {
    let mut namespace = FixtureNamespace::new();
    let mut test = TestFunction::new("test_fails", ["a"]);
    test.parametrize(
        &mut namespace,
        Parametrize::new(
            "a",
            vec![LazyValue::new("broken", || {
                Err(LazyError::failed("broken", "no data"))
            })],
        ),
    )
    .unwrap();

    let calls = generate_calls(&test, &namespace).unwrap();
    let mut resolver = FixtureResolver::new(&namespace);

    assert_snapshot!(
        resolver.resolve_call(&test, &calls[0]).unwrap_err(),
        @"getter `broken` failed: no data"
    );
}
